//! Canonicalization tables used by the normalizer.
//!
//! Every table maps a lower-case token (or space-joined phrase for state
//! names) to its canonical form. Canonical forms map to themselves so a value
//! that is already canonical survives a lookup unchanged.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// USPS Publication 28 street suffix abbreviations. `terr` is not a Pub 28
/// abbreviation and is left out.
const STREET_SUFFIXES: &[(&str, &str)] = &[
    ("aly", "alley"),
    ("anx", "annex"),
    ("arc", "arcade"),
    ("av", "avenue"),
    ("ave", "avenue"),
    ("aven", "avenue"),
    ("avn", "avenue"),
    ("byu", "bayou"),
    ("bch", "beach"),
    ("bnd", "bend"),
    ("blf", "bluff"),
    ("blvd", "boulevard"),
    ("boul", "boulevard"),
    ("br", "branch"),
    ("brg", "bridge"),
    ("brk", "brook"),
    ("byp", "bypass"),
    ("cp", "camp"),
    ("cyn", "canyon"),
    ("cpe", "cape"),
    ("cswy", "causeway"),
    ("ctr", "center"),
    ("cntr", "center"),
    ("cir", "circle"),
    ("circ", "circle"),
    ("clf", "cliff"),
    ("clb", "club"),
    ("cmn", "common"),
    ("cor", "corner"),
    ("crse", "course"),
    ("ct", "court"),
    ("crt", "court"),
    ("cts", "courts"),
    ("cv", "cove"),
    ("crk", "creek"),
    ("cres", "crescent"),
    ("xing", "crossing"),
    ("dl", "dale"),
    ("dm", "dam"),
    ("dv", "divide"),
    ("dr", "drive"),
    ("drv", "drive"),
    ("est", "estate"),
    ("ests", "estates"),
    ("expy", "expressway"),
    ("expwy", "expressway"),
    ("ext", "extension"),
    ("fls", "falls"),
    ("fry", "ferry"),
    ("fld", "field"),
    ("flds", "fields"),
    ("flt", "flat"),
    ("frd", "ford"),
    ("frst", "forest"),
    ("frg", "forge"),
    ("frk", "fork"),
    ("ft", "fort"),
    ("fwy", "freeway"),
    ("gdn", "garden"),
    ("gdns", "gardens"),
    ("gtwy", "gateway"),
    ("gln", "glen"),
    ("grn", "green"),
    ("grv", "grove"),
    ("hbr", "harbor"),
    ("hvn", "haven"),
    ("hts", "heights"),
    ("hwy", "highway"),
    ("hway", "highway"),
    ("hl", "hill"),
    ("hls", "hills"),
    ("holw", "hollow"),
    ("inlt", "inlet"),
    ("is", "island"),
    ("jct", "junction"),
    ("ky", "key"),
    ("knl", "knoll"),
    ("lk", "lake"),
    ("lks", "lakes"),
    ("lndg", "landing"),
    ("ln", "lane"),
    ("lgt", "light"),
    ("lf", "loaf"),
    ("lck", "lock"),
    ("ldg", "lodge"),
    ("mnr", "manor"),
    ("mdw", "meadow"),
    ("mdws", "meadows"),
    ("ml", "mill"),
    ("mls", "mills"),
    ("msn", "mission"),
    ("mtwy", "motorway"),
    ("mt", "mount"),
    ("mtn", "mountain"),
    ("nck", "neck"),
    ("orch", "orchard"),
    ("opas", "overpass"),
    ("pkwy", "parkway"),
    ("pky", "parkway"),
    ("psge", "passage"),
    ("pne", "pine"),
    ("pnes", "pines"),
    ("pl", "place"),
    ("pln", "plain"),
    ("plns", "plains"),
    ("plz", "plaza"),
    ("pt", "point"),
    ("pts", "points"),
    ("prt", "port"),
    ("pr", "prairie"),
    ("radl", "radial"),
    ("rnch", "ranch"),
    ("rpd", "rapid"),
    ("rst", "rest"),
    ("rdg", "ridge"),
    ("riv", "river"),
    ("rd", "road"),
    ("rds", "roads"),
    ("rte", "route"),
    ("shl", "shoal"),
    ("shr", "shore"),
    ("shrs", "shores"),
    ("skwy", "skyway"),
    ("spg", "spring"),
    ("spgs", "springs"),
    ("sq", "square"),
    ("sta", "station"),
    ("stra", "stravenue"),
    ("strm", "stream"),
    ("st", "street"),
    ("str", "street"),
    ("sts", "streets"),
    ("smt", "summit"),
    ("ter", "terrace"),
    ("trwy", "throughway"),
    ("trce", "trace"),
    ("trak", "track"),
    ("trfy", "trafficway"),
    ("trl", "trail"),
    ("tunl", "tunnel"),
    ("tpke", "turnpike"),
    ("upas", "underpass"),
    ("un", "union"),
    ("vly", "valley"),
    ("via", "viaduct"),
    ("vw", "view"),
    ("vlg", "village"),
    ("vl", "ville"),
    ("vis", "vista"),
    ("wl", "well"),
    ("wls", "wells"),
];

const DIRECTIONALS: &[(&str, &str)] = &[
    ("n", "north"),
    ("s", "south"),
    ("e", "east"),
    ("w", "west"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("se", "southeast"),
    ("sw", "southwest"),
];

const UNIT_DESIGNATORS: &[(&str, &str)] = &[
    ("apt", "unit"),
    ("apartment", "unit"),
    ("unit", "unit"),
    ("ste", "unit"),
    ("suite", "unit"),
    ("#", "unit"),
    ("trlr", "lot"),
    ("trailer", "lot"),
    ("lot", "lot"),
    ("spc", "lot"),
    ("space", "lot"),
    ("rm", "room"),
    ("room", "room"),
    ("fl", "floor"),
    ("flr", "floor"),
    ("floor", "floor"),
    ("bldg", "building"),
    ("building", "building"),
    ("dept", "department"),
    ("department", "department"),
];

const NAME_SUFFIXES: &[(&str, &str)] = &[
    ("jr", "jr"),
    ("junior", "jr"),
    ("sr", "sr"),
    ("senior", "sr"),
    ("ii", "ii"),
    ("2nd", "ii"),
    ("iii", "iii"),
    ("3rd", "iii"),
    ("iv", "iv"),
    ("4th", "iv"),
    ("v", "v"),
    ("5th", "v"),
];

const STATES: &[(&str, &str)] = &[
    ("alabama", "al"),
    ("alaska", "ak"),
    ("arizona", "az"),
    ("arkansas", "ar"),
    ("california", "ca"),
    ("colorado", "co"),
    ("connecticut", "ct"),
    ("delaware", "de"),
    ("district of columbia", "dc"),
    ("florida", "fl"),
    ("georgia", "ga"),
    ("hawaii", "hi"),
    ("idaho", "id"),
    ("illinois", "il"),
    ("indiana", "in"),
    ("iowa", "ia"),
    ("kansas", "ks"),
    ("kentucky", "ky"),
    ("louisiana", "la"),
    ("maine", "me"),
    ("maryland", "md"),
    ("massachusetts", "ma"),
    ("michigan", "mi"),
    ("minnesota", "mn"),
    ("mississippi", "ms"),
    ("missouri", "mo"),
    ("montana", "mt"),
    ("nebraska", "ne"),
    ("nevada", "nv"),
    ("new hampshire", "nh"),
    ("new jersey", "nj"),
    ("new mexico", "nm"),
    ("new york", "ny"),
    ("north carolina", "nc"),
    ("north dakota", "nd"),
    ("ohio", "oh"),
    ("oklahoma", "ok"),
    ("oregon", "or"),
    ("pennsylvania", "pa"),
    ("puerto rico", "pr"),
    ("rhode island", "ri"),
    ("south carolina", "sc"),
    ("south dakota", "sd"),
    ("tennessee", "tn"),
    ("texas", "tx"),
    ("utah", "ut"),
    ("vermont", "vt"),
    ("virginia", "va"),
    ("washington", "wa"),
    ("west virginia", "wv"),
    ("wisconsin", "wi"),
    ("wyoming", "wy"),
];

/// `[vocabulary]` config section. Each table adds to (or overrides) the
/// built-in entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub street_suffixes: BTreeMap<String, String>,
    #[serde(default)]
    pub directionals: BTreeMap<String, String>,
    #[serde(default)]
    pub unit_designators: BTreeMap<String, String>,
    #[serde(default)]
    pub name_suffixes: BTreeMap<String, String>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    street_suffixes: HashMap<String, String>,
    directionals: HashMap<String, String>,
    unit_designators: HashMap<String, String>,
    name_suffixes: HashMap<String, String>,
    states: HashMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            street_suffixes: table(STREET_SUFFIXES),
            directionals: table(DIRECTIONALS),
            unit_designators: table(UNIT_DESIGNATORS),
            name_suffixes: table(NAME_SUFFIXES),
            states: table(STATES),
        }
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(entries.len() * 2);
    for (token, canonical) in entries {
        map.insert((*token).to_string(), (*canonical).to_string());
        map.entry((*canonical).to_string())
            .or_insert_with(|| (*canonical).to_string());
    }
    map
}

fn extend(target: &mut HashMap<String, String>, extra: &BTreeMap<String, String>) {
    for (token, canonical) in extra {
        let token = token.trim().to_lowercase();
        let canonical = canonical.trim().to_lowercase();
        if token.is_empty() || canonical.is_empty() {
            continue;
        }
        target.entry(canonical.clone()).or_insert_with(|| canonical.clone());
        target.insert(token, canonical);
    }
}

impl Vocabulary {
    /// Built-in tables extended with the config's `[vocabulary.*]` entries.
    pub fn with_overrides(config: &VocabularyConfig) -> Self {
        let mut vocab = Self::default();
        extend(&mut vocab.street_suffixes, &config.street_suffixes);
        extend(&mut vocab.directionals, &config.directionals);
        extend(&mut vocab.unit_designators, &config.unit_designators);
        extend(&mut vocab.name_suffixes, &config.name_suffixes);
        extend(&mut vocab.states, &config.states);
        vocab
    }

    pub fn street_suffix(&self, token: &str) -> Option<&str> {
        self.street_suffixes.get(token).map(String::as_str)
    }

    pub fn directional(&self, token: &str) -> Option<&str> {
        self.directionals.get(token).map(String::as_str)
    }

    pub fn unit_designator(&self, token: &str) -> Option<&str> {
        self.unit_designators.get(token).map(String::as_str)
    }

    pub fn name_suffix(&self, token: &str) -> Option<&str> {
        self.name_suffixes.get(token).map(String::as_str)
    }

    /// Two-letter code for a state name or code (`"new york"` / `"ny"`).
    pub fn state_code(&self, phrase: &str) -> Option<&str> {
        self.states.get(phrase).map(String::as_str)
    }
}
