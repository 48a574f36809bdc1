use log::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Field, FieldMapping, NormalizedRecord, RawRecord};
use crate::vocab::Vocabulary;

/// Lower-case, diacritic-free tokens.
///
/// Apostrophes and periods are deleted (`O'Brien` -> `obrien`), `#` is kept as
/// a token of its own and any other non-alphanumeric character separates
/// tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in raw.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        match ch {
            '\'' | '\u{2018}' | '\u{2019}' | '`' | '.' => {}
            '#' => {
                flush(&mut tokens, &mut current);
                tokens.push("#".to_string());
            }
            c if c.is_alphanumeric() => current.extend(c.to_lowercase()),
            _ => flush(&mut tokens, &mut current),
        }
    }
    flush(&mut tokens, &mut current);
    tokens
}

fn flush(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Five-digit ZIP from the first digit run, or empty.
///
/// ZIP+4 is dropped and 3-4 digit values are left-padded, since spreadsheets
/// strip leading zeros (`6355` -> `06355`).
pub fn canonical_zip(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.len() {
        0..=2 => String::new(),
        3 | 4 => format!("{digits:0>5}"),
        _ => digits[..5].to_string(),
    }
}

const ORDINAL_SUFFIXES: &[&str] = &["st", "nd", "rd", "th"];

/// `"123a"` -> `("123", "a")`. Ordinals such as `1st` are street names, not
/// house numbers.
fn split_house_token(token: &str) -> Option<(String, String)> {
    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    if split == 0 {
        return None;
    }
    let (digits, rest) = token.split_at(split);
    if ORDINAL_SUFFIXES.contains(&rest) {
        return None;
    }
    Some((digits.to_string(), rest.to_string()))
}

struct AddressLine {
    house_number: Option<u32>,
    street: Vec<String>,
    unit: Option<String>,
}

#[derive(Default)]
struct Locality {
    line: String,
    city: String,
    state: String,
    zip: String,
}

/// Turns raw rows into `NormalizedRecord`s. Pure: the same record, mapping
/// and vocabulary always give the same output.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    vocab: Vocabulary,
}

impl Normalizer {
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn normalize(&self, record: &RawRecord, mapping: &FieldMapping) -> NormalizedRecord {
        let (last, first, name_suffix) = self.split_name(record, mapping);

        let composite = mapping
            .value(record, Field::FullAddress)
            .map(|raw| self.split_full_address(raw))
            .unwrap_or_default();

        let line_raw = mapping
            .value(record, Field::Address1)
            .unwrap_or(composite.line.as_str());
        let mut line = self.parse_address_line(line_raw);
        if line.unit.is_none() {
            line.unit = mapping
                .value(record, Field::Address2)
                .and_then(|raw| self.parse_unit_line(raw));
        }

        let city_key = mapping
            .value(record, Field::City)
            .map(|raw| tokenize(raw).join(" "))
            .filter(|c| !c.is_empty())
            .unwrap_or(composite.city);
        let state_key = mapping
            .value(record, Field::State)
            .map(|raw| self.canonical_state(raw))
            .filter(|s| !s.is_empty())
            .unwrap_or(composite.state);
        let zip_key = mapping
            .value(record, Field::Zip)
            .map(canonical_zip)
            .filter(|z| !z.is_empty())
            .unwrap_or(composite.zip);

        let street_key = line.street.join(" ");

        let mut address_parts: Vec<String> = Vec::with_capacity(6);
        if let Some(house) = line.house_number {
            address_parts.push(house.to_string());
        }
        for part in [
            street_key.as_str(),
            line.unit.as_deref().unwrap_or(""),
            city_key.as_str(),
            state_key.as_str(),
            zip_key.as_str(),
        ] {
            if !part.is_empty() {
                address_parts.push(part.to_string());
            }
        }

        let mut name_tokens: Vec<&str> = Vec::with_capacity(last.len() + first.len() + 1);
        name_tokens.extend(last.iter().map(String::as_str));
        name_tokens.extend(first.iter().map(String::as_str));
        name_tokens.extend(name_suffix.as_deref());

        NormalizedRecord {
            full_name_key: name_tokens.join(" "),
            last_name_key: last.join(" "),
            first_name_key: first.join(" "),
            name_suffix,
            house_number: line.house_number,
            street_key,
            unit_key: line.unit,
            city_key,
            state_key,
            zip_key,
            full_address_key: address_parts.join(" "),
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// (surname tokens, given-name tokens, canonical suffix).
    fn split_name(
        &self,
        record: &RawRecord,
        mapping: &FieldMapping,
    ) -> (Vec<String>, Vec<String>, Option<String>) {
        let first_raw = mapping.value(record, Field::FirstName);
        let (mut last, mut first) = match (
            mapping.value(record, Field::LastName),
            mapping.value(record, Field::FullName),
        ) {
            (Some(last), _) => (tokenize(last), first_raw.map(tokenize).unwrap_or_default()),
            (None, Some(full)) => self.split_full_name(full),
            (None, None) => (Vec::new(), first_raw.map(tokenize).unwrap_or_default()),
        };
        let suffix = self
            .take_suffix(&mut last)
            .or_else(|| self.take_suffix(&mut first));
        (last, first, suffix)
    }

    /// `"Last, First"` splits on the comma. Otherwise the last token is the
    /// surname, with a trailing suffix token kept alongside it.
    fn split_full_name(&self, raw: &str) -> (Vec<String>, Vec<String>) {
        if let Some((last, first)) = raw.split_once(',') {
            return (tokenize(last), tokenize(first));
        }
        let mut tokens = tokenize(raw);
        let has_suffix = tokens.len() > 2
            && tokens
                .last()
                .is_some_and(|t| self.vocab.name_suffix(t).is_some());
        let suffix = if has_suffix { tokens.pop() } else { None };
        let Some(surname) = tokens.pop() else {
            return (Vec::new(), Vec::new());
        };
        let mut last = vec![surname];
        last.extend(suffix);
        (last, tokens)
    }

    fn take_suffix(&self, tokens: &mut Vec<String>) -> Option<String> {
        if tokens.len() < 2 {
            return None;
        }
        let canonical = self.vocab.name_suffix(tokens.last()?)?.to_string();
        tokens.pop();
        Some(canonical)
    }

    // -----------------------------------------------------------------------
    // Addresses
    // -----------------------------------------------------------------------

    fn parse_address_line(&self, raw: &str) -> AddressLine {
        let mut tokens = tokenize(raw);
        let mut house_suffix = None;
        let house_number = match tokens.first().and_then(|t| split_house_token(t)) {
            Some((digits, rest)) => {
                tokens.remove(0);
                if !rest.is_empty() {
                    house_suffix = Some(rest);
                }
                digits.parse::<u32>().ok()
            }
            None => {
                if !tokens.is_empty() {
                    debug!("no house number in address line {raw:?}");
                }
                None
            }
        };
        let mut unit = self.take_unit(&mut tokens, 1);
        // `123A`: the letter names the unit unless the line already has one.
        if let Some(rest) = house_suffix {
            match unit {
                None => unit = Some(format!("unit {rest}")),
                Some(_) => tokens.insert(0, rest),
            }
        }
        AddressLine {
            house_number,
            street: self.expand_street(tokens),
            unit,
        }
    }

    /// Address2: a designator phrase, or a lone identifier (`5`, `4b`).
    fn parse_unit_line(&self, raw: &str) -> Option<String> {
        let mut tokens = tokenize(raw);
        if let Some(unit) = self.take_unit(&mut tokens, 0) {
            return Some(unit);
        }
        match tokens.as_slice() {
            [ident] => Some(format!("unit {ident}")),
            [] => None,
            _ => {
                debug!("unrecognized secondary address {raw:?}");
                None
            }
        }
    }

    /// Removes the first designator at or after `from` plus its identifier.
    fn take_unit(&self, tokens: &mut Vec<String>, from: usize) -> Option<String> {
        let pos = (from..tokens.len()).find(|&i| self.vocab.unit_designator(&tokens[i]).is_some())?;
        let designator = self.vocab.unit_designator(&tokens[pos])?.to_string();
        let mut end = pos + 1;
        if tokens.get(end).is_some_and(|t| t == "#") {
            end += 1;
        }
        let ident = tokens.get(end).cloned();
        let drain_to = if ident.is_some() { end + 1 } else { end.min(tokens.len()) };
        tokens.drain(pos..drain_to);
        Some(match ident {
            Some(id) => format!("{designator} {id}"),
            None => designator,
        })
    }

    /// Directionals expand everywhere; suffixes everywhere but the first token
    /// (`St James Place` keeps its leading `st`).
    fn expand_street(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| {
                if let Some(dir) = self.vocab.directional(&token) {
                    return dir.to_string();
                }
                if i > 0 {
                    if let Some(suffix) = self.vocab.street_suffix(&token) {
                        return suffix.to_string();
                    }
                }
                token
            })
            .collect()
    }

    fn canonical_state(&self, raw: &str) -> String {
        let phrase = tokenize(raw).join(" ");
        match self.vocab.state_code(&phrase) {
            Some(code) => code.to_string(),
            None => phrase,
        }
    }

    /// `"742 Evergreen Terrace, Springfield, IL 62704"`: the first comma part
    /// is the address line, the rest is read right to left as zip, state,
    /// city.
    fn split_full_address(&self, raw: &str) -> Locality {
        let mut parts = raw.split(',').map(str::trim).filter(|p| !p.is_empty());
        let line = parts.next().unwrap_or_default().to_string();
        let tail: Vec<&str> = parts.collect();
        let mut tokens = tokenize(&tail.join(" "));

        let mut zip = String::new();
        while tokens
            .last()
            .is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()))
        {
            if let Some(digits) = tokens.pop() {
                zip = digits;
            }
        }

        let mut state = String::new();
        if tokens.len() >= 2 {
            let phrase = tokens[tokens.len() - 2..].join(" ");
            if let Some(code) = self.vocab.state_code(&phrase) {
                state = code.to_string();
                tokens.truncate(tokens.len() - 2);
            }
        }
        if state.is_empty() {
            if let Some(code) = tokens.last().and_then(|t| self.vocab.state_code(t)) {
                state = code.to_string();
                tokens.pop();
            }
        }

        Locality {
            line,
            city: tokens.join(" "),
            state,
            zip: canonical_zip(&zip),
        }
    }
}
