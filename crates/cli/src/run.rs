//! `rowmatch run` / `rowmatch validate` — job-file driven matching.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rowmatch_matcher::config::DatasetConfig;
use rowmatch_matcher::engine::plan_match_types;
use rowmatch_matcher::model::{Field, FieldMapping, MatchTable, RawRecord};
use rowmatch_matcher::source::load_dataset;
use rowmatch_matcher::{Dataset, MatchConfig, MatchInput, MatchOutput};

use crate::CliError;

/// Fixed leading columns of every output table.
const TABLE_COLUMNS: &[&str] = &[
    "input_row",
    "input_line",
    "match_type",
    "master_row",
    "master_line",
    "score",
    "runner_up_row",
    "runner_up_score",
    "input_name",
    "input_address",
    "master_name",
    "master_address",
];

/// A parsed job file with both datasets loaded.
struct Job {
    config: MatchConfig,
    base_dir: PathBuf,
    input_headers: Vec<String>,
    data: MatchInput,
}

fn load_job(config_path: &Path) -> Result<Job, CliError> {
    let config_str = fs::read_to_string(config_path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", config_path.display())))?;

    let config = MatchConfig::from_toml(&config_str)?;

    // CSV paths are relative to the job file's directory
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let (input_headers, input) = load_side(&base_dir, "input", &config.input)?;
    let (_, master) = load_side(&base_dir, "master", &config.master)?;

    Ok(Job {
        config,
        base_dir,
        input_headers,
        data: MatchInput { input, master },
    })
}

fn load_side(
    base_dir: &Path,
    name: &str,
    side: &DatasetConfig,
) -> Result<(Vec<String>, Dataset), CliError> {
    let file = side.file.as_deref().ok_or_else(|| {
        CliError::invalid_config(format!("[{name}] has no file"))
            .with_hint(format!("add `file = \"{name}.csv\"` under [{name}]"))
    })?;
    let csv_path = base_dir.join(file);
    let csv_data = fs::read_to_string(&csv_path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", csv_path.display())))?;

    let (headers, dataset) = load_dataset(&csv_data, name, side.columns.as_ref())?;

    if let Some(missing) = side.passthrough.iter().find(|c| !headers.contains(*c)) {
        return Err(CliError::invalid_config(format!(
            "[{name}] passthrough column '{missing}' not found in {}",
            csv_path.display()
        ))
        .with_hint(format!("available columns: {}", headers.join(", "))));
    }

    info!("{name}: {} rows from {}", dataset.len(), csv_path.display());
    for (field, column) in dataset.mapping.iter() {
        debug!("{name}: {field} <- '{column}'");
    }
    Ok((headers, dataset))
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    config_path: PathBuf,
    output_dir: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<(), CliError> {
    let mut job = load_job(&config_path)?;
    if let Some(workers) = workers {
        job.config.run.workers = workers;
    }

    let output = rowmatch_matcher::run(&job.config, &job.data)?;

    let out_dir = output_dir.unwrap_or_else(|| job.base_dir.join("matches"));
    fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", out_dir.display())))?;

    for table in &output.tables {
        let path = out_dir.join(format!("{}.csv", table.match_type));
        let file = fs::File::create(&path)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        write_table(
            file,
            table,
            &job.data,
            &job.config.input.passthrough,
            &job.config.master.passthrough,
        )
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    let path = out_dir.join("unmatched.csv");
    let file = fs::File::create(&path)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
    write_unmatched(file, &output.unmatched, &job.input_headers, &job.data.input)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());

    let json_str = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&output);
    Ok(())
}

/// One CSV row per input row, in input order. Rejected rows leave the
/// master-side columns empty.
fn write_table<W: io::Write>(
    writer: W,
    table: &MatchTable,
    data: &MatchInput,
    input_passthrough: &[String],
    master_passthrough: &[String],
) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = TABLE_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(input_passthrough.iter().map(|c| format!("input_{c}")));
    header.extend(master_passthrough.iter().cloned());
    w.write_record(&header)?;

    let empty = RawRecord::new();
    for result in &table.results {
        let input = data.input.records.get(result.input_row).unwrap_or(&empty);
        let master = result
            .master_row
            .and_then(|row| data.master.records.get(row));

        let mut row = vec![
            result.input_row.to_string(),
            opt(input.line()),
            result.match_type.to_string(),
            opt(result.master_row),
            opt(master.and_then(RawRecord::line)),
            opt(result.score),
            opt(result.runner_up.map(|u| u.master_row)),
            opt(result.runner_up.map(|u| u.score)),
            display_name(&data.input.mapping, input),
            display_address(&data.input.mapping, input),
        ];
        match master {
            Some(m) => {
                row.push(display_name(&data.master.mapping, m));
                row.push(display_address(&data.master.mapping, m));
            }
            None => row.extend([String::new(), String::new()]),
        }
        row.extend(
            input_passthrough
                .iter()
                .map(|c| input.get(c).unwrap_or("").to_string()),
        );
        row.extend(
            master_passthrough
                .iter()
                .map(|c| master.and_then(|m| m.get(c)).unwrap_or("").to_string()),
        );
        w.write_record(&row)?;
    }

    w.flush()?;
    Ok(())
}

/// Input rows no match type accepted, with their source line and every
/// original column.
fn write_unmatched<W: io::Write>(
    writer: W,
    unmatched: &[usize],
    headers: &[String],
    input: &Dataset,
) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = vec!["input_row".into(), "input_line".into()];
    header.extend(headers.iter().cloned());
    w.write_record(&header)?;

    for &row in unmatched {
        let Some(record) = input.records.get(row) else {
            continue;
        };
        let mut out = vec![row.to_string(), opt(record.line())];
        out.extend(headers.iter().map(|h| record.get(h).unwrap_or("").to_string()));
        w.write_record(&out)?;
    }

    w.flush()?;
    Ok(())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// "First Last" when split name columns are mapped, else the full-name column.
fn display_name(mapping: &FieldMapping, record: &RawRecord) -> String {
    let parts: Vec<&str> = [Field::FirstName, Field::LastName]
        .into_iter()
        .filter_map(|f| mapping.value(record, f))
        .collect();
    if parts.is_empty() {
        mapping.value(record, Field::FullName).unwrap_or("").to_string()
    } else {
        parts.join(" ")
    }
}

/// Split address columns joined with ", ". Without an address line the
/// full-address column is shown instead, when there is one.
fn display_address(mapping: &FieldMapping, record: &RawRecord) -> String {
    if mapping.value(record, Field::Address1).is_none() {
        if let Some(full) = mapping.value(record, Field::FullAddress) {
            return full.to_string();
        }
    }
    let parts: Vec<&str> = [Field::Address1, Field::Address2, Field::City, Field::State, Field::Zip]
        .into_iter()
        .filter_map(|f| mapping.value(record, f))
        .collect();
    parts.join(", ")
}

fn print_summary(output: &MatchOutput) {
    let s = &output.summary;
    eprintln!(
        "{}: {} input rows against {} master rows",
        output.meta.config_name, s.input_rows, s.master_rows
    );
    for t in &s.types {
        eprintln!(
            "  {:<20} {} accepted, {} rejected",
            t.match_type.label(),
            t.accepted,
            t.rejected
        );
    }
    eprintln!("  {:<20} {}", "Unmatched", s.unmatched);
    for skipped in &s.skipped {
        eprintln!("  {:<20} skipped: {}", skipped.match_type.label(), skipped.reason);
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let job = load_job(&config_path)?;
    let (runnable, skipped) =
        plan_match_types(&job.data.input.mapping, &job.data.master.mapping)?;

    let labels: Vec<&str> = runnable.iter().map(|mt| mt.label()).collect();
    eprintln!(
        "valid: '{}' with {} input rows, {} master rows; runs {}",
        job.config.name,
        job.data.input.len(),
        job.data.master.len(),
        labels.join(", "),
    );
    for s in &skipped {
        eprintln!("  skips {}: {}", s.match_type.label(), s.reason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_MISSING_FIELD, EXIT_USAGE};

    const INPUT_CSV: &str = "\
First,Last,Address,City,State,Zip,Source
Robert,Johnsen,742 Evergreen Terrace,Springfield,IL,62704,web
Zed,Nobody,1 Nowhere Ln,Nowhere,KS,67000,mail
";

    const MASTER_CSV: &str = "\
FirstName,LastName,Address1,City,ST,ZIP,Opens
Robert,Johnson,742 Evergreen Terr,Springfield,IL,62704,12
";

    fn write_job(dir: &Path, job_toml: &str) -> PathBuf {
        fs::write(dir.join("input.csv"), INPUT_CSV).unwrap();
        fs::write(dir.join("master.csv"), MASTER_CSV).unwrap();
        let path = dir.join("job.toml");
        fs::write(&path, job_toml).unwrap();
        path
    }

    const JOB: &str = r#"
name = "unit"

[input]
file = "input.csv"
passthrough = ["Source"]

[master]
file = "master.csv"
passthrough = ["Opens"]
"#;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn run_writes_one_table_per_match_type() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(dir.path(), JOB);
        let out = dir.path().join("out");
        let report = dir.path().join("report.json");

        cmd_run(job, Some(out.clone()), false, Some(report.clone()), Some(1)).unwrap();

        for name in ["full_name.csv", "last_name_address.csv", "full_address.csv"] {
            assert!(out.join(name).exists(), "{name}");
        }

        let rows = read_rows(&out.join("full_name.csv"));
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                "input_row", "input_line", "match_type", "master_row", "master_line",
                "score", "runner_up_row", "runner_up_score", "input_name", "input_address", "master_name",
                "master_address", "input_Source", "Opens",
            ]
        );
        assert_eq!(rows[1][0], "0");
        assert_eq!(rows[1][1], "2");
        assert_eq!(rows[1][2], "full_name");
        assert_eq!(rows[1][3], "0");
        assert_eq!(rows[1][4], "2");
        assert_eq!(rows[1][8], "Robert Johnsen");
        assert_eq!(rows[1][10], "Robert Johnson");
        assert_eq!(rows[1][11], "742 Evergreen Terr, Springfield, IL, 62704");
        assert_eq!(rows[1][12], "web");
        assert_eq!(rows[1][13], "12");

        // Rejected row: master side empty, input side kept
        assert_eq!(rows[2][0], "1");
        assert_eq!(rows[2][1], "3");
        assert_eq!(rows[2][3], "");
        assert_eq!(rows[2][4], "");
        assert_eq!(rows[2][5], "");
        assert_eq!(rows[2][10], "");
        assert_eq!(rows[2][12], "mail");
        assert_eq!(rows[2][13], "");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(json["meta"]["config_name"], "unit");
        assert_eq!(json["summary"]["input_rows"], 2);
        assert_eq!(json["summary"]["unmatched"], 1);
    }

    #[test]
    fn unmatched_rows_keep_source_line_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(dir.path(), JOB);
        let out = dir.path().join("out");
        cmd_run(job, Some(out.clone()), false, None, Some(1)).unwrap();

        let rows = read_rows(&out.join("unmatched.csv"));
        assert_eq!(
            rows,
            vec![
                vec!["input_row", "input_line", "First", "Last", "Address", "City", "State", "Zip", "Source"],
                vec!["1", "3", "Zed", "Nobody", "1 Nowhere Ln", "Nowhere", "KS", "67000", "mail"],
            ]
        );
    }

    #[test]
    fn output_dir_defaults_next_to_job() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(dir.path(), JOB);
        cmd_run(job, None, false, None, Some(1)).unwrap();
        assert!(dir.path().join("matches/full_address.csv").exists());
    }

    #[test]
    fn unknown_passthrough_column_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(
            dir.path(),
            "[input]\nfile = \"input.csv\"\n[master]\nfile = \"master.csv\"\npassthrough = [\"Clicks\"]\n",
        );
        let err = cmd_validate(job).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains("Clicks"));
        assert!(err.hint.unwrap().contains("Opens"));
    }

    #[test]
    fn missing_file_key_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(dir.path(), "[master]\nfile = \"master.csv\"\n");
        let err = cmd_validate(job).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains("[input]"));
    }

    #[test]
    fn unreadable_job_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_validate(dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn bad_threshold_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(
            dir.path(),
            &format!("{JOB}\n[scoring.thresholds]\nfull_name = 150\n"),
        );
        assert_eq!(cmd_validate(job).unwrap_err().code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn nothing_runnable_is_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let job = write_job(
            dir.path(),
            "[input]\nfile = \"input.csv\"\n[input.columns]\ncity = \"City\"\n[master]\nfile = \"master.csv\"\n",
        );
        let err = cmd_validate(job).unwrap_err();
        assert_eq!(err.code, EXIT_MISSING_FIELD);
        assert!(err.hint.unwrap().contains("[input.columns]"));
    }

    #[test]
    fn display_address_falls_back_without_address_line() {
        let mapping = FieldMapping::new()
            .with(Field::FullName, "Name")
            .with(Field::FullAddress, "Mailing")
            .with(Field::City, "City");
        let record = RawRecord::from_pairs([
            ("Name", "Smith, John"),
            ("Mailing", "1 Main St, Mystic, CT"),
            ("City", " Mystic "),
        ]);
        assert_eq!(display_name(&mapping, &record), "Smith, John");
        assert_eq!(display_address(&mapping, &record), "1 Main St, Mystic, CT");

        let split = mapping.clone().with(Field::Address1, "Line");
        let record = RawRecord::from_pairs([
            ("Line", "1 Main St"),
            ("Mailing", "1 Main St, Mystic, CT"),
            ("City", "Mystic"),
        ]);
        assert_eq!(display_address(&split, &record), "1 Main St, Mystic");

        let full_only = FieldMapping::new().with(Field::FullAddress, "Mailing");
        assert_eq!(display_address(&full_only, &record), "1 Main St, Mystic, CT");
        assert_eq!(display_name(&full_only, &record), "");
    }
}
