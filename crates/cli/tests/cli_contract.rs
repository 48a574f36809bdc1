// Integration tests for the `rowmatch` binary: exit codes, the --json stdout
// contract, and the per-match-type CSV tables.
//
// Run with: cargo test -p rowmatch-cli --test cli_contract -- --nocapture

use std::path::PathBuf;
use std::process::Command;

fn rowmatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rowmatch"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd
}

fn fixture_job() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../matcher/tests/fixtures/job.toml")
}

// ===========================================================================
// rowmatch run
// ===========================================================================

#[test]
fn run_json_is_a_single_report_on_stdout() {
    let out_dir = tempfile::tempdir().unwrap();
    let output = rowmatch()
        .arg("run")
        .arg(fixture_job())
        .arg("--output-dir")
        .arg(out_dir.path())
        .args(["--json", "--workers", "2"])
        .output()
        .expect("rowmatch run --json");

    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{stdout}"));

    assert_eq!(val["meta"]["config_name"], "Mailing list vs master");
    assert_eq!(val["summary"]["input_rows"], 6);
    assert_eq!(val["summary"]["master_rows"], 8);
    let tables = val["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 3);
    for table in tables {
        assert_eq!(table["results"].as_array().unwrap().len(), 6);
    }

    // Human summary goes to stderr only
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Full Name"));
    assert!(stderr.contains("wrote"));

    let full_address = std::fs::read_to_string(out_dir.path().join("full_address.csv")).unwrap();
    let lines: Vec<&str> = full_address.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].ends_with(",Opens"));

    let unmatched = std::fs::read_to_string(out_dir.path().join("unmatched.csv")).unwrap();
    let lines: Vec<&str> = unmatched.lines().collect();
    assert_eq!(lines[0], "input_row,input_line,First Name,Last Name,Address,Address 2,City,State,Zip");
    assert_eq!(lines[1], "3,5,Jon,Smyth,10 Main St,,Hartford,CT,06103");
    assert_eq!(lines[2], "5,7,Zed,Nobody,999 Nowhere Ln,,Nowhere,KS,67000");
    assert_eq!(lines.len(), 3);
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let out_dir = tempfile::tempdir().unwrap();
    let output = rowmatch()
        .arg("run")
        .arg(fixture_job())
        .arg("--output-dir")
        .arg(out_dir.path())
        .output()
        .expect("rowmatch run");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

// ===========================================================================
// exit codes
// ===========================================================================

#[test]
fn validate_fixture_job_succeeds() {
    let output = rowmatch()
        .arg("validate")
        .arg(fixture_job())
        .output()
        .expect("rowmatch validate");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("valid:"));
}

#[test]
fn missing_job_file_exits_2() {
    let output = rowmatch()
        .args(["validate", "does-not-exist.toml"])
        .output()
        .expect("rowmatch validate");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: cannot read"));
}

#[test]
fn invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("bad.toml");
    std::fs::write(&job, "[scoring]\nsurname_floor = 101\n").unwrap();
    let output = rowmatch().arg("validate").arg(&job).output().expect("rowmatch validate");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = rowmatch().arg("frobnicate").output().expect("rowmatch");
    assert_eq!(output.status.code(), Some(2));
}
