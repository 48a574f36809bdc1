//! `rowmatch` — match an input CSV against a master CSV by full name,
//! last name + address, and full address.

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rowmatch_matcher::MatchError;

use exit_codes::*;

#[derive(Parser)]
#[command(name = "rowmatch")]
#[command(about = "Fuzzy name/address matching of an input list against a master list")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every match type described by a job file
    #[command(after_help = "\
Examples:
  rowmatch run job.toml
  rowmatch run job.toml --output-dir out/
  rowmatch run job.toml --json > report.json
  rowmatch run job.toml --output report.json --workers 4")]
    Run {
        /// Path to the job .toml file (CSV paths inside are relative to it)
        config: PathBuf,

        /// Directory for the per-match-type CSV tables [default: <job dir>/matches]
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per core); overrides [run].workers
        #[arg(long, env = "ROWMATCH_WORKERS")]
        workers: Option<usize>,
    },

    /// Check a job file and its CSV headers without matching
    #[command(after_help = "\
Examples:
  rowmatch validate job.toml")]
    Validate {
        /// Path to the job .toml file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, output_dir, json, output, workers } => {
            run::cmd_run(config, output_dir, json, output, workers)
        }
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(EXIT_INVALID_CONFIG, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        let message = err.to_string();
        match err {
            MatchError::ConfigParse(_) | MatchError::ConfigValidation(_) => {
                Self::invalid_config(message)
            }
            MatchError::MissingField { dataset, .. } => Self::new(EXIT_MISSING_FIELD, message)
                .with_hint(format!(
                    "rename the CSV header or map it explicitly under [{dataset}.columns]"
                )),
            MatchError::AmbiguousHeader { dataset, .. } => Self::new(EXIT_MISSING_FIELD, message)
                .with_hint(format!("pick one column explicitly under [{dataset}.columns]")),
            MatchError::Csv(_) | MatchError::WorkerPool(_) | MatchError::Cancelled => {
                Self::runtime(message)
            }
            MatchError::Internal(_) => Self::new(EXIT_ERROR, message),
        }
    }
}
