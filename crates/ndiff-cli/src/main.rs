//! ndiff CLI
//!
//! Reconciles the old and new stores over a height range and appends every
//! record found on only one side to the result logs.

use clap::{Parser, ValueEnum};
use ndiff_core::config::{EndpointsConfig, RangeConfig, RawRange, RunConfig, DEFAULT_OUTPUT_DIR};
use ndiff_core::errors::ConfigError;
use ndiff_core::logging_facility::{self, LogLevel, Profile};
use std::path::PathBuf;
use std::process::ExitCode;

mod run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn profile(self) -> Profile {
        match self {
            LogFormat::Json => Profile::Production,
            LogFormat::Pretty => Profile::Development,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ndiff")]
#[command(about = "Reconcile old and new NFT snapshots window by window", long_about = None)]
struct Cli {
    /// YAML file with the `old` and `new` store endpoints
    #[arg(long, env = "NDIFF_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// First height to reconcile (raised to 21000 if lower)
    #[arg(long, env = "START_HEIGHT")]
    start_height: Option<String>,

    /// Height to stop before (exclusive)
    #[arg(long, env = "END_HEIGHT")]
    end_height: Option<String>,

    /// Heights per window
    #[arg(long, env = "STEP")]
    step: Option<String>,

    /// Directory holding not_in_new.csv and not_in_old.csv
    #[arg(long, env = "DIFF_RESULT_FILE_LOCATION", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Default verbosity (debug or info); RUST_LOG wins when set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

impl Cli {
    /// Validate the range and read the endpoint file
    fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let range = RangeConfig::from_raw(&RawRange {
            start: self.start_height.clone(),
            end: self.end_height.clone(),
            step: self.step.clone(),
        })?;
        let endpoints = EndpointsConfig::load(&self.config)?;

        Ok(RunConfig {
            endpoints,
            range,
            output_dir: self.output_dir.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment and flags still apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging_facility::init(cli.log_format.profile(), cli.log_level);

    run::execute(cli).await
}
