use batch_submitter::EngineConfig;
use clap::{Parser, ValueEnum};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// What to do when an entry fails and others are still pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    Continue,
    Abort,
    Ask,
}

/// Trait for reading configuration parameters
pub trait Config {
    fn input_path(&self) -> &Path;
    fn sender(&self) -> &str;
    fn on_error(&self) -> OnError;
    fn engine_config(&self) -> EngineConfig;
    fn audit_log(&self) -> Option<&Path>;
    fn start_sequence(&self) -> u64;
    fn unconfirmed_from(&self) -> Option<u64>;
    fn fail_destinations(&self) -> &[String];
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "bulk-mint",
    about = "Submits a CSV of mint requests one at a time from a single sender",
    version
)]
pub struct CliConfig {
    /// Path to the input CSV file (destination, amount, optional auxiliary_id)
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Sender account every submission is made from
    #[arg(long)]
    sender: String,

    /// Decision taken after a failed entry
    #[arg(long, value_enum, default_value_t = OnError::Ask)]
    on_error: OnError,

    /// Minimum delay between two submissions, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Timeout for a single audit write, in milliseconds
    #[arg(long, default_value_t = 5000)]
    audit_timeout_ms: u64,

    /// Append one JSON audit record per attempted submission to this file
    #[arg(long, value_name = "PATH")]
    audit_log: Option<PathBuf>,

    /// First sequence number handed out by the simulated chain
    #[arg(long, default_value_t = 0)]
    start_sequence: u64,

    /// Report simulated submissions from this sequence number on as unconfirmed
    #[arg(long, value_name = "SEQUENCE")]
    unconfirmed_from: Option<u64>,

    /// Destination the simulated chain refuses (repeatable)
    #[arg(long = "fail-destination", value_name = "ADDRESS")]
    fail_destinations: Vec<String>,
}

impl Config for CliConfig {
    fn input_path(&self) -> &Path {
        &self.input_file
    }

    fn sender(&self) -> &str {
        &self.sender
    }

    fn on_error(&self) -> OnError {
        self.on_error
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_submission_interval(Duration::from_millis(self.interval_ms))
            .with_audit_timeout(Duration::from_millis(self.audit_timeout_ms))
    }

    fn audit_log(&self) -> Option<&Path> {
        self.audit_log.as_deref()
    }

    fn start_sequence(&self) -> u64 {
        self.start_sequence
    }

    fn unconfirmed_from(&self) -> Option<u64> {
        self.unconfirmed_from
    }

    fn fail_destinations(&self) -> &[String] {
        &self.fail_destinations
    }
}
