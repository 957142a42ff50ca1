mod audit_log;
mod config;
mod operator;
mod simulator;

use anyhow::{Context, Result};
use audit_log::{JsonLinesAudit, LogAudit};
use batch_submitter::{
    AuditSink, BatchEngine, BatchOutcome, BatchResult, ContinuationPolicy, SenderId,
    SubmissionRequest,
};
use clap::Parser;
use config::{CliConfig, Config, OnError};
use operator::PromptOperator;
use simulator::SimulatedChain;
use std::{io, path::Path, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    let result = run(&config).await?;
    write_report(&result)?;

    info!(
        "Batch {:?}: {} succeeded, {} failed, {} skipped",
        result.outcome, result.succeeded, result.failed, result.skipped
    );

    Ok(())
}

async fn run<C: Config>(config: &C) -> Result<BatchResult> {
    let requests = read_requests(config.input_path())?;

    let chain = Arc::new(
        SimulatedChain::new(
            config.start_sequence(),
            config.fail_destinations().iter().cloned(),
        )
        .with_unconfirmed_from(config.unconfirmed_from()),
    );
    let audit: Arc<dyn AuditSink> = match config.audit_log() {
        Some(path) => Arc::new(JsonLinesAudit::open(path).await?),
        None => Arc::new(LogAudit),
    };

    let engine = BatchEngine::new(chain.clone(), chain)
        .with_audit_sink(audit)
        .with_config(config.engine_config());

    let policy = match config.on_error() {
        OnError::Continue => ContinuationPolicy::AlwaysContinue,
        OnError::Abort => ContinuationPolicy::AlwaysAbort,
        OnError::Ask => ContinuationPolicy::ask(PromptOperator::new()),
    };

    let result = engine
        .run_batch(requests, SenderId::new(config.sender()), &policy)
        .await
        .context("Batch could not be started")?;

    if result.outcome != BatchOutcome::Completed {
        warn!("Batch stopped early, {} entries skipped", result.skipped);
    }

    Ok(result)
}

fn read_requests(path: &Path) -> Result<Vec<SubmissionRequest>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .context("Failed to open input file")?;

    let mut requests = Vec::new();
    let mut unreadable = 0;

    for result in reader.deserialize() {
        let request: SubmissionRequest = match result {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to parse request: {e}");
                unreadable += 1;

                continue;
            }
        };

        requests.push(request);
    }

    info!(
        "Read {} requests, {unreadable} unreadable rows dropped",
        requests.len()
    );

    Ok(requests)
}

fn write_report(result: &BatchResult) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::WriterBuilder::new().from_writer(handle);

    for output in result.outputs() {
        writer
            .serialize(&output)
            .context("Failed to serialize entry")?;
    }

    writer.flush().context("Failed to flush stdout")?;

    Ok(())
}
