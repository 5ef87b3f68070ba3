use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use graphloom_core::{CsvRecordSource, LoadOrchestrator, LoadReport, SchemaRegistry};
use graphloom_surrealdb::SurrealConnector;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::config::{retry_policy, surreal_config, CliConfig};
use crate::output;

/// Exit status when the run finished but some types were blocked by a constraint conflict
pub const EXIT_INCOMPLETE: u8 = 2;

pub async fn execute(
    mut config: CliConfig,
    format: OutputFormat,
    max_attempts: Option<u32>,
    retry_delay: Option<u64>,
) -> Result<ExitCode> {
    if let Some(attempts) = max_attempts {
        config.loader.retry.max_attempts = attempts;
    }
    if let Some(secs) = retry_delay {
        config.loader.retry.delay_secs = secs;
    }

    let registry = Arc::new(SchemaRegistry::northwind()?);
    config
        .loader
        .validate(&registry.source_names())
        .context("Invalid loader configuration")?;

    let source = match &config.base_dir {
        Some(dir) => CsvRecordSource::with_base_dir(dir.clone()),
        None => CsvRecordSource::new(),
    };
    let connector = SurrealConnector::new(surreal_config(&config.loader.store));
    info!(store = %connector.config(), "Starting load");

    let orchestrator = LoadOrchestrator::new(
        registry,
        Arc::new(connector),
        Arc::new(source),
        config.loader.sources.to_map(),
    )?
    .with_retry(retry_policy(&config.loader.retry));

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let result = orchestrator.run_with_cancel(cancel).await;
    watcher.abort();

    let report = result?;
    print_report(&report, format)?;
    Ok(ExitCode::from(exit_status(&report)))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, stopping load");
        cancel.cancel();
    }
}

fn print_report(report: &LoadReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            for table in output::load_report_tables(report) {
                println!("{}", table);
            }
            println!(
                "\n{} attempt(s), {} record(s) skipped, {} relationship record(s) unresolved",
                report.attempts,
                report.total_skipped(),
                report.total_unresolved()
            );
        }
    }
    Ok(())
}

pub fn exit_status(report: &LoadReport) -> u8 {
    if report.is_complete() {
        0
    } else {
        EXIT_INCOMPLETE
    }
}
