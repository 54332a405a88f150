mod bootstrap;
mod report;

use anyhow::{bail, Context, Result};
use report_core::config::RunConfig;
use report_core::models::ReportKind;
use report_core::settings::Settings;
use report_core::time_utils::format_snapshot_date;
use report_data::normalizer::{clean_file, CleanOutcome};
use report_runtime::pipeline::IngestPipeline;

use crate::report::PortfolioReport;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;
    let config = RunConfig::from_settings(&settings)?;
    bootstrap::ensure_directories(&config)?;

    tracing::info!("Portal Report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Mode: {}, data dir: {}, downloads: {}",
        settings.mode,
        config.data_dir.display(),
        config.download_dir.display()
    );

    let result = run(&settings, config).await;
    if let Err(e) = &result {
        tracing::error!("The process encountered an error: {:#}", e);
    }
    result
}

async fn run(settings: &Settings, config: RunConfig) -> Result<()> {
    match settings.mode.as_str() {
        "clean" => {
            let input = settings
                .input
                .as_ref()
                .context("--input is required in clean mode")?;
            let kind = required_kind(settings)?;
            let outcome = clean_file(input, &kind, &config)?;
            print_outcome(&outcome);
        }

        "ingest" => {
            let kind = required_kind(settings)?;
            let pipeline = IngestPipeline::new(config);

            let outcome = tokio::select! {
                result = pipeline.ingest(&kind) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; abandoning wait for download");
                    return Ok(());
                }
            };
            print_outcome(&outcome);

            if matches!(kind, ReportKind::RentRollSnapshot { .. }) {
                if let Some(path) = pipeline.refresh_combined()? {
                    println!("{}", path.display());
                }
            }
        }

        "union" => {
            let pipeline = IngestPipeline::new(config);
            match pipeline.refresh_combined()? {
                Some(path) => println!("{}", path.display()),
                None => tracing::warn!("No rent-roll snapshots found to combine"),
            }
        }

        "pending" => {
            let pipeline = IngestPipeline::new(config);
            let pending = pipeline.pending_snapshots();
            if pending.is_empty() {
                tracing::info!("All trailing month-end snapshots are present");
            }
            for date in pending {
                println!("{}", format_snapshot_date(date));
            }
        }

        "summary" => {
            let report = PortfolioReport::load(&config.data_dir)?;
            if report.is_empty() {
                tracing::warn!("No cleaned reports found in {}", config.data_dir.display());
            }
            if settings.format == "json" {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                print!("{}", report.to_text());
            }
        }

        other => bail!("Unknown mode: {}", other),
    }

    Ok(())
}

fn required_kind(settings: &Settings) -> Result<ReportKind> {
    let tag = settings
        .kind
        .as_deref()
        .with_context(|| format!("--kind is required in {} mode", settings.mode))?;
    Ok(ReportKind::parse(tag))
}

fn print_outcome(outcome: &CleanOutcome) {
    tracing::info!(
        "{}: {} rows in, {} rows out",
        outcome.kind,
        outcome.rows_in,
        outcome.rows_out
    );
    println!("{}", outcome.output.display());
}
