//! Ingest pipeline.
//!
//! Ties the download watcher to the normalizer: wait for the export, clean
//! it into the data directory, then remove the raw download. Also plans which
//! month-end rent-roll snapshots are still missing and rebuilds the combined
//! twelve-month file.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use report_core::config::RunConfig;
use report_core::error::Result;
use report_core::models::ReportKind;
use report_core::time_utils::trailing_month_end_dates;
use report_data::normalizer::{clean_file, CleanOutcome};
use report_data::reader::has_cleaned_output;
use report_data::union::{union_rent_rolls, write_combined};

use crate::downloads::DownloadWatcher;

pub struct IngestPipeline {
    config: RunConfig,
}

impl IngestPipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Wait for the next export in the downloads folder and clean it as `kind`.
    pub async fn ingest(&self, kind: &ReportKind) -> Result<CleanOutcome> {
        let source = DownloadWatcher::from_config(&self.config)
            .wait_for_csv()
            .await?;
        self.clean_path(&source, kind)
    }

    /// Clean an already-downloaded export, then delete it unless
    /// `keep_source` is set. The source is left alone when cleaning fails.
    pub fn clean_path(&self, source: &Path, kind: &ReportKind) -> Result<CleanOutcome> {
        let outcome = clean_file(source, kind, &self.config)?;

        if !self.config.keep_source {
            match std::fs::remove_file(source) {
                Ok(()) => tracing::info!("Deleted original file: {}", source.display()),
                Err(e) => tracing::warn!("Could not delete {}: {}", source.display(), e),
            }
        }

        Ok(outcome)
    }

    /// Month-end snapshot dates that have no cleaned rent roll yet.
    pub fn pending_snapshots(&self) -> Vec<NaiveDate> {
        pending_snapshots(&self.config)
    }

    /// Rebuild `rentroll_12_months_combined_{date}.csv` from the snapshots on
    /// disk. Returns `None` when there is nothing to combine.
    pub fn refresh_combined(&self) -> Result<Option<PathBuf>> {
        let Some(table) = union_rent_rolls(&self.config.data_dir, self.config.today)? else {
            return Ok(None);
        };
        write_combined(&self.config.data_dir, &table, self.config.today).map(Some)
    }
}

/// Trailing month-end dates whose `rentroll_{MM-DD-YYYY}` output is missing
/// from the data directory, most recent first.
pub fn pending_snapshots(config: &RunConfig) -> Vec<NaiveDate> {
    trailing_month_end_dates(config.today)
        .into_iter()
        .filter(|&as_of| {
            let prefix = ReportKind::RentRollSnapshot { as_of }.file_prefix();
            let done = has_cleaned_output(&config.data_dir, &prefix);
            if done {
                tracing::debug!("Found existing file for {}", prefix);
            }
            !done
        })
        .collect()
}
