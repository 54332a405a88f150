//! Download-folder watcher.
//!
//! The browser collaborator triggers an export and the portal's CSV lands in
//! the downloads folder some time later. [`DownloadWatcher`] polls the folder
//! until a CSV shows up or the wait budget runs out.

use std::path::PathBuf;
use std::time::Duration;

use report_core::config::RunConfig;
use report_core::error::{ReportError, Result};
use report_data::reader::latest_download;
use tokio::time::{self, Instant};

pub struct DownloadWatcher {
    dir: PathBuf,
    wait: Duration,
    poll: Duration,
}

impl DownloadWatcher {
    pub fn new(dir: impl Into<PathBuf>, wait: Duration, poll: Duration) -> Self {
        Self {
            dir: dir.into(),
            wait,
            // A zero interval would spin.
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.download_dir.clone(), config.wait, config.poll)
    }

    /// Wait for a CSV to appear and return the newest one.
    ///
    /// Checks immediately, then every `poll` until `wait` has elapsed.
    pub async fn wait_for_csv(&self) -> Result<PathBuf> {
        tracing::info!("Waiting for CSV file in {}", self.dir.display());
        let deadline = Instant::now() + self.wait;

        loop {
            if let Some(path) = latest_download(&self.dir) {
                tracing::info!("Latest downloaded file: {}", path.display());
                return Ok(path);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ReportError::NoDownload {
                    dir: self.dir.clone(),
                    waited_secs: self.wait.as_secs(),
                });
            }

            time::sleep(self.poll.min(deadline - now)).await;
        }
    }
}
