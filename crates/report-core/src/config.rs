//! Per-run configuration.
//!
//! Everything a pipeline step needs to know about its environment (where
//! files live, which date counts as "today", how long to wait for downloads)
//! is resolved once from [`Settings`] and handed to each component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::{ReportError, Result};
use crate::settings::Settings;

pub const DEFAULT_WAIT_SECS: u64 = 30;
pub const DEFAULT_POLL_SECS: u64 = 2;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Where cleaned and combined CSVs are written and discovered.
    pub data_dir: PathBuf,
    /// Where the browser collaborator drops raw exports.
    pub download_dir: PathBuf,
    /// Reference date for month-end snapshot planning.
    pub today: NaiveDate,
    /// Maximum time to wait for a download.
    pub wait: Duration,
    /// Interval between download-folder polls.
    pub poll: Duration,
    /// Reject unknown report kinds instead of passing them through.
    pub strict_kinds: bool,
    /// Leave the raw download in place after cleaning.
    pub keep_source: bool,
}

impl RunConfig {
    /// Config rooted at explicit directories with default timings.
    pub fn new(data_dir: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            download_dir: download_dir.into(),
            today: Local::now().date_naive(),
            wait: Duration::from_secs(DEFAULT_WAIT_SECS),
            poll: Duration::from_secs(DEFAULT_POLL_SECS),
            strict_kinds: false,
            keep_source: false,
        }
    }

    /// Resolve a config from parsed CLI settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let data_dir = settings
            .data_dir
            .clone()
            .unwrap_or_else(|| default_data_dir(&home));
        let download_dir = settings
            .download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| home.join("Downloads"));

        let today = match settings.as_of.as_deref() {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| ReportError::Config(format!("--as-of must be YYYY-MM-DD, got {s}")))?,
            None => Local::now().date_naive(),
        };

        tracing::debug!(
            "Resolved data dir {}, download dir {}, reference date {}",
            data_dir.display(),
            download_dir.display(),
            today
        );

        Ok(Self {
            data_dir,
            download_dir,
            today,
            wait: Duration::from_secs(settings.wait_secs),
            poll: Duration::from_secs(settings.poll_secs),
            strict_kinds: settings.strict_kinds,
            keep_source: settings.keep_source,
        })
    }

    /// Wall-clock time used to stamp output files.
    pub fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// `~/.portal-report/data`
pub fn default_data_dir(home: &Path) -> PathBuf {
    home.join(".portal-report").join("data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_settings_explicit_dirs() {
        let settings = Settings::parse_from([
            "portal-report",
            "--data-dir",
            "/srv/data",
            "--download-dir",
            "/srv/dl",
            "--wait-secs",
            "10",
            "--poll-secs",
            "1",
            "--strict-kinds",
        ]);
        let config = RunConfig::from_settings(&settings).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.download_dir, PathBuf::from("/srv/dl"));
        assert_eq!(config.wait, Duration::from_secs(10));
        assert_eq!(config.poll, Duration::from_secs(1));
        assert!(config.strict_kinds);
        assert!(!config.keep_source);
    }

    #[test]
    fn test_from_settings_as_of() {
        let settings = Settings::parse_from(["portal-report", "--as-of", "2025-05-14"]);
        let config = RunConfig::from_settings(&settings).unwrap();
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2025, 5, 14).unwrap());
    }

    #[test]
    fn test_from_settings_bad_as_of() {
        let settings = Settings::parse_from(["portal-report", "--as-of", "05/14/2025"]);
        let err = RunConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_default_data_dir() {
        assert_eq!(
            default_data_dir(Path::new("/home/ops")),
            PathBuf::from("/home/ops/.portal-report/data")
        );
    }
}
