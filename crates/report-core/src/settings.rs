use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Clean property-management portal exports and summarise them
#[derive(Parser, Debug, Clone)]
#[command(
    name = "portal-report",
    about = "Clean property-management portal exports and summarise them",
    version
)]
pub struct Settings {
    /// What to run
    #[arg(long, default_value = "summary", value_parser = ["clean", "ingest", "union", "summary", "pending"])]
    pub mode: String,

    /// Raw export to clean (clean mode)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Report kind tag, e.g. rentroll, tenant_data, bill, rentroll_04-30-2025
    #[arg(long)]
    pub kind: Option<String>,

    /// Directory for cleaned and combined CSVs
    #[arg(long, env = "PORTAL_REPORT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the browser drops exports into
    #[arg(long, env = "PORTAL_REPORT_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Seconds to wait for a download to appear
    #[arg(long, default_value = "30")]
    pub wait_secs: u64,

    /// Seconds between download-folder polls (1-60)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..=60))]
    pub poll_secs: u64,

    /// Reference date (YYYY-MM-DD) for month-end snapshots; defaults to today
    #[arg(long)]
    pub as_of: Option<String>,

    /// Fail instead of passing unknown report kinds through
    #[arg(long)]
    pub strict_kinds: bool,

    /// Keep the raw download after cleaning
    #[arg(long)]
    pub keep_source: bool,

    /// Summary output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.portal-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".portal-report").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; takes args and a config path so tests can
    /// redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Could not clear last-used params: {}", e);
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; env-provided values count as explicit too.
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if settings.download_dir.is_none() {
            settings.download_dir = last.download_dir;
        }
        if !is_arg_explicitly_set(&matches, "wait_secs") {
            if let Some(v) = last.wait_secs {
                settings.wait_secs = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!("Could not save last-used params: {}", e);
        }

        settings
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            download_dir: s.download_dir.clone(),
            wait_secs: Some(s.wait_secs),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
