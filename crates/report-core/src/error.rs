use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the portal report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be created, written or moved into place.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader or writer rejected the data.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column required by the report kind is absent from the header.
    #[error("Missing expected column: {column}")]
    MissingColumn { column: String },

    /// A data row carries more fields than the header declares.
    #[error("Row {line} has {found} fields, expected at most {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The report tag did not match any known kind and strict mode is on.
    #[error("Unhandled report kind: {0}")]
    UnhandledKind(String),

    /// No CSV showed up in the downloads folder before the wait expired.
    #[error("No CSV file appeared in {dir} after {waited_secs}s")]
    NoDownload { dir: PathBuf, waited_secs: u64 },

    /// A snapshot date string did not match `MM-DD-YYYY`.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The last-used params could not be serialised.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Raw I/O error from persisting settings.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Shorthand for a [`ReportError::MissingColumn`].
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ReportError::FileRead {
            path: PathBuf::from("/downloads/rent_roll.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/downloads/rent_roll.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = ReportError::missing_column("Reference");
        assert_eq!(err.to_string(), "Missing expected column: Reference");
    }

    #[test]
    fn test_error_display_ragged_row() {
        let err = ReportError::RaggedRow {
            line: 7,
            expected: 3,
            found: 5,
        };
        assert_eq!(err.to_string(), "Row 7 has 5 fields, expected at most 3");
    }

    #[test]
    fn test_error_display_unhandled_kind() {
        let err = ReportError::UnhandledKind("vendor_ledger".to_string());
        assert_eq!(err.to_string(), "Unhandled report kind: vendor_ledger");
    }

    #[test]
    fn test_error_display_no_download() {
        let err = ReportError::NoDownload {
            dir: PathBuf::from("/tmp/dl"),
            waited_secs: 30,
        };
        assert_eq!(err.to_string(), "No CSV file appeared in /tmp/dl after 30s");
    }

    #[test]
    fn test_error_display_config() {
        let err = ReportError::Config("download dir unset".to_string());
        assert_eq!(err.to_string(), "Configuration error: download dir unset");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReportError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
