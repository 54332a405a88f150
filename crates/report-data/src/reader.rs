//! CSV loading and file discovery.
//!
//! Reads raw portal exports and previously cleaned outputs into [`Table`]s,
//! and locates the newest file for a category in the data or downloads
//! directory.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;
use report_core::error::{ReportError, Result};
use report_core::models::{Cell, Table};
use report_core::time_utils::parse_output_timestamp;
use tracing::{debug, warn};

const UTF8_BOM: char = '\u{feff}';

// ── Public API ────────────────────────────────────────────────────────────────

/// Read a CSV file whose first record is the header row.
pub fn read_table(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table_from(BufReader::new(file))?;
    debug!(
        "Read {} rows x {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Read CSV data from any reader.
///
/// Empty fields become null cells. Rows shorter than the header are padded
/// with nulls; rows longer than the header are rejected.
pub fn read_table_from<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(UTF8_BOM).to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ReportError::missing_column("<header row>"));
    }

    let width = headers.len();
    let mut table = Table::new(headers);

    for (idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        if record.len() > width {
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(idx as u64 + 2);
            return Err(ReportError::RaggedRow {
                line,
                expected: width,
                found: record.len(),
            });
        }
        let row: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

/// All `.csv` files directly inside `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_csv(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// The most recently created `.csv` in `dir`, if any.
///
/// Falls back to modification time on platforms without creation times.
pub fn latest_download(dir: &Path) -> Option<PathBuf> {
    find_csv_files(dir)
        .into_iter()
        .filter_map(|path| {
            let meta = std::fs::metadata(&path).ok()?;
            let stamp: SystemTime = meta.created().or_else(|_| meta.modified()).ok()?;
            Some((stamp, path))
        })
        .max()
        .map(|(_, path)| path)
}

/// Extract the `YYYYmmdd_HHMMSS` stamp from a name like
/// `tenant_data_cleaned_20250321_115751.csv`.
pub fn extract_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    parts.next()?;
    parse_output_timestamp(&format!("{date}_{time}"))
}

/// Newest `{prefix}*.csv` in `dir`, ordered by the timestamp embedded in the
/// name. Files without a parsable stamp sort before stamped ones.
pub fn latest_by_prefix(dir: &Path, prefix: &str) -> Option<PathBuf> {
    find_csv_files(dir)
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            if !name.starts_with(prefix) {
                return None;
            }
            let stamp = extract_timestamp(&name);
            if stamp.is_none() {
                debug!("No timestamp in {}", name);
            }
            Some(((stamp, name), path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
}

/// Whether a cleaned output for `prefix` already exists in `dir`.
pub fn has_cleaned_output(dir: &Path, prefix: &str) -> bool {
    let needle = format!("{prefix}_cleaned_");
    find_csv_files(dir).iter().any(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(&needle))
            .unwrap_or(false)
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
