//! Export normalizer.
//!
//! The portal flattens grouped reports into a single table: each property
//! starts with an inline header row whose first cell begins with `->`, is
//! usually preceded by a subtotal row for the previous group, and the file
//! ends with footer rows. This module strips those artifacts and rebuilds
//! the grouping as an explicit `Property Name` column.

use std::path::{Path, PathBuf};

use report_core::config::RunConfig;
use report_core::error::{ReportError, Result};
use report_core::models::{
    non_null_count, Cell, ReportKind, Table, GROUPING_KEY_COLUMN, MARKER_PREFIX, PROPERTY_COLUMN,
    REFERENCE_COLUMN,
};
use report_core::time_utils::output_timestamp;
use tracing::{debug, info, warn};

use crate::reader::read_table;
use crate::writer::{cleaned_output_path, write_table};

/// Footer rows trailing grouped exports (rent roll, work/purchase orders, bills).
const GROUPED_FOOTER_ROWS: usize = 2;

/// Footer rows trailing flat exports (tenants, prospects).
const FLAT_FOOTER_ROWS: usize = 1;

/// Rows with at most this many non-null cells look like subtotals.
const SUMMARY_MAX_CELLS: usize = 3;

const SUMMARY_KEYWORDS: &[&str] = &["units", "occ", "%"];

// ── Public types ──────────────────────────────────────────────────────────────

/// How a report kind is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningStrategy {
    /// Marker rows carry the grouping key; forward-fill it and drop markers,
    /// their preceding subtotal rows and the footer.
    MarkerGrouped,
    /// Drop markers and footer, drop rows without a reference, derive the
    /// key from the per-row property column.
    Bill,
    /// Derive the key from the per-row property column; drop one footer row.
    PropertyColumn,
    /// Drop one footer row only.
    DropFooter,
    /// Known kind that needs no cleaning.
    PassThrough,
    /// Unrecognised kind; rows are left untouched.
    Unhandled,
}

impl CleaningStrategy {
    /// Apply the strategy. Every variant appends (or resets) the
    /// `Property Name` column.
    pub fn apply(self, table: Table) -> Result<Table> {
        match self {
            Self::MarkerGrouped => clean_marker_grouped(table),
            Self::Bill => clean_bill(table),
            Self::PropertyColumn => clean_property_column(table),
            Self::DropFooter => Ok(drop_footer(table)),
            Self::PassThrough | Self::Unhandled => Ok(with_empty_key(table)),
        }
    }
}

/// Whether the kind was actually cleaned or only passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Cleaned,
    /// The tag was not recognised; the table has its raw shape.
    PassedThrough { tag: String },
}

/// Result of [`clean_table`].
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub disposition: Disposition,
}

/// Result of [`clean_file`].
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub kind: ReportKind,
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
    pub disposition: Disposition,
}

// ── Strategy selection ────────────────────────────────────────────────────────

pub fn strategy_for(kind: &ReportKind) -> CleaningStrategy {
    match kind {
        ReportKind::RentRoll
        | ReportKind::RentRollSnapshot { .. }
        | ReportKind::WorkOrder
        | ReportKind::PurchaseOrder => CleaningStrategy::MarkerGrouped,
        ReportKind::Bill => CleaningStrategy::Bill,
        ReportKind::Tenant => CleaningStrategy::PropertyColumn,
        ReportKind::Prospect => CleaningStrategy::DropFooter,
        ReportKind::Leasing => CleaningStrategy::PassThrough,
        ReportKind::Unknown(_) => CleaningStrategy::Unhandled,
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Clean an in-memory table according to `kind`.
pub fn clean_table(table: Table, kind: &ReportKind) -> Result<Cleaned> {
    let strategy = strategy_for(kind);
    let disposition = match kind {
        ReportKind::Unknown(tag) => {
            warn!(tag = %tag, "Unrecognised report kind; passing rows through unchanged");
            Disposition::PassedThrough { tag: tag.clone() }
        }
        _ => Disposition::Cleaned,
    };

    debug!(kind = %kind, ?strategy, rows = table.len(), "cleaning table");
    let table = strategy.apply(table)?;

    Ok(Cleaned { table, disposition })
}

/// Read `input`, clean it as `kind` and write
/// `{data_dir}/{prefix}_cleaned_{timestamp}.csv`.
///
/// Nothing is written when reading or cleaning fails, or when the kind is
/// unknown and `config.strict_kinds` is set.
pub fn clean_file(input: &Path, kind: &ReportKind, config: &RunConfig) -> Result<CleanOutcome> {
    let raw = read_table(input)?;
    let rows_in = raw.len();

    let cleaned = clean_table(raw, kind)?;
    if let Disposition::PassedThrough { tag } = &cleaned.disposition {
        if config.strict_kinds {
            return Err(ReportError::UnhandledKind(tag.clone()));
        }
    }

    std::fs::create_dir_all(&config.data_dir).map_err(|source| ReportError::FileWrite {
        path: config.data_dir.clone(),
        source,
    })?;
    let output = cleaned_output_path(
        &config.data_dir,
        &kind.file_prefix(),
        &output_timestamp(config.now()),
    );
    write_table(&output, &cleaned.table)?;

    info!(
        kind = %kind,
        rows_in,
        rows_out = cleaned.table.len(),
        "CSV saved to: {}",
        output.display()
    );

    Ok(CleanOutcome {
        kind: kind.clone(),
        output,
        rows_in,
        rows_out: cleaned.table.len(),
        disposition: cleaned.disposition,
    })
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Derive a grouping key from a marker-row label.
///
/// Trims, strips the leading `->` marker (and any further `-`, `>` or
/// whitespace it leaves behind), then keeps the text before the first
/// `" - "`. Total and idempotent: `parse_grouping_key(parse_grouping_key(s))
/// == parse_grouping_key(s)`.
pub fn parse_grouping_key(value: &str) -> String {
    let text = value
        .trim_start_matches(|c: char| c == '-' || c == '>' || c.is_whitespace())
        .trim_end();
    match text.find(" - ") {
        Some(pos) => text[..pos].trim().to_string(),
        None => text.to_string(),
    }
}

/// Derive a grouping key from a per-row property value such as
/// `"Riverside Commons - 900 River Rd"`.
pub fn split_property_name(value: &str) -> String {
    match value.find(" - ") {
        Some(pos) => value[..pos].trim().to_string(),
        None => value.trim().to_string(),
    }
}

/// A row whose first cell, trimmed, starts with the marker prefix.
pub fn is_marker_row(row: &[Cell]) -> bool {
    row.first()
        .and_then(|c| c.as_deref())
        .map(|v| v.trim().starts_with(MARKER_PREFIX))
        .unwrap_or(false)
}

/// Heuristic for subtotal rows: mentions units, occupancy or a percentage,
/// or is nearly empty.
pub fn is_summary_like(row: &[Cell]) -> bool {
    if non_null_count(row) <= SUMMARY_MAX_CELLS {
        return true;
    }
    let text = row
        .iter()
        .filter_map(|c| c.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SUMMARY_KEYWORDS.iter().any(|kw| text.contains(kw))
}

// ── Strategies ────────────────────────────────────────────────────────────────

fn clean_marker_grouped(mut table: Table) -> Result<Table> {
    let key_col = table.reset_column(GROUPING_KEY_COLUMN);

    let markers: Vec<bool> = table.rows.iter().map(|r| is_marker_row(r)).collect();

    // Classify before the key column is filled so it counts as null.
    let mut remove = markers.clone();
    for idx in 1..table.rows.len() {
        if markers[idx] && is_summary_like(&table.rows[idx - 1]) {
            remove[idx - 1] = true;
        }
    }

    let mut current: Option<String> = None;
    for (idx, row) in table.rows.iter_mut().enumerate() {
        if markers[idx] {
            current = row[0].as_deref().map(parse_grouping_key);
        }
        row[key_col] = current.clone();
    }

    let marker_count = markers.iter().filter(|m| **m).count();
    let removed = remove.iter().filter(|r| **r).count();
    debug!(
        markers = marker_count,
        summaries = removed - marker_count,
        "dropping marker and summary rows"
    );

    table.retain_indexed(|idx, _| !remove[idx]);
    table.drop_last(GROUPED_FOOTER_ROWS);
    Ok(table)
}

fn clean_bill(mut table: Table) -> Result<Table> {
    let key_col = table.reset_column(GROUPING_KEY_COLUMN);
    let reference = table.require_column(REFERENCE_COLUMN)?;
    let property = table.require_column(PROPERTY_COLUMN)?;

    table.retain_indexed(|_, row| !is_marker_row(row));
    table.drop_last(GROUPED_FOOTER_ROWS);
    table.retain_indexed(|_, row| row[reference].is_some());

    for row in &mut table.rows {
        row[key_col] = row[property].as_deref().map(split_property_name);
    }
    Ok(table)
}

fn clean_property_column(mut table: Table) -> Result<Table> {
    let key_col = table.reset_column(GROUPING_KEY_COLUMN);
    let property = table.require_column(PROPERTY_COLUMN)?;

    for row in &mut table.rows {
        row[key_col] = row[property].as_deref().map(split_property_name);
    }
    table.drop_last(FLAT_FOOTER_ROWS);
    Ok(table)
}

fn drop_footer(table: Table) -> Table {
    let mut table = with_empty_key(table);
    table.drop_last(FLAT_FOOTER_ROWS);
    table
}

fn with_empty_key(mut table: Table) -> Table {
    table.reset_column(GROUPING_KEY_COLUMN);
    table
}

// ── Tests ─────────────────────────────────────────────────────────────────────
