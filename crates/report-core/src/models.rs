use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReportError, Result};
use crate::time_utils::{format_snapshot_date, parse_snapshot_date};

/// Name of the derived grouping-key column appended to every cleaned table.
pub const GROUPING_KEY_COLUMN: &str = "Property Name";

/// Per-row property column present in bill and tenant exports.
pub const PROPERTY_COLUMN: &str = "Property";

/// Bill reference column; rows without one are footer noise.
pub const REFERENCE_COLUMN: &str = "Reference";

/// Prefix the portal puts in front of inline sub-report headers.
pub const MARKER_PREFIX: &str = "->";

/// A single CSV field. `None` is an empty (null) field.
pub type Cell = Option<String>;

// ── Table ─────────────────────────────────────────────────────────────────────

/// An in-memory tabular dataset: one header row plus positional data rows.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like [`Table::column_index`] but fails with [`ReportError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReportError::missing_column(name))
    }

    /// Ensure a column called `name` exists and reset it to all nulls.
    ///
    /// An existing column of that name is reused in place; otherwise the
    /// column is appended. Returns its index.
    pub fn reset_column(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = None;
                }
                idx
            }
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(None);
                }
                self.headers.len() - 1
            }
        }
    }

    /// Cell value at (`row`, `col`) as a string slice, `None` when null.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Remove up to `n` rows from the end.
    pub fn drop_last(&mut self, n: usize) {
        let keep = self.rows.len().saturating_sub(n);
        self.rows.truncate(keep);
    }

    /// Keep only the rows whose position satisfies `keep`, preserving order.
    pub fn retain_indexed(&mut self, mut keep: impl FnMut(usize, &[Cell]) -> bool) {
        let mut idx = 0usize;
        self.rows.retain(|row| {
            let retained = keep(idx, row);
            idx += 1;
            retained
        });
    }

    /// Append a row, padding with nulls up to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }
}

/// Count of non-null cells in `row`.
pub fn non_null_count(row: &[Cell]) -> usize {
    row.iter().filter(|c| c.is_some()).count()
}

// ── ReportKind ────────────────────────────────────────────────────────────────

/// The closed set of portal exports the normalizer knows how to clean.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// Current rent roll.
    RentRoll,
    /// Rent roll as of a month-end date.
    RentRollSnapshot { as_of: NaiveDate },
    WorkOrder,
    PurchaseOrder,
    Bill,
    /// Tenant directory.
    Tenant,
    /// Prospect source report.
    Prospect,
    /// Leasing funnel report.
    Leasing,
    /// Any tag not recognised above, kept verbatim.
    Unknown(String),
}

impl ReportKind {
    /// Resolve a report tag into a kind.
    ///
    /// Accepts both the hyphenated names (`rent-roll`) and the portal file
    /// prefixes (`rentroll`, `tenant_data`). `rentroll_MM-DD-YYYY` yields a
    /// [`ReportKind::RentRollSnapshot`]. Never fails: unrecognised tags
    /// become [`ReportKind::Unknown`].
    pub fn parse(tag: &str) -> Self {
        let normalised = tag.trim().to_lowercase();
        match normalised.as_str() {
            "rent-roll" | "rentroll" | "rent_roll" => Self::RentRoll,
            "work-order" | "work_order" => Self::WorkOrder,
            "purchase-order" | "purchase_order" => Self::PurchaseOrder,
            "bill" => Self::Bill,
            "tenant" | "tenant_data" => Self::Tenant,
            "prospect" => Self::Prospect,
            "leasing" => Self::Leasing,
            other => other
                .strip_prefix("rentroll_")
                .and_then(|date| parse_snapshot_date(date).ok())
                .map(|as_of| Self::RentRollSnapshot { as_of })
                .unwrap_or_else(|| Self::Unknown(tag.to_string())),
        }
    }

    /// Prefix used when naming the cleaned output file.
    pub fn file_prefix(&self) -> String {
        match self {
            Self::RentRoll => "rentroll".to_string(),
            Self::RentRollSnapshot { as_of } => {
                format!("rentroll_{}", format_snapshot_date(*as_of))
            }
            Self::WorkOrder => "work_order".to_string(),
            Self::PurchaseOrder => "purchase_order".to_string(),
            Self::Bill => "bill".to_string(),
            Self::Tenant => "tenant_data".to_string(),
            Self::Prospect => "prospect".to_string(),
            Self::Leasing => "leasing".to_string(),
            Self::Unknown(tag) => file_safe(tag),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// Map every character outside `[A-Za-z0-9_-]` to `_` so an arbitrary tag
/// can only name a file directly inside the output directory.
fn file_safe(tag: &str) -> String {
    let safe: String = tag
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "unknown".to_string()
    } else {
        safe
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_prefix())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
