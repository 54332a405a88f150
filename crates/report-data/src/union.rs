//! Trailing twelve-month rent-roll union.
//!
//! Each month-end rent-roll snapshot is cleaned into its own
//! `rentroll_MM-DD-YYYY_cleaned_*.csv`. The occupancy trend needs them as
//! one table tagged with the snapshot date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use report_core::error::{ReportError, Result};
use report_core::models::Table;
use report_core::time_utils::{format_snapshot_date, trailing_month_end_dates};
use tracing::{info, warn};

use crate::reader::{latest_by_prefix, read_table};
use crate::writer::write_table;

/// Column holding the `MM-DD-YYYY` snapshot date in the combined table.
pub const SNAPSHOT_DATE_COLUMN: &str = "date_str";

/// Prefix of the combined output file.
pub const COMBINED_PREFIX: &str = "rentroll_12_months_combined";

/// Load the newest cleaned snapshot for each trailing month-end date and
/// stack them.
///
/// Months without a snapshot are skipped. Returns `None` when no snapshot
/// exists at all.
pub fn union_rent_rolls(data_dir: &Path, today: NaiveDate) -> Result<Option<Table>> {
    let mut combined: Option<Table> = None;
    let mut loaded = 0usize;

    for date in trailing_month_end_dates(today) {
        let date_str = format_snapshot_date(date);
        let prefix = format!("rentroll_{date_str}_cleaned");

        let Some(path) = latest_by_prefix(data_dir, &prefix) else {
            warn!("No snapshot found for {}", prefix);
            continue;
        };

        info!("Loading {}", path.display());
        let mut snapshot = read_table(&path)?;
        let date_col = snapshot.reset_column(SNAPSHOT_DATE_COLUMN);
        for row in &mut snapshot.rows {
            row[date_col] = Some(date_str.clone());
        }

        combined = Some(match combined {
            Some(acc) => concat(acc, snapshot),
            None => snapshot,
        });
        loaded += 1;
    }

    match &combined {
        Some(table) => info!("Combined {} files, {} rows total", loaded, table.len()),
        None => warn!("No rent-roll snapshots found for the trailing months"),
    }

    Ok(combined)
}

/// Write the combined table to `rentroll_12_months_combined_{YYYYmmdd}.csv`.
pub fn write_combined(data_dir: &Path, table: &Table, today: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(data_dir).map_err(|source| ReportError::FileWrite {
        path: data_dir.to_path_buf(),
        source,
    })?;
    let path = data_dir.join(format!(
        "{COMBINED_PREFIX}_{}.csv",
        today.format("%Y%m%d")
    ));
    write_table(&path, table)?;
    info!("Saved combined file to: {}", path.display());
    Ok(path)
}

/// Stack `b` under `a`. Columns are the union of both headers in
/// first-seen order; cells absent from a source are null.
pub fn concat(mut a: Table, b: Table) -> Table {
    for header in &b.headers {
        if a.column_index(header).is_none() {
            a.reset_column(header);
        }
    }

    let mapping: Vec<usize> = b
        .headers
        .iter()
        .map(|h| a.column_index(h).unwrap_or_default())
        .collect();

    for row in b.rows {
        let mut out = vec![None; a.headers.len()];
        for (src, cell) in row.into_iter().enumerate() {
            out[mapping[src]] = cell;
        }
        a.rows.push(out);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::models::Cell;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn cells(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 14).unwrap()
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut a = Table::new(vec!["Unit".into(), "Status".into()]);
        a.push_row(cells(&["101", "Current"]));
        let mut b = Table::new(vec!["Status".into(), "Rent".into()]);
        b.push_row(cells(&["Vacant-Unrented", "900"]));

        let c = concat(a, b);
        assert_eq!(c.headers, vec!["Unit", "Status", "Rent"]);
        assert_eq!(c.rows[0], cells(&["101", "Current", ""]));
        assert_eq!(c.rows[1], cells(&["", "Vacant-Unrented", "900"]));
    }

    #[test]
    fn test_union_rent_rolls_tags_dates_and_uses_latest() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "rentroll_04-30-2025_cleaned_20250501_080000.csv",
            "Unit,Status,Property Name\n101,Current,Maple\n",
        );
        write(
            dir.path(),
            "rentroll_04-30-2025_cleaned_20250502_080000.csv",
            "Unit,Status,Property Name\n101,Current,Maple\n102,Evict,Maple\n",
        );
        write(
            dir.path(),
            "rentroll_03-31-2025_cleaned_20250401_080000.csv",
            "Unit,Status,Property Name\n101,Vacant-Unrented,Maple\n",
        );

        let table = union_rent_rolls(dir.path(), today()).unwrap().unwrap();
        let date_col = table.column_index(SNAPSHOT_DATE_COLUMN).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, date_col), Some("04-30-2025"));
        assert_eq!(table.cell(1, date_col), Some("04-30-2025"));
        assert_eq!(table.cell(2, date_col), Some("03-31-2025"));
    }

    #[test]
    fn test_union_rent_rolls_none_when_empty() {
        let dir = TempDir::new().unwrap();
        assert!(union_rent_rolls(dir.path(), today()).unwrap().is_none());
    }

    #[test]
    fn test_write_combined_name() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::new(vec!["Unit".into()]);
        table.push_row(cells(&["101"]));
        let path = write_combined(dir.path(), &table, today()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "rentroll_12_months_combined_20250514.csv"
        );
        assert!(path.exists());
    }
}
