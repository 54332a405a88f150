//! Portfolio metrics over cleaned rent rolls.
//!
//! Produces the numbers behind the dashboard cards: unit counts, occupancy,
//! rent and past-due totals per property, status distribution, and the
//! month-by-month occupancy trend from the combined snapshot table.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use report_core::error::Result;
use report_core::models::{Table, GROUPING_KEY_COLUMN};
use report_core::time_utils::parse_snapshot_date;
use serde::Serialize;
use tracing::warn;

use crate::union::SNAPSHOT_DATE_COLUMN;

pub const STATUS_COLUMN: &str = "Status";
pub const RENT_COLUMN: &str = "Rent";
pub const PAST_DUE_COLUMN: &str = "Past Due";
pub const MOVE_OUT_COLUMN: &str = "Move-out";

/// Unit statuses that count towards occupancy.
pub const OCCUPIED_STATUSES: &[&str] = &["Current", "Notice-Unrented", "Notice-Rented", "Evict"];

/// Label used for rows before the first property header.
const UNGROUPED: &str = "(ungrouped)";

// ── Money ─────────────────────────────────────────────────────────────────────

/// Parse a portal money string such as `"$1,200.50"`. Unparsable → `None`.
pub fn parse_money(value: &str) -> Option<f64> {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    let re = STRIP.get_or_init(|| Regex::new(r"[\$,\s]").expect("regex is valid"));
    let cleaned = re.replace_all(value, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn is_occupied(status: &str) -> bool {
    OCCUPIED_STATUSES.contains(&status.trim())
}

// ── UnitStats ─────────────────────────────────────────────────────────────────

/// Unit, occupancy and money totals accumulated over rent-roll rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitStats {
    pub units: u64,
    pub occupied: u64,
    pub rent: f64,
    pub past_due: f64,
}

impl UnitStats {
    fn add_row(&mut self, status: Option<&str>, rent: Option<f64>, past_due: Option<f64>) {
        self.units += 1;
        if status.map(is_occupied).unwrap_or(false) {
            self.occupied += 1;
        }
        self.rent += rent.unwrap_or(0.0);
        self.past_due += past_due.unwrap_or(0.0);
    }

    /// Occupied units as a percentage of all units; `0.0` when empty.
    pub fn occupancy_rate(&self) -> f64 {
        if self.units == 0 {
            0.0
        } else {
            self.occupied as f64 / self.units as f64 * 100.0
        }
    }
}

// ── RentRollSummary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PropertyBreakdown {
    pub property: String,
    #[serde(flatten)]
    pub stats: UnitStats,
    pub occupancy_rate: f64,
}

/// Headline metrics for one cleaned rent roll.
#[derive(Debug, Clone, Serialize)]
pub struct RentRollSummary {
    #[serde(flatten)]
    pub totals: UnitStats,
    pub occupancy_rate: f64,
    /// Rows with a scheduled move-out date.
    pub move_outs: u64,
    pub status_counts: BTreeMap<String, u64>,
    /// Per-property breakdown sorted by property name.
    pub properties: Vec<PropertyBreakdown>,
}

impl RentRollSummary {
    /// Summarise a cleaned rent roll.
    ///
    /// Requires a `Status` column; `Rent`, `Past Due`, `Move-out` and
    /// `Property Name` are used when present.
    pub fn from_table(table: &Table) -> Result<Self> {
        let status_col = table.require_column(STATUS_COLUMN)?;
        let rent_col = table.column_index(RENT_COLUMN);
        let past_due_col = table.column_index(PAST_DUE_COLUMN);
        let move_out_col = table.column_index(MOVE_OUT_COLUMN);
        let key_col = table.column_index(GROUPING_KEY_COLUMN);

        let money = |row: usize, col: Option<usize>| {
            col.and_then(|c| table.cell(row, c)).and_then(parse_money)
        };

        let mut totals = UnitStats::default();
        let mut by_property: BTreeMap<String, UnitStats> = BTreeMap::new();
        let mut move_outs = 0u64;

        for row in 0..table.len() {
            let status = table.cell(row, status_col);
            let rent = money(row, rent_col);
            let past_due = money(row, past_due_col);

            totals.add_row(status, rent, past_due);

            let property = key_col
                .and_then(|c| table.cell(row, c))
                .unwrap_or(UNGROUPED)
                .to_string();
            by_property
                .entry(property)
                .or_default()
                .add_row(status, rent, past_due);

            if move_out_col.and_then(|c| table.cell(row, c)).is_some() {
                move_outs += 1;
            }
        }

        let properties = by_property
            .into_iter()
            .map(|(property, stats)| PropertyBreakdown {
                occupancy_rate: round2(stats.occupancy_rate()),
                property,
                stats,
            })
            .collect();

        Ok(Self {
            occupancy_rate: round2(totals.occupancy_rate()),
            totals,
            move_outs,
            status_counts: status_distribution(table, STATUS_COLUMN)?,
            properties,
        })
    }
}

/// Count rows per value of `column`, skipping nulls.
pub fn status_distribution(table: &Table, column: &str) -> Result<BTreeMap<String, u64>> {
    let col = table.require_column(column)?;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for row in 0..table.len() {
        if let Some(value) = table.cell(row, col) {
            *counts.entry(value.trim().to_string()).or_default() += 1;
        }
    }
    Ok(counts)
}

// ── Occupancy trend ───────────────────────────────────────────────────────────

/// One month-end point on the occupancy trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyPoint {
    pub date: NaiveDate,
    /// e.g. `"Apr 2025"`.
    pub month: String,
    pub occupancy_rate: f64,
    pub total_units: u64,
}

/// Group a combined rent roll by snapshot date, oldest first.
///
/// Rows whose `date_str` is missing or malformed are skipped with a warning.
pub fn occupancy_trend(table: &Table) -> Result<Vec<OccupancyPoint>> {
    let date_col = table.require_column(SNAPSHOT_DATE_COLUMN)?;
    let status_col = table.require_column(STATUS_COLUMN)?;

    let mut by_date: BTreeMap<NaiveDate, UnitStats> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in 0..table.len() {
        let Some(date) = table
            .cell(row, date_col)
            .and_then(|s| parse_snapshot_date(s).ok())
        else {
            skipped += 1;
            continue;
        };
        by_date
            .entry(date)
            .or_default()
            .add_row(table.cell(row, status_col), None, None);
    }

    if skipped > 0 {
        warn!("Skipped {} rows without a valid {}", skipped, SNAPSHOT_DATE_COLUMN);
    }

    Ok(by_date
        .into_iter()
        .map(|(date, stats)| OccupancyPoint {
            date,
            month: date.format("%b %Y").to_string(),
            occupancy_rate: round2(stats.occupancy_rate()),
            total_units: stats.units,
        })
        .collect())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::models::Cell;

    fn cells(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn rent_roll() -> Table {
        let mut t = Table::new(
            ["Unit", "Status", "Rent", "Past Due", "Move-out", "Property Name"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        t.push_row(cells(&["101", "Current", "$1,200.00", "$0.00", "", "Maple"]));
        t.push_row(cells(&["102", "Notice-Rented", "$1,100.00", "$150.00", "05/31/2025", "Maple"]));
        t.push_row(cells(&["103", "Vacant-Unrented", "", "", "", "Maple"]));
        t.push_row(cells(&["201", "Evict", "950", "1,900.50", "", "Oak"]));
        t
    }

    // ── parse_money ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("$1,200.50"), Some(1200.5));
        assert_eq!(parse_money("950"), Some(950.0));
        assert_eq!(parse_money(" -75.25 "), Some(-75.25));
        assert_eq!(parse_money("$"), None);
        assert_eq!(parse_money("n/a"), None);
    }

    // ── RentRollSummary ───────────────────────────────────────────────────────

    #[test]
    fn test_summary_totals() {
        let summary = RentRollSummary::from_table(&rent_roll()).unwrap();
        assert_eq!(summary.totals.units, 4);
        assert_eq!(summary.totals.occupied, 3);
        assert_eq!(summary.occupancy_rate, 75.0);
        assert!((summary.totals.rent - 3250.0).abs() < 1e-9);
        assert!((summary.totals.past_due - 2050.5).abs() < 1e-9);
        assert_eq!(summary.move_outs, 1);
    }

    #[test]
    fn test_summary_per_property() {
        let summary = RentRollSummary::from_table(&rent_roll()).unwrap();
        let names: Vec<&str> = summary.properties.iter().map(|p| p.property.as_str()).collect();
        assert_eq!(names, vec!["Maple", "Oak"]);

        let maple = &summary.properties[0];
        assert_eq!(maple.stats.units, 3);
        assert_eq!(maple.stats.occupied, 2);
        assert_eq!(maple.occupancy_rate, 66.67);
        assert!((maple.stats.past_due - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_status_counts() {
        let summary = RentRollSummary::from_table(&rent_roll()).unwrap();
        assert_eq!(summary.status_counts.get("Current"), Some(&1));
        assert_eq!(summary.status_counts.get("Vacant-Unrented"), Some(&1));
        assert_eq!(summary.status_counts.len(), 4);
    }

    #[test]
    fn test_summary_requires_status() {
        let t = Table::new(vec!["Unit".into()]);
        assert!(RentRollSummary::from_table(&t).is_err());
    }

    #[test]
    fn test_summary_without_key_column_groups_everything() {
        let mut t = Table::new(vec!["Unit".into(), "Status".into()]);
        t.push_row(cells(&["1", "Current"]));
        let summary = RentRollSummary::from_table(&t).unwrap();
        assert_eq!(summary.properties.len(), 1);
        assert_eq!(summary.properties[0].property, "(ungrouped)");
    }

    #[test]
    fn test_summary_serializes_flat_totals() {
        let summary = RentRollSummary::from_table(&rent_roll()).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["units"], 4);
        assert_eq!(json["properties"][1]["property"], "Oak");
    }

    #[test]
    fn test_empty_table_rate_is_zero() {
        let t = Table::new(vec!["Status".into()]);
        let summary = RentRollSummary::from_table(&t).unwrap();
        assert_eq!(summary.occupancy_rate, 0.0);
    }

    // ── occupancy_trend ───────────────────────────────────────────────────────

    #[test]
    fn test_occupancy_trend_sorted_by_date() {
        let mut t = Table::new(vec!["Unit".into(), "Status".into(), "date_str".into()]);
        t.push_row(cells(&["101", "Current", "04-30-2025"]));
        t.push_row(cells(&["102", "Vacant-Rented", "04-30-2025"]));
        t.push_row(cells(&["101", "Current", "12-31-2024"]));
        t.push_row(cells(&["102", "Notice-Unrented", "12-31-2024"]));
        t.push_row(cells(&["103", "Current", "bad-date"]));

        let trend = occupancy_trend(&t).unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].month, "Dec 2024");
        assert_eq!(trend[0].occupancy_rate, 100.0);
        assert_eq!(trend[0].total_units, 2);
        assert_eq!(trend[1].month, "Apr 2025");
        assert_eq!(trend[1].occupancy_rate, 50.0);
    }

    #[test]
    fn test_occupancy_trend_requires_date_column() {
        let t = Table::new(vec!["Status".into()]);
        assert!(occupancy_trend(&t).is_err());
    }
}
