use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use report_core::error::Result;
use report_core::formatting::{format_currency, format_percent};
use report_data::aggregator::{
    occupancy_trend, status_distribution, OccupancyPoint, RentRollSummary, STATUS_COLUMN,
};
use report_data::reader::{latest_by_prefix, read_table};
use report_data::union::COMBINED_PREFIX;

const RENT_ROLL_PREFIX: &str = "rentroll_cleaned";
const TENANT_PREFIX: &str = "tenant_data_cleaned";

/// Everything the summary view shows, loaded from the newest files on disk.
#[derive(Debug, Default)]
pub struct PortfolioReport {
    pub rent_roll: Option<(PathBuf, RentRollSummary)>,
    pub tenant_status: Option<(PathBuf, BTreeMap<String, u64>)>,
    pub trend: Option<(PathBuf, Vec<OccupancyPoint>)>,
}

impl PortfolioReport {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut report = Self::default();

        if let Some(path) = latest_by_prefix(data_dir, RENT_ROLL_PREFIX) {
            tracing::info!("Latest rent roll: {}", path.display());
            let summary = RentRollSummary::from_table(&read_table(&path)?)?;
            report.rent_roll = Some((path, summary));
        }

        if let Some(path) = latest_by_prefix(data_dir, TENANT_PREFIX) {
            tracing::info!("Latest tenant data: {}", path.display());
            let counts = status_distribution(&read_table(&path)?, STATUS_COLUMN)?;
            report.tenant_status = Some((path, counts));
        }

        if let Some(path) = latest_by_prefix(data_dir, COMBINED_PREFIX) {
            tracing::info!("Latest combined rent roll: {}", path.display());
            let trend = occupancy_trend(&read_table(&path)?)?;
            report.trend = Some((path, trend));
        }

        Ok(report)
    }

    pub fn is_empty(&self) -> bool {
        self.rent_roll.is_none() && self.tenant_status.is_none() && self.trend.is_none()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rent_roll": self.rent_roll.as_ref().map(|(path, s)| serde_json::json!({
                "source": path,
                "summary": s,
            })),
            "tenant_status": self.tenant_status.as_ref().map(|(path, c)| serde_json::json!({
                "source": path,
                "counts": c,
            })),
            "occupancy_trend": self.trend.as_ref().map(|(path, t)| serde_json::json!({
                "source": path,
                "points": t,
            })),
        })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if let Some((path, s)) = &self.rent_roll {
            let _ = writeln!(out, "Rent roll ({})", path.display());
            let _ = writeln!(out, "  Total units      {}", s.totals.units);
            let _ = writeln!(out, "  Occupancy rate   {}", format_percent(s.occupancy_rate));
            let _ = writeln!(out, "  Total rent       {}", format_currency(s.totals.rent));
            let _ = writeln!(out, "  Past due         {}", format_currency(s.totals.past_due));
            let _ = writeln!(out, "  Move-outs        {}", s.move_outs);
            let _ = writeln!(out, "  By property:");
            for p in &s.properties {
                let _ = writeln!(
                    out,
                    "    {:<32} {:>4} units  {:>8}  past due {}",
                    p.property,
                    p.stats.units,
                    format_percent(p.occupancy_rate),
                    format_currency(p.stats.past_due)
                );
            }
        }

        if let Some((path, counts)) = &self.tenant_status {
            let _ = writeln!(out, "Tenant status ({})", path.display());
            for (status, count) in counts {
                let _ = writeln!(out, "  {:<24} {}", status, count);
            }
        }

        if let Some((path, trend)) = &self.trend {
            let _ = writeln!(out, "Occupancy trend ({})", path.display());
            for point in trend {
                let _ = writeln!(
                    out,
                    "  {:<10} {:>8}  {} units",
                    point.month,
                    format_percent(point.occupancy_rate),
                    point.total_units
                );
            }
        }

        out
    }
}
