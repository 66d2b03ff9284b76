//! Cost Explorer spend grouped by service over a date range.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::report::format_dollars;
use crate::targets::ValidationError;

pub const DEFAULT_LOOKBACK_DAYS: u64 = 7;
pub const COST_METRIC: &str = "UnblendedCost";
pub const SERVICE_DIMENSION: &str = "SERVICE";

/// Half-open `[start, end)` range, as Cost Explorer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::EmptyDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Fills in missing bounds: `end` defaults to `today`, `start` to
    /// [`DEFAULT_LOOKBACK_DAYS`] before `end`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let end = end.unwrap_or(today);
        let start = start
            .or_else(|| end.checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `YYYY-MM-DD` bounds for the API.
    pub fn api_bounds(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

/// One service's spend for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub date: String,
    pub service: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub range: DateRange,
    pub total_cost: f64,
    /// Highest spend first; ties ordered by service name.
    pub by_service: Vec<ServiceCost>,
    pub rows: Vec<CostRow>,
}

pub fn summarize_costs(range: DateRange, rows: Vec<CostRow>) -> CostReport {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in &rows {
        *totals.entry(row.service.as_str()).or_insert(0.0) += row.cost;
    }

    let mut by_service: Vec<ServiceCost> = totals
        .into_iter()
        .map(|(service, cost)| ServiceCost {
            service: service.to_string(),
            cost,
        })
        .collect();
    by_service.sort_by(|a, b| b.cost.total_cmp(&a.cost));

    CostReport {
        range,
        total_cost: rows.iter().map(|row| row.cost).sum(),
        by_service,
        rows,
    }
}

pub fn render_cost_report(report: &CostReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total cost ({} -> {}): {}",
        report.range.start,
        report.range.end,
        format_dollars(report.total_cost)
    );

    if report.by_service.is_empty() {
        let _ = writeln!(out, "No cost data available. Make sure Cost Explorer is enabled.");
        return out;
    }

    let _ = writeln!(out, "\nCost by service");
    for entry in &report.by_service {
        let _ = writeln!(out, "  {:<48} {:>14}", entry.service, format_dollars(entry.cost));
    }
    out
}
