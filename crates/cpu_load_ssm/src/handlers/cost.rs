use cpu_load_core::cost::{summarize_costs, CostReport, DateRange};
use tracing::{error, info};

use crate::adapters::cost::CostSource;
use crate::error::InvokeError;

pub fn fetch_cost_report(
    source: &dyn CostSource,
    range: DateRange,
) -> Result<CostReport, InvokeError> {
    let (start, end) = range.api_bounds();
    info!(component = "cost_report", event = "query_started", %start, %end);

    let rows = source.daily_cost_by_service(&range).map_err(|message| {
        error!(component = "cost_report", event = "query_failed", %start, %end, %message);
        InvokeError::CostQuery {
            start: start.clone(),
            end: end.clone(),
            message,
        }
    })?;

    let report = summarize_costs(range, rows);
    info!(
        component = "cost_report",
        event = "query_completed",
        rows = report.rows.len(),
        services = report.by_service.len(),
        total_cost = report.total_cost,
    );
    Ok(report)
}
