use cpu_load_core::cost::{CostRow, DateRange};

pub trait CostSource {
    /// Daily unblended cost per service for every day in `range`.
    fn daily_cost_by_service(&self, range: &DateRange) -> Result<Vec<CostRow>, String>;
}
