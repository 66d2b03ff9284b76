pub mod cost;
pub mod report;
pub mod send;
pub mod stale;
