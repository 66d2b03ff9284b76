//! Shared CPU-load dispatch primitives.
//!
//! This crate owns request construction, payload rendering, the local burn
//! loop, and the report contracts (idle analysis, cost by service, stale
//! resources). It intentionally excludes AWS SDK and async runtime concerns;
//! those live in `cpu_load_ssm`.

pub mod burn;
pub mod contract;
pub mod cost;
pub mod payload;
pub mod report;
pub mod stale;
pub mod targets;
