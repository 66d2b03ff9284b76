//! AWS-oriented adapters and handlers for CPU-load dispatch.
//!
//! This crate owns runtime integration details (SSM submission, S3 report
//! reads, Lambda invocation) behind synchronous adapter traits so the handlers
//! can be exercised without AWS. Request construction and payload rendering
//! live in `cpu_load_core`.

pub mod adapters;
pub mod error;
pub mod handlers;
