use cpu_load_core::report::ReportError;
use cpu_load_core::targets::ValidationError;
use thiserror::Error;

/// Failures surfaced by the handlers. Service messages are carried verbatim;
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("remote command submission failed: {0}")]
    Dispatch(String),
    #[error("failed to read s3://{bucket}/{key}: {message}")]
    ReportFetch {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("idle analysis invocation of '{function_name}' failed: {message}")]
    Analysis {
        function_name: String,
        message: String,
    },
    #[error("cost explorer query for {start}..{end} failed: {message}")]
    CostQuery {
        start: String,
        end: String,
        message: String,
    },
    #[error("listing {resource} failed: {message}")]
    Inventory {
        resource: &'static str,
        message: String,
    },
    #[error("malformed idle report: {0}")]
    Report(#[from] ReportError),
}
