use cpu_load_core::report::{parse_report, IdleAnalysisReport};
use tracing::{error, info};

use crate::adapters::invoke::AnalysisInvoker;
use crate::adapters::object_store::ReportStore;
use crate::error::InvokeError;

pub fn fetch_idle_report(
    store: &dyn ReportStore,
    bucket: &str,
    key: &str,
) -> Result<IdleAnalysisReport, InvokeError> {
    let bytes = store.read_object(bucket, key).map_err(|message| {
        error!(component = "idle_report", event = "fetch_failed", bucket, key, %message);
        InvokeError::ReportFetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        }
    })?;

    let report = parse_report(&bytes)?;
    info!(
        component = "idle_report",
        event = "report_loaded",
        bucket,
        key,
        instances = report.summary.total_instances_analyzed,
        idle = report.summary.idle_instances,
    );
    Ok(report)
}

/// Runs the analysis Lambda synchronously and decodes the report it returns.
pub fn run_idle_analysis(
    invoker: &dyn AnalysisInvoker,
    function_name: &str,
) -> Result<IdleAnalysisReport, InvokeError> {
    info!(component = "idle_report", event = "analysis_invoking", function_name);

    let payload = invoker.invoke_analysis(function_name).map_err(|message| {
        error!(component = "idle_report", event = "analysis_failed", function_name, %message);
        InvokeError::Analysis {
            function_name: function_name.to_string(),
            message,
        }
    })?;

    let report = parse_report(&payload)?;
    info!(
        component = "idle_report",
        event = "analysis_completed",
        function_name,
        instances = report.summary.total_instances_analyzed,
        idle = report.summary.idle_instances,
    );
    Ok(report)
}
