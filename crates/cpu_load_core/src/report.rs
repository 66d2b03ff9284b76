//! Contract for the idle-instance analysis the cost-optimisation Lambda
//! writes to S3, plus a plain-text rendering of it.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_REPORT_BUCKET: &str = "cost-optimization-data-s3";
pub const DEFAULT_REPORT_KEY: &str = "lambda-outputs/idle-instance-analysis.json";
pub const DEFAULT_ANALYSIS_FUNCTION: &str = "Detect_idle_ec2-instances";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    UnexpectedShape(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdleAnalysisReport {
    #[serde(default)]
    pub metadata: AnalysisMetadata,
    #[serde(default)]
    pub summary: AnalysisSummary,
    #[serde(default)]
    pub detailed_analysis: Vec<InstanceAnalysis>,
    #[serde(default)]
    pub idle_instances: Vec<InstanceAnalysis>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub evaluation_period_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub network_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_instances_analyzed: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub idle_instances: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub active_instances: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub potential_monthly_savings: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstanceAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub instance_id: String,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_cpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_cpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_network: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub estimated_savings: Option<f64>,
}

/// Numbers pass through, numeric strings are parsed, anything else is absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Counts: non-negative integral numbers or numeric strings, otherwise 0.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(number) => number.as_u64().or_else(|| number.as_f64().and_then(integral)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    Ok(parsed.unwrap_or(0))
}

fn integral(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

/// Strings pass through, numbers are stringified, anything else is empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

/// Accepts the report itself or a Lambda proxy envelope carrying it in `body`.
pub fn parse_report(bytes: &[u8]) -> Result<IdleAnalysisReport, ReportError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let payload = unwrap_envelope(value)?;
    Ok(serde_json::from_value(payload)?)
}

fn unwrap_envelope(value: Value) -> Result<Value, ReportError> {
    let Some(object) = value.as_object() else {
        return Err(ReportError::UnexpectedShape(
            "report payload must be a JSON object".to_string(),
        ));
    };

    if let Some(status) = object.get("statusCode").and_then(Value::as_u64) {
        if !(200..300).contains(&status) {
            return Err(ReportError::UnexpectedShape(format!(
                "analysis responded with status {status}"
            )));
        }
    }

    let Some(body) = object.get("body") else {
        return Ok(value);
    };

    match body {
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => Ok(serde_json::from_str(text)?),
        _ => Err(ReportError::UnexpectedShape(
            "report body must be a JSON object".to_string(),
        )),
    }
}

pub fn status_counts(report: &IdleAnalysisReport) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in &report.detailed_analysis {
        let status = row.status.clone().unwrap_or_else(|| "unknown".to_string());
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

/// Parses the Lambda's timestamp, which may be RFC 3339 or a naive UTC
/// ISO-8601 string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn render_report(report: &IdleAnalysisReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let summary = &report.summary;
    let metadata = &report.metadata;

    let _ = writeln!(out, "Analysis summary");
    let _ = writeln!(out, "  total instances:   {}", summary.total_instances_analyzed);
    let _ = writeln!(out, "  idle instances:    {}", summary.idle_instances);
    let _ = writeln!(out, "  active instances:  {}", summary.active_instances);
    let _ = writeln!(
        out,
        "  potential savings: {}",
        format_dollars(summary.potential_monthly_savings.unwrap_or(0.0))
    );

    let updated = match metadata.timestamp.as_deref() {
        Some(raw) => match parse_timestamp(raw) {
            Some(at) => format!("{raw} ({} ago)", format_age(now - at)),
            None => raw.to_string(),
        },
        None => "N/A".to_string(),
    };
    let _ = writeln!(out, "  last updated:      {updated}");
    let _ = writeln!(
        out,
        "  evaluation period: {} minutes",
        format_plain(metadata.evaluation_period_minutes)
    );
    let _ = writeln!(
        out,
        "  cpu threshold:     {}%",
        format_plain(metadata.cpu_threshold)
    );
    let _ = writeln!(
        out,
        "  network threshold: {} bytes",
        format_plain(metadata.network_threshold)
    );

    if report.detailed_analysis.is_empty() {
        let _ = writeln!(out, "\nNo instance analysis rows.");
    } else {
        let _ = writeln!(out, "\nInstance analysis");
        let _ = writeln!(
            out,
            "  {:<20} {:<12} {:<8} {:>8} {:>8} {:>18} {:>12}  recommendation",
            "instance_id", "type", "status", "avg_cpu", "max_cpu", "network", "savings"
        );
        for row in &report.detailed_analysis {
            let _ = writeln!(
                out,
                "  {:<20} {:<12} {:<8} {:>8} {:>8} {:>18} {:>12}  {}",
                row.instance_id,
                row.instance_type.as_deref().unwrap_or("-"),
                row.status.as_deref().unwrap_or("unknown"),
                format_percent(row.avg_cpu),
                format_percent(row.max_cpu),
                row.total_network
                    .map(|bytes| format!("{} bytes", format_thousands(bytes.round() as i64)))
                    .unwrap_or_else(|| "-".to_string()),
                row.estimated_savings
                    .map(format_dollars)
                    .unwrap_or_else(|| "-".to_string()),
                row.recommendation.as_deref().unwrap_or(""),
            );
        }

        let counts = status_counts(report);
        let rendered: Vec<String> = counts
            .iter()
            .map(|(status, count)| format!("{status}={count}"))
            .collect();
        let _ = writeln!(out, "  status distribution: {}", rendered.join(", "));
    }

    if !report.idle_instances.is_empty() {
        let _ = writeln!(out, "\nIdle instances (action required)");
        for row in &report.idle_instances {
            let _ = writeln!(
                out,
                "  {} {} avg_cpu={} savings={}",
                row.instance_id,
                row.instance_type.as_deref().unwrap_or("-"),
                format_percent(row.avg_cpu),
                row.estimated_savings
                    .map(format_dollars)
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    out
}

fn format_plain(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "0".to_string())
}

fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}%"))
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_dollars(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}${}.{:02}", format_thousands(cents / 100), cents % 100)
}

fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes}m")
    } else if minutes < 48 * 60 {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{}d", minutes / (24 * 60))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn sample_report() -> Value {
        json!({
            "metadata": {
                "timestamp": "2026-10-16T10:00:00.123456",
                "evaluation_period_minutes": 60,
                "cpu_threshold": 5,
                "network_threshold": "1000000"
            },
            "summary": {
                "total_instances_analyzed": 3,
                "idle_instances": 1,
                "active_instances": 2,
                "potential_monthly_savings": 1234.5
            },
            "detailed_analysis": [
                {"instance_id": "i-0a", "instance_type": "t3.micro", "status": "idle",
                 "avg_cpu": 0.42, "max_cpu": "1.5", "total_network": 2048,
                 "recommendation": "stop", "estimated_savings": 1234.5},
                {"instance_id": "i-0b", "instance_type": "m5.large", "status": "active",
                 "avg_cpu": 81.0, "max_cpu": 99.9, "total_network": 1234567,
                 "recommendation": "keep", "estimated_savings": 0},
                {"instance_id": "i-0c", "status": "error", "avg_cpu": "n/a"}
            ],
            "idle_instances": [
                {"instance_id": "i-0a", "instance_type": "t3.micro", "avg_cpu": 0.42,
                 "estimated_savings": 1234.5}
            ]
        })
    }

    #[test]
    fn parses_report_with_lenient_numbers() {
        let bytes = serde_json::to_vec(&sample_report()).expect("json should encode");
        let report = parse_report(&bytes).expect("report should parse");

        assert_eq!(report.summary.total_instances_analyzed, 3);
        assert_eq!(report.metadata.network_threshold, Some(1_000_000.0));
        assert_eq!(report.detailed_analysis[0].max_cpu, Some(1.5));
        assert_eq!(report.detailed_analysis[2].avg_cpu, None);
        assert_eq!(report.detailed_analysis[2].instance_type, None);
        assert_eq!(report.idle_instances.len(), 1);
    }

    #[test]
    fn unwraps_lambda_envelope_with_string_body() {
        let envelope = json!({
            "statusCode": 200,
            "body": sample_report().to_string(),
        });
        let bytes = serde_json::to_vec(&envelope).expect("json should encode");
        let report = parse_report(&bytes).expect("envelope should parse");
        assert_eq!(report.summary.idle_instances, 1);
    }

    #[test]
    fn rejects_failed_envelope_and_non_objects() {
        let failed = json!({"statusCode": 500, "body": "{}"}).to_string();
        let error = parse_report(failed.as_bytes()).expect_err("500 should fail");
        assert!(error.to_string().contains("status 500"));

        let error = parse_report(b"[1, 2]").expect_err("array should fail");
        assert!(error.to_string().contains("must be a JSON object"));

        let error = parse_report(b"not json").expect_err("garbage should fail");
        assert!(matches!(error, ReportError::Json(_)));
    }

    #[test]
    fn counts_accept_strings_floats_and_nulls() {
        let report = parse_report(
            br#"{"summary": {
                "total_instances_analyzed": "3",
                "idle_instances": 1.0,
                "active_instances": null,
                "potential_monthly_savings": null
            }}"#,
        )
        .expect("lenient counts should parse");

        assert_eq!(report.summary.total_instances_analyzed, 3);
        assert_eq!(report.summary.idle_instances, 1);
        assert_eq!(report.summary.active_instances, 0);
        assert_eq!(report.summary.potential_monthly_savings, None);
    }

    #[test]
    fn unusable_counts_fall_back_to_zero() {
        let report = parse_report(
            br#"{"summary": {"total_instances_analyzed": "many", "idle_instances": -2, "active_instances": 1.5}}"#,
        )
        .expect("unusable counts should still parse");

        assert_eq!(report.summary, AnalysisSummary::default());
    }

    #[test]
    fn null_instance_id_is_tolerated() {
        let report = parse_report(
            br#"{"detailed_analysis": [{"instance_id": null, "status": "error"}, {"instance_id": 42}]}"#,
        )
        .expect("rows should parse");

        assert_eq!(report.detailed_analysis[0].instance_id, "");
        assert_eq!(report.detailed_analysis[1].instance_id, "42");
    }

    #[test]
    fn empty_object_yields_default_report() {
        let report = parse_report(b"{}").expect("empty object should parse");
        assert_eq!(report, IdleAnalysisReport::default());
    }

    #[test]
    fn counts_statuses_in_order() {
        let report: IdleAnalysisReport =
            serde_json::from_value(sample_report()).expect("report should parse");
        let counts = status_counts(&report);
        assert_eq!(
            counts.into_iter().collect::<Vec<_>>(),
            vec![
                ("active".to_string(), 1),
                ("error".to_string(), 1),
                ("idle".to_string(), 1)
            ]
        );
    }

    #[test]
    fn parses_naive_and_rfc3339_timestamps() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2026-10-16T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-10-16T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn renders_summary_table_and_idle_list() {
        let report: IdleAnalysisReport =
            serde_json::from_value(sample_report()).expect("report should parse");
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 30, 0).unwrap();
        let text = render_report(&report, now);

        assert!(text.contains("potential savings: $1,234.50"));
        assert!(text.contains("(2h29m ago)"));
        assert!(text.contains("1,234,567 bytes"));
        assert!(text.contains("0.42%"));
        assert!(text.contains("status distribution: active=1, error=1, idle=1"));
        assert!(text.contains("Idle instances (action required)"));
    }

    #[test]
    fn formats_thousands_and_dollars() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(-1_234_567), "-1,234,567");
        assert_eq!(format_dollars(0.5), "$0.50");
        assert_eq!(format_dollars(-12.5), "-$12.50");
    }
}
