//! Stale resource detection: unattached EBS volumes, unassociated Elastic IPs
//! and old snapshots, each priced at a flat monthly rate.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::report::format_dollars;

pub const EBS_COST_PER_GB_MONTH: f64 = 0.10;
pub const EIP_COST_PER_MONTH: f64 = 3.6;
pub const SNAPSHOT_COST_PER_GB_MONTH: f64 = 0.05;
pub const SNAPSHOT_MAX_AGE_DAYS: i64 = 60;

/// A volume in the `available` state, as listed by the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub volume_id: String,
    pub size_gib: u64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub public_ip: String,
    pub allocation_id: Option<String>,
    pub domain: Option<String>,
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub snapshot_id: String,
    pub volume_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub state: Option<String>,
    pub size_gib: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleVolume {
    #[serde(flatten)]
    pub volume: VolumeRecord,
    pub estimated_monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleAddress {
    #[serde(flatten)]
    pub address: AddressRecord,
    pub estimated_monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleSnapshot {
    #[serde(flatten)]
    pub snapshot: SnapshotRecord,
    pub estimated_monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleResourceReport {
    pub region: String,
    pub unattached_volumes: Vec<StaleVolume>,
    pub unassociated_addresses: Vec<StaleAddress>,
    pub old_snapshots: Vec<StaleSnapshot>,
    pub total_monthly_savings: f64,
}

fn to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Prices the inventory. Addresses with an `instance_id` are in use and
/// dropped; snapshots count only when they started before `now` minus
/// [`SNAPSHOT_MAX_AGE_DAYS`]. Snapshots without a start time are kept out.
pub fn find_stale_resources(
    region: &str,
    volumes: Vec<VolumeRecord>,
    addresses: Vec<AddressRecord>,
    snapshots: Vec<SnapshotRecord>,
    now: DateTime<Utc>,
) -> StaleResourceReport {
    let cutoff = now - Duration::days(SNAPSHOT_MAX_AGE_DAYS);

    let unattached_volumes: Vec<StaleVolume> = volumes
        .into_iter()
        .map(|volume| StaleVolume {
            estimated_monthly_cost: to_cents(volume.size_gib as f64 * EBS_COST_PER_GB_MONTH),
            volume,
        })
        .collect();

    let unassociated_addresses: Vec<StaleAddress> = addresses
        .into_iter()
        .filter(|address| address.instance_id.is_none())
        .map(|address| StaleAddress {
            address,
            estimated_monthly_cost: EIP_COST_PER_MONTH,
        })
        .collect();

    let old_snapshots: Vec<StaleSnapshot> = snapshots
        .into_iter()
        .filter(|snapshot| snapshot.started_at.is_some_and(|at| at < cutoff))
        .map(|snapshot| StaleSnapshot {
            estimated_monthly_cost: to_cents(
                snapshot.size_gib as f64 * SNAPSHOT_COST_PER_GB_MONTH,
            ),
            snapshot,
        })
        .collect();

    let total_monthly_savings = to_cents(
        unattached_volumes
            .iter()
            .map(|v| v.estimated_monthly_cost)
            .chain(unassociated_addresses.iter().map(|a| a.estimated_monthly_cost))
            .chain(old_snapshots.iter().map(|s| s.estimated_monthly_cost))
            .sum(),
    );

    StaleResourceReport {
        region: region.to_string(),
        unattached_volumes,
        unassociated_addresses,
        old_snapshots,
        total_monthly_savings,
    }
}

fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_stale_report(report: &StaleResourceReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Stale resources in {}", report.region);
    let _ = writeln!(
        out,
        "  total potential monthly savings: {}",
        format_dollars(report.total_monthly_savings)
    );

    let _ = writeln!(out, "\nUnattached EBS volumes");
    if report.unattached_volumes.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for stale in &report.unattached_volumes {
        let _ = writeln!(
            out,
            "  {:<24} {:>6} GiB  created {:<10} {:>10}",
            stale.volume.volume_id,
            stale.volume.size_gib,
            format_date(stale.volume.created_at),
            format_dollars(stale.estimated_monthly_cost)
        );
    }

    let _ = writeln!(out, "\nUnassociated Elastic IPs");
    if report.unassociated_addresses.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for stale in &report.unassociated_addresses {
        let _ = writeln!(
            out,
            "  {:<16} {:<28} {:<6} {:>10}",
            stale.address.public_ip,
            stale.address.allocation_id.as_deref().unwrap_or("-"),
            stale.address.domain.as_deref().unwrap_or("N/A"),
            format_dollars(stale.estimated_monthly_cost)
        );
    }

    let _ = writeln!(out, "\nSnapshots older than {SNAPSHOT_MAX_AGE_DAYS} days");
    if report.old_snapshots.is_empty() {
        let _ = writeln!(out, "  none");
    }
    for stale in &report.old_snapshots {
        let _ = writeln!(
            out,
            "  {:<24} {:<24} {:<10} {:<10} {:>6} GiB {:>10}",
            stale.snapshot.snapshot_id,
            stale.snapshot.volume_id.as_deref().unwrap_or("-"),
            format_date(stale.snapshot.started_at),
            stale.snapshot.state.as_deref().unwrap_or("-"),
            stale.snapshot.size_gib,
            format_dollars(stale.estimated_monthly_cost)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().expect("valid time")
    }

    fn address(ip: &str, instance_id: Option<&str>) -> AddressRecord {
        AddressRecord {
            public_ip: ip.to_string(),
            allocation_id: Some(format!("eipalloc-{ip}")),
            domain: Some("vpc".to_string()),
            instance_id: instance_id.map(str::to_string),
        }
    }

    fn snapshot(id: &str, age_days: i64, size_gib: u64) -> SnapshotRecord {
        SnapshotRecord {
            snapshot_id: id.to_string(),
            volume_id: Some("vol-0a".to_string()),
            started_at: Some(now() - Duration::days(age_days)),
            state: Some("completed".to_string()),
            size_gib,
        }
    }

    #[test]
    fn prices_each_category_and_totals_savings() {
        let report = find_stale_resources(
            "us-east-1",
            vec![VolumeRecord {
                volume_id: "vol-0a".to_string(),
                size_gib: 100,
                created_at: None,
            }],
            vec![address("203.0.113.7", None), address("203.0.113.8", Some("i-0a"))],
            vec![snapshot("snap-old", 61, 50), snapshot("snap-new", 59, 500)],
            now(),
        );

        assert_eq!(report.unattached_volumes[0].estimated_monthly_cost, 10.0);
        assert_eq!(report.unassociated_addresses.len(), 1);
        assert_eq!(report.unassociated_addresses[0].address.public_ip, "203.0.113.7");
        assert_eq!(report.old_snapshots.len(), 1);
        assert_eq!(report.old_snapshots[0].snapshot.snapshot_id, "snap-old");
        assert_eq!(report.old_snapshots[0].estimated_monthly_cost, 2.5);
        assert_eq!(report.total_monthly_savings, 16.1);
    }

    #[test]
    fn snapshot_exactly_at_cutoff_or_undated_is_not_stale() {
        let mut undated = snapshot("snap-undated", 400, 10);
        undated.started_at = None;
        let report = find_stale_resources(
            "us-east-1",
            Vec::new(),
            Vec::new(),
            vec![snapshot("snap-edge", SNAPSHOT_MAX_AGE_DAYS, 10), undated],
            now(),
        );
        assert!(report.old_snapshots.is_empty());
        assert_eq!(report.total_monthly_savings, 0.0);
    }

    #[test]
    fn render_lists_sections_and_total() {
        let report = find_stale_resources(
            "eu-west-1",
            Vec::new(),
            vec![address("198.51.100.1", None)],
            Vec::new(),
            now(),
        );
        let text = render_stale_report(&report);
        assert!(text.contains("Stale resources in eu-west-1"));
        assert!(text.contains("total potential monthly savings: $3.60"));
        assert!(text.contains("198.51.100.1"));
        assert!(text.contains("Snapshots older than 60 days\n  none"));
    }
}
