use chrono::{DateTime, Utc};
use cpu_load_core::stale::{find_stale_resources, StaleResourceReport};
use tracing::{error, info};

use crate::adapters::inventory::ResourceInventory;
use crate::error::InvokeError;

fn listed<T>(
    resource: &'static str,
    listing: Result<Vec<T>, String>,
) -> Result<Vec<T>, InvokeError> {
    listing.map_err(|message| {
        error!(component = "stale_resources", event = "listing_failed", resource, %message);
        InvokeError::Inventory { resource, message }
    })
}

/// Lists volumes, addresses and snapshots, then prices whatever is stale as
/// of `now`. Any listing failure aborts the scan.
pub fn scan_stale_resources(
    inventory: &dyn ResourceInventory,
    now: DateTime<Utc>,
) -> Result<StaleResourceReport, InvokeError> {
    let region = inventory.region();
    info!(component = "stale_resources", event = "scan_started", %region);

    let volumes = listed("volumes", inventory.unattached_volumes())?;
    let addresses = listed("addresses", inventory.addresses())?;
    let snapshots = listed("snapshots", inventory.owned_snapshots())?;

    let report = find_stale_resources(&region, volumes, addresses, snapshots, now);
    info!(
        component = "stale_resources",
        event = "scan_completed",
        %region,
        volumes = report.unattached_volumes.len(),
        addresses = report.unassociated_addresses.len(),
        snapshots = report.old_snapshots.len(),
        total_monthly_savings = report.total_monthly_savings,
    );
    Ok(report)
}
