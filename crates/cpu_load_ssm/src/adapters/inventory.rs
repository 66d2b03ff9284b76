use cpu_load_core::stale::{AddressRecord, SnapshotRecord, VolumeRecord};

/// Read-only listing of the account's EC2 storage and address resources in
/// one region.
pub trait ResourceInventory {
    fn region(&self) -> String;
    /// Volumes in the `available` state only.
    fn unattached_volumes(&self) -> Result<Vec<VolumeRecord>, String>;
    fn addresses(&self) -> Result<Vec<AddressRecord>, String>;
    /// Snapshots owned by the calling account.
    fn owned_snapshots(&self) -> Result<Vec<SnapshotRecord>, String>;
}
