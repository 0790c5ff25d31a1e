/// CPU/GPU synchronization state for device-backed resources
///
/// Every resource that shadows host data into device memory (vertex
/// buffers, the packed uniform buffer) tracks one of these states. The
/// legal transitions:
///
/// ```text
/// Empty --(upload)--> InSync
/// InSync --(host mutation / dirty sub-resource)--> OutOfSync
/// OutOfSync --(upload)--> InSync
/// InSync --(flush_cpu_data)--> CpuDataFlushed
/// any --(free_device_resources)--> Empty
/// ```
///
/// `CpuDataFlushed` is reachable only from `InSync`: the host copy was
/// discarded but the device copy remains valid, so no CPU-driven re-upload
/// can happen until fresh data is supplied.

#[cfg(test)]
mod sync_state_tests;

/// Synchronization state between a resource's host shadow copy and its
/// device copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSyncState {
    /// No device allocation exists yet
    Empty,
    /// Host data changed since the last upload
    OutOfSync,
    /// Host and device copies agree
    InSync,
    /// Host copy discarded; device copy still valid
    CpuDataFlushed,
}

impl DeviceSyncState {
    /// True if an upload pass must copy data to the device
    pub fn needs_upload(self) -> bool {
        matches!(self, DeviceSyncState::Empty | DeviceSyncState::OutOfSync)
    }

    /// State after the host copy is discarded. Only an in-sync resource
    /// moves to `CpuDataFlushed`; other states are unchanged.
    pub fn after_cpu_flush(self) -> DeviceSyncState {
        if self == DeviceSyncState::InSync {
            DeviceSyncState::CpuDataFlushed
        } else {
            self
        }
    }
}
