use super::*;

#[test]
fn test_needs_upload() {
    assert!(DeviceSyncState::Empty.needs_upload());
    assert!(DeviceSyncState::OutOfSync.needs_upload());
    assert!(!DeviceSyncState::InSync.needs_upload());
    assert!(!DeviceSyncState::CpuDataFlushed.needs_upload());
}

#[test]
fn test_cpu_flush_only_from_in_sync() {
    assert_eq!(
        DeviceSyncState::InSync.after_cpu_flush(),
        DeviceSyncState::CpuDataFlushed
    );
    assert_eq!(DeviceSyncState::Empty.after_cpu_flush(), DeviceSyncState::Empty);
    assert_eq!(
        DeviceSyncState::OutOfSync.after_cpu_flush(),
        DeviceSyncState::OutOfSync
    );
    assert_eq!(
        DeviceSyncState::CpuDataFlushed.after_cpu_flush(),
        DeviceSyncState::CpuDataFlushed
    );
}
