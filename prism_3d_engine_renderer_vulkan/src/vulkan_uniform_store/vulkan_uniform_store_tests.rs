use super::*;

/// Minimal UniformData implementation for store tests
struct FakeBlock {
    bytes: Vec<u8>,
    dirty: bool,
}

impl FakeBlock {
    fn handle(size: usize) -> UniformDataHandle {
        Arc::new(Mutex::new(FakeBlock {
            bytes: vec![0u8; size],
            dirty: true,
        }))
    }
}

impl UniformData for FakeBlock {
    fn data(&self) -> &[u8] {
        &self.bytes
    }
    fn data_size(&self) -> u64 {
        self.bytes.len() as u64
    }
    fn is_dirty(&self) -> bool {
        self.dirty
    }
    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

// ============================================================================
// LAYOUT COMPUTATION
// ============================================================================

#[test]
fn test_layout_offsets_accumulate_padded_sizes() {
    // Three blocks at bindings 0, 1, 2 with raw sizes 100, 30, 256
    let blocks = [(0, 100, 1, false), (1, 30, 1, false), (2, 256, 1, false)];
    let layout = compute_layout(&blocks, 256);

    assert_eq!(layout[0].offset, 0);
    assert_eq!(layout[1].offset, 256);
    assert_eq!(layout[2].offset, 512);
    // Descriptor ranges stay at the raw sizes
    assert_eq!(layout[0].range, 100);
    assert_eq!(layout[1].range, 30);
    assert_eq!(layout[2].range, 256);
}

#[test]
fn test_layout_offset_is_sum_of_lower_bindings() {
    // The invariant holds for arbitrary binding sets: the offset of any
    // block equals the sum of padded sizes of all blocks with strictly
    // lower binding points
    let blocks = [(2, 17, 1, false), (5, 64, 1, false), (9, 100, 1, false)];
    for alignment in [0u64, 16, 64, 256] {
        let layout = compute_layout(&blocks, alignment);
        for (i, entry) in layout.iter().enumerate() {
            let expected: u64 = layout[..i]
                .iter()
                .map(|lower| lower.stride * lower.instances as u64)
                .sum();
            assert_eq!(entry.offset, expected, "alignment {}", alignment);
        }
    }
}

#[test]
fn test_layout_zero_alignment_uses_raw_sizes() {
    let blocks = [(0, 100, 1, false), (1, 30, 1, false)];
    let layout = compute_layout(&blocks, 0);
    assert_eq!(layout[0].stride, 100);
    assert_eq!(layout[1].offset, 100);
}

#[test]
fn test_layout_dynamic_block_spans_all_instances() {
    // A 2-instance dynamic block of 192 raw bytes per instance at
    // alignment 256 occupies 2 * 256 bytes
    let blocks = [(0, 384, 2, true), (1, 16, 1, false)];
    let layout = compute_layout(&blocks, 256);

    assert_eq!(layout[0].range, 192);
    assert_eq!(layout[0].stride, 256);
    assert_eq!(layout[1].offset, 512);
}

// ============================================================================
// INSTANCE SCATTERING
// ============================================================================

#[test]
fn test_scatter_restrides_instances_to_alignment() {
    // Two 4-byte instances at a 16-byte stride
    let entry = BlockLayout {
        binding: 0,
        offset: 0,
        range: 4,
        stride: 16,
        instances: 2,
        dynamic: true,
    };
    let mut dst = vec![0u8; 32];
    scatter_instances(&mut dst, &entry, &[1, 2, 3, 4, 5, 6, 7, 8]);

    assert_eq!(&dst[0..4], &[1, 2, 3, 4]);
    assert_eq!(&dst[4..16], &[0; 12]);
    assert_eq!(&dst[16..20], &[5, 6, 7, 8]);
}

#[test]
fn test_scatter_leaves_other_regions_untouched() {
    // Writing the block at offset 16 must not alter the first block's
    // already-correct bytes
    let first = BlockLayout {
        binding: 0,
        offset: 0,
        range: 16,
        stride: 16,
        instances: 1,
        dynamic: false,
    };
    let second = BlockLayout {
        binding: 1,
        offset: 16,
        range: 8,
        stride: 16,
        instances: 1,
        dynamic: false,
    };
    let mut dst = vec![0u8; 32];
    scatter_instances(&mut dst, &first, &[0xAA; 16]);
    let snapshot = dst[0..16].to_vec();

    // Rewrite only the second block, as a dirty-block-only upload does
    scatter_instances(&mut dst, &second, &[0xBB; 8]);
    assert_eq!(&dst[0..16], snapshot.as_slice());
    assert_eq!(&dst[16..24], &[0xBB; 8]);
}

// ============================================================================
// BIND / UNBIND SEMANTICS
// ============================================================================

#[test]
fn test_bind_replaces_existing_binding() {
    let mut store = UniformStore::new();
    store.bind(0, Some(FakeBlock::handle(16)), ShaderStageFlags::default());
    store.bind(0, Some(FakeBlock::handle(32)), ShaderStageFlags::default());
    assert_eq!(store.block_count(), 1);
}

#[test]
fn test_bind_none_is_removal_not_error() {
    let mut store = UniformStore::new();
    store.bind(0, Some(FakeBlock::handle(16)), ShaderStageFlags::default());
    assert_eq!(store.block_count(), 1);

    store.bind(0, None, ShaderStageFlags::default());
    assert_eq!(store.block_count(), 0);
}

#[test]
fn test_unbind_absent_binding_is_noop() {
    let mut store = UniformStore::new();
    store.unbind(7);
    assert_eq!(store.block_count(), 0);
}

#[test]
fn test_store_reports_dirty_bound_data() {
    let mut store = UniformStore::new();
    let handle = FakeBlock::handle(16);
    store.bind(0, Some(handle.clone()), ShaderStageFlags::default());
    assert!(store.is_dirty());

    handle.lock().unwrap().mark_clean();
    assert!(!store.is_dirty());
}

#[test]
fn test_sync_state_reflects_dirty_data() {
    let store = UniformStore::new();
    assert_eq!(store.sync_state(), DeviceSyncState::Empty);
}

// ============================================================================
// DYNAMIC INSTANCES
// ============================================================================

#[test]
fn test_dynamic_instance_count_tracks_bound_blocks() {
    let mut store = UniformStore::new();
    assert_eq!(store.dynamic_instance_count(), 0);

    store.bind(1, Some(FakeBlock::handle(16)), ShaderStageFlags::default());
    assert_eq!(store.dynamic_instance_count(), 0);

    store.bind_dynamic(0, FakeBlock::handle(384), ShaderStageFlags::VERTEX, 2);
    assert_eq!(store.dynamic_instance_count(), 2);
}

#[test]
fn test_descriptor_pool_sizes_split_by_type() {
    let mut store = UniformStore::new();
    store.bind_dynamic(0, FakeBlock::handle(384), ShaderStageFlags::VERTEX, 2);
    store.bind(1, Some(FakeBlock::handle(16)), ShaderStageFlags::default());

    let sizes = store.descriptor_pool_sizes();
    assert_eq!(sizes.len(), 2);
    assert!(sizes.iter().any(|size| {
        size.ty == vk::DescriptorType::UNIFORM_BUFFER && size.descriptor_count == 1
    }));
    assert!(sizes.iter().any(|size| {
        size.ty == vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC && size.descriptor_count == 1
    }));
}

// ============================================================================
// DEVICE CONTRACT (no context bound)
// ============================================================================

#[test]
fn test_update_device_without_context_is_configuration_error() {
    let mut store = UniformStore::new();
    store.bind(0, Some(FakeBlock::handle(16)), ShaderStageFlags::default());
    assert!(matches!(
        store.update_device(None),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_descriptor_layout_before_upload_is_configuration_error() {
    let store = UniformStore::new();
    assert!(matches!(
        store.descriptor_set_layout(),
        Err(Error::Configuration(_))
    ));
}
