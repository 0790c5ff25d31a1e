use super::*;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct TestBlock {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
}

// ============================================================================
// PADDED SIZE
// ============================================================================

#[test]
fn test_padded_size_rounds_up() {
    assert_eq!(padded_size(1, 256), 256);
    assert_eq!(padded_size(256, 256), 256);
    assert_eq!(padded_size(257, 256), 512);
    assert_eq!(padded_size(192, 64), 192);
    assert_eq!(padded_size(193, 64), 256);
}

#[test]
fn test_padded_size_never_shrinks() {
    for raw in [1u64, 15, 16, 17, 63, 64, 65, 200, 4096] {
        for alignment in [16u64, 64, 256] {
            let padded = padded_size(raw, alignment);
            assert!(padded >= raw, "padded {} < raw {}", padded, raw);
            assert_eq!(padded % alignment, 0);
        }
    }
}

#[test]
fn test_padded_size_zero_alignment_is_identity() {
    assert_eq!(padded_size(0, 0), 0);
    assert_eq!(padded_size(100, 0), 100);
}

// ============================================================================
// STRUCT DATA
// ============================================================================

#[test]
fn test_struct_data_starts_dirty() {
    let data = UniformStructData::new(TestBlock { a: 1.0, b: 2.0, c: 3.0, d: 4.0 });
    assert!(data.is_dirty());
    assert_eq!(data.data_size(), 16);
    assert_eq!(data.data().len(), 16);
}

#[test]
fn test_struct_data_push_marks_dirty() {
    let mut data = UniformStructData::new(TestBlock { a: 0.0, b: 0.0, c: 0.0, d: 0.0 });
    data.mark_clean();
    assert!(!data.is_dirty());

    data.push(TestBlock { a: 5.0, b: 0.0, c: 0.0, d: 0.0 });
    assert!(data.is_dirty());
    assert_eq!(data.value().a, 5.0);
}

#[test]
fn test_struct_data_bytes_match_value() {
    let data = UniformStructData::new(TestBlock { a: 1.0, b: 2.0, c: 3.0, d: 4.0 });
    let bytes = data.data();
    let decoded: &TestBlock = bytemuck::from_bytes(bytes);
    assert_eq!(*decoded, TestBlock { a: 1.0, b: 2.0, c: 3.0, d: 4.0 });
}

// ============================================================================
// ARRAY DATA
// ============================================================================

#[test]
fn test_array_data_sizes_scale_with_instances() {
    let data = UniformArrayData::new(vec![TestBlock::zeroed(); 3]);
    assert_eq!(data.instance_count(), 3);
    assert_eq!(data.data_size(), 48);
    assert_eq!(data.data().len(), 48);
}

#[test]
fn test_array_data_push_instance() {
    let mut data = UniformArrayData::new(vec![TestBlock::zeroed(); 2]);
    data.mark_clean();

    data.push_instance(1, TestBlock { a: 9.0, b: 0.0, c: 0.0, d: 0.0 });
    assert!(data.is_dirty());
    assert_eq!(data.values()[1].a, 9.0);
    assert_eq!(data.values()[0].a, 0.0);
}
