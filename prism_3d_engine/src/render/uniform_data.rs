/// Uniform data interfaces
///
/// A `UniformData` implementor owns a block of host-side uniform bytes and
/// its dirty flag. The backend's `UniformStore` references bound blocks,
/// packs them into one dynamically-aligned device buffer, and copies only
/// the dirty ones each frame.

use bitflags::bitflags;
use bytemuck::Pod;

#[cfg(test)]
mod uniform_data_tests;

bitflags! {
    /// Shader stages a uniform block is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
    }
}

impl Default for ShaderStageFlags {
    fn default() -> Self {
        ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
    }
}

/// Round `raw` up to the next multiple of `alignment`.
///
/// An alignment of 0 (a device reporting no minimum) leaves the size
/// unpadded.
pub fn padded_size(raw: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        raw
    } else {
        raw.div_ceil(alignment) * alignment
    }
}

/// Capability interface for host-side uniform data
///
/// Implementors expose their raw bytes and track whether those bytes
/// changed since the store last copied them to the device. The store calls
/// `mark_clean` after each copy.
pub trait UniformData: Send + Sync {
    /// Raw bytes of the block (all instances, tightly packed)
    fn data(&self) -> &[u8];

    /// Total size of `data()` in bytes
    fn data_size(&self) -> u64;

    /// True if the bytes changed since the last `mark_clean`
    fn is_dirty(&self) -> bool;

    /// Called by the store after copying the bytes to the device
    fn mark_clean(&mut self);
}

/// Uniform block backed by a single plain-old-data struct
///
/// Newly created blocks are dirty so the first upload always copies them.
pub struct UniformStructData<T: Pod + Send + Sync> {
    value: T,
    dirty: bool,
}

impl<T: Pod + Send + Sync> UniformStructData<T> {
    pub fn new(value: T) -> Self {
        Self { value, dirty: true }
    }

    /// Replace the block contents and mark the block dirty
    pub fn push(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: Pod + Send + Sync> UniformData for UniformStructData<T> {
    fn data(&self) -> &[u8] {
        bytemuck::bytes_of(&self.value)
    }

    fn data_size(&self) -> u64 {
        std::mem::size_of::<T>() as u64
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Uniform block holding one struct per rendered instance
///
/// Used for per-object data selected with dynamic offsets: the store
/// re-strides the tightly packed elements to the device's uniform
/// alignment during upload, and the element count drives the buffer
/// region size. The count is fixed at creation; per-frame updates replace
/// values, not the shape of the block.
pub struct UniformArrayData<T: Pod + Send + Sync> {
    values: Vec<T>,
    dirty: bool,
}

impl<T: Pod + Send + Sync> UniformArrayData<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values, dirty: true }
    }

    /// Number of instances in the block
    pub fn instance_count(&self) -> u32 {
        self.values.len() as u32
    }

    /// Replace one instance's value and mark the block dirty
    pub fn push_instance(&mut self, index: usize, value: T) {
        self.values[index] = value;
        self.dirty = true;
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Pod + Send + Sync> UniformData for UniformArrayData<T> {
    fn data(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }

    fn data_size(&self) -> u64 {
        (std::mem::size_of::<T>() * self.values.len()) as u64
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
