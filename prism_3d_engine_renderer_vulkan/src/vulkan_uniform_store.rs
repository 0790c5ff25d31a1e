/// UniformStore - named uniform blocks packed into one device buffer
///
/// Bound blocks are keyed by binding point; binding order determines the
/// buffer layout. Each block is independently dirty-tracked and only dirty
/// blocks are re-copied during an upload. The backing buffer is recreated
/// only when the required size changes, and the descriptor-set layout is
/// rebuilt only when the binding set composition changes.
///
/// Blocks bound with an instance count become dynamic uniform blocks:
/// their elements are re-strided to the device's minimum uniform-buffer
/// offset alignment, and one dynamic offset per block selects an instance
/// at draw time. Buffer sizing follows the actual instance counts.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::{padded_size, DeviceSyncState, ShaderStageFlags, UniformData};
use prism_3d_engine::{engine_debug, engine_error, engine_err, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::GpuContext;

#[cfg(test)]
mod vulkan_uniform_store_tests;

/// Shared handle to a bound uniform data interface
pub type UniformDataHandle = Arc<Mutex<dyn UniformData>>;

/// One bound uniform block
struct BoundUniformBlock {
    data: UniformDataHandle,
    stages: ShaderStageFlags,
    /// Instance count; > 1 makes this a dynamic block
    instances: u32,
    dynamic: bool,
}

/// Computed placement of one block inside the packed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    pub binding: u32,
    /// Byte offset of the block's first instance
    pub offset: u64,
    /// Per-instance data size (descriptor range)
    pub range: u64,
    /// Per-instance size padded to the device alignment
    pub stride: u64,
    pub instances: u32,
    pub dynamic: bool,
}

/// Shape of one block fed into `compute_layout`:
/// (binding, total data size, instances, dynamic)
pub(crate) type BlockShape = (u32, u64, u32, bool);

/// Compute buffer placement for blocks sorted by ascending binding point.
///
/// The offset of each block equals the sum of the padded sizes of all
/// blocks with lower binding points, where a block's padded size is
/// `instances * padded(per-instance size)`.
pub(crate) fn compute_layout(blocks: &[BlockShape], alignment: u64) -> Vec<BlockLayout> {
    let mut layouts = Vec::with_capacity(blocks.len());
    let mut offset = 0u64;
    for &(binding, total_size, instances, dynamic) in blocks {
        let range = total_size / instances.max(1) as u64;
        let stride = padded_size(range, alignment);
        layouts.push(BlockLayout {
            binding,
            offset,
            range,
            stride,
            instances,
            dynamic,
        });
        offset += stride * instances.max(1) as u64;
    }
    layouts
}

/// Uniform block container with a single packed device buffer
pub struct UniformStore {
    blocks: BTreeMap<u32, BoundUniformBlock>,
    sync_state: DeviceSyncState,
    /// Binding set changed since the descriptor layout / offsets were built
    layout_stale: bool,
    /// Buffer was recreated; every block must be copied on the next upload
    force_full_copy: bool,

    ctx: Option<Arc<GpuContext>>,
    alignment: u64,
    layout: Vec<BlockLayout>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    current_buffer_size: u64,
    descriptor_set_layout: vk::DescriptorSetLayout,
}

impl UniformStore {
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            sync_state: DeviceSyncState::Empty,
            layout_stale: false,
            force_full_copy: false,
            ctx: None,
            alignment: 0,
            layout: Vec::new(),
            buffer: vk::Buffer::null(),
            allocation: None,
            current_buffer_size: 0,
            descriptor_set_layout: vk::DescriptorSetLayout::null(),
        }
    }

    /// Bind `data` at `binding`, replacing any existing binding there.
    ///
    /// `None` is a removal request: reported as a warning and treated as
    /// `unbind`, not an error.
    pub fn bind(&mut self, binding: u32, data: Option<UniformDataHandle>, stages: ShaderStageFlags) {
        let Some(data) = data else {
            engine_warn!(
                "prism3d::vulkan",
                "Null uniform data bound at point {}; treating as removal",
                binding
            );
            self.unbind(binding);
            return;
        };
        self.insert_block(binding, data, stages, 1, false);
    }

    /// Bind a dynamic block holding `instances` packed elements; one
    /// dynamic offset selects the element at draw time
    pub fn bind_dynamic(
        &mut self,
        binding: u32,
        data: UniformDataHandle,
        stages: ShaderStageFlags,
        instances: u32,
    ) {
        self.insert_block(binding, data, stages, instances.max(1), true);
    }

    fn insert_block(
        &mut self,
        binding: u32,
        data: UniformDataHandle,
        stages: ShaderStageFlags,
        instances: u32,
        dynamic: bool,
    ) {
        self.blocks.insert(
            binding,
            BoundUniformBlock {
                data,
                stages,
                instances,
                dynamic,
            },
        );
        if self.sync_state != DeviceSyncState::Empty {
            self.sync_state = DeviceSyncState::OutOfSync;
        }
        self.layout_stale = true;
    }

    /// Remove the binding; no-op if absent
    pub fn unbind(&mut self, binding: u32) {
        if self.blocks.remove(&binding).is_some() {
            if self.sync_state != DeviceSyncState::Empty {
                self.sync_state = DeviceSyncState::OutOfSync;
            }
            self.layout_stale = true;
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// True if any bound block has unwritten changes
    pub fn is_dirty(&self) -> bool {
        self.blocks.values().any(|block| {
            block
                .data
                .lock()
                .map(|data| data.is_dirty())
                .unwrap_or(false)
        })
    }

    /// Effective sync state: an in-sync store with dirty bound data
    /// reports out-of-sync
    pub fn sync_state(&self) -> DeviceSyncState {
        if self.sync_state == DeviceSyncState::InSync && self.is_dirty() {
            DeviceSyncState::OutOfSync
        } else {
            self.sync_state
        }
    }

    /// Largest instance count among dynamic blocks (0 when none are bound)
    pub fn dynamic_instance_count(&self) -> u32 {
        self.blocks
            .values()
            .filter(|block| block.dynamic)
            .map(|block| block.instances)
            .max()
            .unwrap_or(0)
    }

    /// Byte offset of the block bound at `binding`, if the layout has been
    /// computed
    pub fn block_offset(&self, binding: u32) -> Option<u64> {
        self.layout
            .iter()
            .find(|entry| entry.binding == binding)
            .map(|entry| entry.offset)
    }

    /// Dynamic offsets for instance `index`, one per dynamic block in
    /// binding order
    pub fn dynamic_offsets(&self, index: u32) -> Vec<u32> {
        self.layout
            .iter()
            .filter(|entry| entry.dynamic)
            .map(|entry| {
                let clamped = index.min(entry.instances.saturating_sub(1));
                (clamped as u64 * entry.stride) as u32
            })
            .collect()
    }

    /// The descriptor-set layout for the current binding set
    pub fn descriptor_set_layout(&self) -> Result<vk::DescriptorSetLayout> {
        if self.descriptor_set_layout == vk::DescriptorSetLayout::null() {
            engine_error!("prism3d::vulkan", "Uniform descriptor layout requested before upload");
            return Err(Error::Configuration(
                "Uniform descriptor layout requested before first upload".to_string(),
            ));
        }
        Ok(self.descriptor_set_layout)
    }

    /// Pool sizes covering this store's descriptors
    pub fn descriptor_pool_sizes(&self) -> Vec<vk::DescriptorPoolSize> {
        let dynamic = self.blocks.values().filter(|block| block.dynamic).count() as u32;
        let plain = self.blocks.len() as u32 - dynamic;
        let mut sizes = Vec::new();
        if plain > 0 {
            sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: plain,
            });
        }
        if dynamic > 0 {
            sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: dynamic,
            });
        }
        sizes
    }

    /// Write every block's buffer region into `set`
    pub fn write_descriptor_set(&self, set: vk::DescriptorSet) -> Result<()> {
        let Some(ctx) = self.ctx.as_ref() else {
            engine_error!("prism3d::vulkan", "Descriptor write before the store was uploaded");
            return Err(Error::Configuration(
                "Descriptor write before the store was uploaded".to_string(),
            ));
        };

        let buffer_infos: Vec<vk::DescriptorBufferInfo> = self
            .layout
            .iter()
            .map(|entry| vk::DescriptorBufferInfo {
                buffer: self.buffer,
                offset: entry.offset,
                range: entry.range,
            })
            .collect();

        let writes: Vec<vk::WriteDescriptorSet> = self
            .layout
            .iter()
            .zip(buffer_infos.iter())
            .map(|(entry, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(entry.binding)
                    .dst_array_element(0)
                    .descriptor_type(if entry.dynamic {
                        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                    } else {
                        vk::DescriptorType::UNIFORM_BUFFER
                    })
                    .buffer_info(std::slice::from_ref(info))
            })
            .collect();

        unsafe {
            ctx.device.update_descriptor_sets(&writes, &[]);
        }
        Ok(())
    }

    /// Reconcile the device buffer with the bound blocks.
    ///
    /// Same context contract as every device-synced resource: a different
    /// context frees all device allocations first, and no context at all
    /// is a fatal configuration error. A no-op when in sync and clean.
    pub fn update_device(&mut self, ctx: Option<Arc<GpuContext>>) -> Result<()> {
        if let Some(new_ctx) = ctx {
            let switching = self
                .ctx
                .as_ref()
                .map(|current| !Arc::ptr_eq(current, &new_ctx))
                .unwrap_or(false);
            if switching {
                self.free_device_resources();
            }
            if self.ctx.is_none() || switching {
                self.alignment = new_ctx.min_uniform_buffer_offset_alignment;
                self.ctx = Some(new_ctx);
            }
        }

        let Some(ctx) = self.ctx.clone() else {
            engine_error!("prism3d::vulkan", "updateDevice on a uniform store with no associated device");
            return Err(Error::Configuration(
                "Uniform store has no associated device context".to_string(),
            ));
        };

        if !self.sync_state.needs_upload() && !self.is_dirty() {
            return Ok(());
        }

        // Offsets are recomputed only when the binding set changed
        if self.layout_stale || self.layout.is_empty() {
            self.layout = compute_layout(&self.block_shapes()?, self.alignment);
        }
        let required_size: u64 = self
            .layout
            .iter()
            .map(|entry| entry.stride * entry.instances as u64)
            .sum();
        if required_size == 0 {
            engine_error!(
                "prism3d::vulkan",
                "Required uniform buffer size is zero; bind uniform data before updateDevice"
            );
            return Err(Error::Configuration(
                "Uniform buffer upload attempted before any data was bound".to_string(),
            ));
        }

        // The buffer is recreated only when the required size changes, so
        // value-only updates never churn the allocation
        if self.sync_state == DeviceSyncState::Empty || required_size != self.current_buffer_size {
            self.release_buffer();
            self.allocate_buffer(&ctx, required_size)?;
            self.force_full_copy = true;
        }

        self.copy_dirty_blocks()?;

        if self.layout_stale {
            self.rebuild_descriptor_set_layout(&ctx)?;
            self.layout_stale = false;
        }

        self.force_full_copy = false;
        self.sync_state = DeviceSyncState::InSync;
        Ok(())
    }

    /// Release the device buffer, memory and layout objects and reset to
    /// `Empty`. Also runs automatically on drop.
    pub fn free_device_resources(&mut self) {
        self.release_buffer();
        if let Some(ctx) = self.ctx.as_ref() {
            if self.descriptor_set_layout != vk::DescriptorSetLayout::null() {
                unsafe {
                    ctx.device
                        .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
                }
                self.descriptor_set_layout = vk::DescriptorSetLayout::null();
            }
        }
        self.layout.clear();
        self.layout_stale = !self.blocks.is_empty();
        self.sync_state = DeviceSyncState::Empty;
    }

    fn block_shapes(&self) -> Result<Vec<BlockShape>> {
        let mut shapes = Vec::with_capacity(self.blocks.len());
        for (&binding, block) in &self.blocks {
            let data = block.data.lock().map_err(|_| {
                engine_err!("prism3d::vulkan", "Uniform data lock poisoned at binding {}", binding)
            })?;
            let total = data.data_size();
            if total % block.instances as u64 != 0 {
                engine_error!(
                    "prism3d::vulkan",
                    "Uniform data at binding {} ({} bytes) is not divisible into {} instances",
                    binding,
                    total,
                    block.instances
                );
                return Err(Error::InvalidResource(format!(
                    "Uniform data at binding {} is not divisible into {} instances",
                    binding, block.instances
                )));
            }
            shapes.push((binding, total, block.instances, block.dynamic));
        }
        Ok(shapes)
    }

    fn copy_dirty_blocks(&mut self) -> Result<()> {
        let Some(allocation) = self.allocation.as_ref() else {
            engine_error!("prism3d::vulkan", "Uniform upload without a backing allocation");
            return Err(Error::InvalidResource(
                "Uniform upload without a backing allocation".to_string(),
            ));
        };
        let mapped = allocation.mapped_ptr().ok_or_else(|| {
            engine_err!("prism3d::vulkan", "Uniform buffer memory is not CPU-accessible")
        })?;
        let dst = unsafe {
            std::slice::from_raw_parts_mut(
                mapped.as_ptr() as *mut u8,
                self.current_buffer_size as usize,
            )
        };

        for entry in &self.layout {
            let Some(block) = self.blocks.get(&entry.binding) else {
                continue;
            };
            let mut data = block.data.lock().map_err(|_| {
                engine_err!(
                    "prism3d::vulkan",
                    "Uniform data lock poisoned at binding {}",
                    entry.binding
                )
            })?;
            if !data.is_dirty() && !self.force_full_copy {
                continue;
            }

            scatter_instances(dst, entry, data.data());
            data.mark_clean();
        }
        Ok(())
    }

    fn rebuild_descriptor_set_layout(&mut self, ctx: &Arc<GpuContext>) -> Result<()> {
        if self.descriptor_set_layout != vk::DescriptorSetLayout::null() {
            unsafe {
                ctx.device
                    .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            }
            self.descriptor_set_layout = vk::DescriptorSetLayout::null();
        }

        let bindings: Vec<vk::DescriptorSetLayoutBinding> = self
            .blocks
            .iter()
            .map(|(&binding, block)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding)
                    .descriptor_type(if block.dynamic {
                        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                    } else {
                        vk::DescriptorType::UNIFORM_BUFFER
                    })
                    .descriptor_count(1)
                    .stage_flags(stage_flags_to_vk(block.stages))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        self.descriptor_set_layout = unsafe {
            ctx.device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create descriptor set layout: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create descriptor set layout: {:?}",
                        e
                    ))
                })?
        };
        engine_debug!(
            "prism3d::vulkan",
            "Uniform descriptor layout rebuilt with {} bindings",
            bindings.len()
        );
        Ok(())
    }

    fn allocate_buffer(&mut self, ctx: &Arc<GpuContext>, size: u64) -> Result<()> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(vk::BufferUsageFlags::UNIFORM_BUFFER)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to create uniform buffer: {:?}", e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = {
                let mut allocator = ctx.allocator.lock().map_err(|_| {
                    engine_err!("prism3d::vulkan", "GPU allocator lock poisoned")
                })?;
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "uniform buffer",
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("prism3d::vulkan", "Failed to allocate uniform buffer memory: {:?}", e);
                        Error::OutOfMemory
                    })?
            };

            ctx.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to bind uniform buffer memory: {:?}", e))?;

            self.buffer = buffer;
            self.allocation = Some(allocation);
            self.current_buffer_size = size;
            engine_debug!("prism3d::vulkan", "Uniform buffer allocated: {} bytes", size);
            Ok(())
        }
    }

    fn release_buffer(&mut self) {
        let Some(ctx) = self.ctx.as_ref() else {
            return;
        };
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.buffer != vk::Buffer::null() {
                ctx.device.destroy_buffer(self.buffer, None);
                self.buffer = vk::Buffer::null();
            }
        }
        self.current_buffer_size = 0;
    }
}

impl Default for UniformStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UniformStore {
    fn drop(&mut self) {
        self.free_device_resources();
    }
}

/// Copy one block's tightly packed instances into its buffer region,
/// re-strided to the device alignment. Bytes outside the block's region
/// are never touched.
fn scatter_instances(dst: &mut [u8], entry: &BlockLayout, bytes: &[u8]) {
    let per_instance = entry.range as usize;
    for instance in 0..entry.instances as usize {
        let src_start = instance * per_instance;
        if src_start + per_instance > bytes.len() {
            break;
        }
        let dst_start = (entry.offset + instance as u64 * entry.stride) as usize;
        if dst_start + per_instance > dst.len() {
            break;
        }
        dst[dst_start..dst_start + per_instance]
            .copy_from_slice(&bytes[src_start..src_start + per_instance]);
    }
}

/// Convert engine stage flags to Vulkan stage flags
fn stage_flags_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}
