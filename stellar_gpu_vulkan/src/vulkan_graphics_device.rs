/// VulkanGraphicsDevice - ash implementation of the GraphicsDevice trait
///
/// Every stellar handle carries the raw Vulkan handle value, so conversions
/// are free. The only extra bookkeeping is what Vulkan does not track for us:
/// gpu-allocator allocations (keyed by memory id for images and by buffer for
/// buffers) and descriptor pool occupancy, used to report pool exhaustion
/// before the driver call.

use std::ffi::CString;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::{AllocationError, MemoryLocation};
use rustc_hash::FxHashMap;
use stellar_gpu::graphics_device::*;
use stellar_gpu::{engine_debug, engine_err, engine_error, engine_warn};
use stellar_gpu::{Context, Error, GraphicsDevice, Log, Platform, Result};

#[cfg(feature = "vulkan-validation")]
use crate::debug::ValidationStats;
use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::*;

const SOURCE: &str = "stellar::vulkan";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Allocations the device owns on behalf of the core
#[derive(Default)]
struct Allocations {
    next_memory_id: u64,
    /// Image memory, keyed by `MemoryHandle`
    images: FxHashMap<u64, Allocation>,
    /// Host-visible buffer memory, keyed by buffer
    buffers: FxHashMap<vk::Buffer, Allocation>,
}

#[derive(Debug, Clone, Copy)]
struct PoolUsage {
    capacity: u32,
    allocated: u32,
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    log: Log,
    vk: VulkanContext,
    allocations: Mutex<Allocations>,
    descriptor_pools: Mutex<FxHashMap<vk::DescriptorPool, PoolUsage>>,
    /// Serializes queue access (submit, present, idle)
    queue_lock: Mutex<()>,
}

impl VulkanGraphicsDevice {
    /// Create the instance, surface and logical device for `platform`'s window
    ///
    /// The platform must already be initialized.
    pub fn new(ctx: &Context, platform: &dyn Platform) -> Result<Self> {
        let vk = VulkanContext::new(ctx, platform)?;
        Ok(Self {
            log: ctx.log().clone(),
            vk,
            allocations: Mutex::new(Allocations::default()),
            descriptor_pools: Mutex::new(FxHashMap::default()),
            queue_lock: Mutex::new(()),
        })
    }

    /// Validation message counters (`None` when validation is off)
    #[cfg(feature = "vulkan-validation")]
    pub fn validation_stats(&self) -> Option<ValidationStats> {
        self.vk.debug.as_ref().map(|debug| debug.state.stats())
    }

    /// Print the validation statistics report to stdout
    #[cfg(feature = "vulkan-validation")]
    pub fn print_validation_stats_report(&self) {
        if let Some(debug) = &self.vk.debug {
            debug.state.print_report();
        }
    }

    fn vk_error(&self, what: &str, result: vk::Result) -> Error {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                engine_error!(self.log, SOURCE, "{}: {:?}", what, result);
                Error::OutOfMemory
            }
            _ => engine_err!(self.log, SOURCE, "{}: {:?}", what, result),
        }
    }

    fn allocation_error(&self, what: &str, error: AllocationError) -> Error {
        match error {
            AllocationError::OutOfMemory => {
                engine_error!(self.log, SOURCE, "{}: out of memory", what);
                Error::OutOfMemory
            }
            other => engine_err!(self.log, SOURCE, "{}: {:?}", what, other),
        }
    }

    fn allocate(&self, name: &str, requirements: vk::MemoryRequirements, location: MemoryLocation, linear: bool) -> Result<Allocation> {
        lock(&*self.vk.allocator)
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| self.allocation_error(&format!("Failed to allocate {} memory", name), e))
    }

    fn free(&self, allocation: Allocation) {
        if let Err(e) = lock(&*self.vk.allocator).free(allocation) {
            engine_error!(self.log, SOURCE, "Failed to free GPU allocation: {:?}", e);
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== SURFACE =====

    fn queue_families(&self) -> QueueFamilyIndices {
        self.vk.queue_families
    }

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        let caps = unsafe {
            self.vk
                .surface_loader
                .get_physical_device_surface_capabilities(self.vk.physical_device, self.vk.surface)
        }
        .map_err(|e| self.vk_error("Failed to query surface capabilities", e))?;

        Ok(SurfaceCapabilities {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_extent: extent_from_vk(caps.current_extent),
            min_image_extent: extent_from_vk(caps.min_image_extent),
            max_image_extent: extent_from_vk(caps.max_image_extent),
        })
    }

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>> {
        let formats = unsafe {
            self.vk
                .surface_loader
                .get_physical_device_surface_formats(self.vk.physical_device, self.vk.surface)
        }
        .map_err(|e| self.vk_error("Failed to query surface formats", e))?;

        Ok(formats
            .into_iter()
            .filter_map(|f| {
                format_from_vk(f.format).map(|format| SurfaceFormat {
                    format,
                    color_space: color_space_from_vk(f.color_space),
                })
            })
            .collect())
    }

    fn present_modes(&self) -> Result<Vec<PresentMode>> {
        let modes = unsafe {
            self.vk
                .surface_loader
                .get_physical_device_surface_present_modes(self.vk.physical_device, self.vk.surface)
        }
        .map_err(|e| self.vk_error("Failed to query present modes", e))?;

        Ok(modes.into_iter().filter_map(present_mode_from_vk).collect())
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        let caps = unsafe {
            self.vk
                .surface_loader
                .get_physical_device_surface_capabilities(self.vk.physical_device, self.vk.surface)
        }
        .map_err(|e| self.vk_error("Failed to query surface capabilities", e))?;

        let composite_alpha = [
            vk::CompositeAlphaFlagsKHR::OPAQUE,
            vk::CompositeAlphaFlagsKHR::INHERIT,
            vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
            vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        ]
        .into_iter()
        .find(|&flag| caps.supported_composite_alpha.contains(flag))
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE);

        let (sharing_mode, queue_families): (vk::SharingMode, &[u32]) = match &desc.sharing_mode {
            SharingMode::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
            SharingMode::Concurrent(families) => (vk::SharingMode::CONCURRENT, families),
        };

        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.vk.surface)
            .min_image_count(desc.min_image_count)
            .image_format(format_to_vk(desc.surface_format.format))
            .image_color_space(color_space_to_vk(desc.surface_format.color_space))
            .image_extent(extent_to_vk(desc.extent))
            .image_array_layers(1)
            .image_usage(image_usage_to_vk(desc.image_usage))
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_families)
            .pre_transform(caps.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true);

        let swapchain = unsafe { self.vk.swapchain_loader.create_swapchain(&info, None) }
            .map_err(|e| self.vk_error("Failed to create swapchain", e))?;
        engine_debug!(self.log, SOURCE,
            "Swapchain created: {}x{} {:?} {:?}",
            desc.extent.width, desc.extent.height, desc.surface_format.format, desc.present_mode);
        Ok(SwapchainHandle::from_raw(swapchain.as_raw()))
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let images = unsafe { self.vk.swapchain_loader.get_swapchain_images(swapchain.vk()) }
            .map_err(|e| self.vk_error("Failed to get swapchain images", e))?;
        Ok(images.into_iter().map(|image| ImageHandle::from_raw(image.as_raw())).collect())
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        unsafe { self.vk.swapchain_loader.destroy_swapchain(swapchain.vk(), None) };
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let result = unsafe {
            self.vk.swapchain_loader.acquire_next_image(
                swapchain.vk(),
                timeout_ns,
                signal.vk(),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(self.vk_error("Failed to acquire next swapchain image", e)),
        }
    }

    fn queue_present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome> {
        let swapchains = [swapchain.vk()];
        let image_indices = [image_index];
        let wait_semaphores = [wait.vk()];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = lock(&self.queue_lock);
        let result = unsafe { self.vk.swapchain_loader.queue_present(self.vk.present_queue, &info) };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(self.vk_error("Failed to present swapchain image", e)),
        }
    }

    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.vk.device.create_fence(&info, None) }
            .map_err(|e| self.vk_error("Failed to create fence", e))?;
        Ok(FenceHandle::from_raw(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe { self.vk.device.destroy_fence(fence.vk(), None) };
    }

    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> Result<()> {
        unsafe { self.vk.device.wait_for_fences(&[fence.vk()], true, timeout_ns) }
            .map_err(|e| self.vk_error("Failed to wait for fence", e))
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe { self.vk.device.reset_fences(&[fence.vk()]) }
            .map_err(|e| self.vk_error("Failed to reset fence", e))
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.vk.device.create_semaphore(&info, None) }
            .map_err(|e| self.vk_error("Failed to create semaphore", e))?;
        Ok(SemaphoreHandle::from_raw(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe { self.vk.device.destroy_semaphore(semaphore.vk(), None) };
    }

    fn wait_idle(&self) -> Result<()> {
        let _queue = lock(&self.queue_lock);
        unsafe { self.vk.device.device_wait_idle() }
            .map_err(|e| self.vk_error("Failed to wait for device idle", e))
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle> {
        let pool = lock(&self.vk.command_pool);
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.vk.device.allocate_command_buffers(&info) }
            .map_err(|e| self.vk_error("Failed to allocate command buffer", e))?;
        buffers
            .into_iter()
            .next()
            .map(|cb| CommandBufferHandle::from_raw(cb.as_raw()))
            .ok_or_else(|| engine_err!(self.log, SOURCE, "Driver returned no command buffer"))
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        let pool = lock(&self.vk.command_pool);
        unsafe { self.vk.device.free_command_buffers(*pool, &[command_buffer.vk()]) };
    }

    fn reset_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe {
            self.vk
                .device
                .reset_command_buffer(command_buffer.vk(), vk::CommandBufferResetFlags::empty())
        }
        .map_err(|e| self.vk_error("Failed to reset command buffer", e))
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.vk.device.begin_command_buffer(command_buffer.vk(), &info) }
            .map_err(|e| self.vk_error("Failed to begin command buffer", e))
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe { self.vk.device.end_command_buffer(command_buffer.vk()) }
            .map_err(|e| self.vk_error("Failed to end command buffer", e))
    }

    fn queue_submit(&self, submit: &SubmitDesc) -> Result<()> {
        let command_buffers = [submit.command_buffer.vk()];
        let wait_semaphores = [submit.wait_semaphore.vk()];
        let wait_stages = [pipeline_stage_to_vk(submit.wait_stage)];
        let signal_semaphores = [submit.signal_semaphore.vk()];

        let mut info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if !submit.wait_semaphore.is_null() {
            info = info.wait_semaphores(&wait_semaphores).wait_dst_stage_mask(&wait_stages);
        }
        if !submit.signal_semaphore.is_null() {
            info = info.signal_semaphores(&signal_semaphores);
        }

        let _queue = lock(&self.queue_lock);
        unsafe {
            self.vk
                .device
                .queue_submit(self.vk.graphics_queue, &[info], submit.fence.vk())
        }
        .map_err(|e| self.vk_error("Failed to submit commands to GPU queue", e))
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc<'_>) {
        let clear_values: Vec<vk::ClearValue> = desc.clear_values.iter().map(clear_value_to_vk).collect();
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(desc.render_pass.vk())
            .framebuffer(desc.framebuffer.vk())
            .render_area(rect_to_vk(&desc.render_area))
            .clear_values(&clear_values);
        unsafe {
            self.vk
                .device
                .cmd_begin_render_pass(command_buffer.vk(), &info, vk::SubpassContents::INLINE)
        };
    }

    fn cmd_next_subpass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.vk.device.cmd_next_subpass(command_buffer.vk(), vk::SubpassContents::INLINE) };
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.vk.device.cmd_end_render_pass(command_buffer.vk()) };
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        unsafe {
            self.vk.device.cmd_bind_pipeline(
                command_buffer.vk(),
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.vk(),
            )
        };
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: &Viewport) {
        let viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe { self.vk.device.cmd_set_viewport(command_buffer.vk(), 0, &[viewport]) };
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: &Rect2D) {
        unsafe { self.vk.device.cmd_set_scissor(command_buffer.vk(), 0, &[rect_to_vk(scissor)]) };
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        let sets: Vec<vk::DescriptorSet> = sets.iter().map(|set| set.vk()).collect();
        unsafe {
            self.vk.device.cmd_bind_descriptor_sets(
                command_buffer.vk(),
                vk::PipelineBindPoint::GRAPHICS,
                layout.vk(),
                first_set,
                &sets,
                &[],
            )
        };
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64) {
        unsafe {
            self.vk
                .device
                .cmd_bind_vertex_buffers(command_buffer.vk(), 0, &[buffer.vk()], &[offset])
        };
    }

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) {
        unsafe {
            self.vk.device.cmd_bind_index_buffer(
                command_buffer.vk(),
                buffer.vk(),
                offset,
                index_type_to_vk(index_type),
            )
        };
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.vk.device.cmd_draw(
                command_buffer.vk(),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            )
        };
    }

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.vk.device.cmd_draw_indexed(
                command_buffer.vk(),
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            )
        };
    }

    // ===== IMAGES =====

    fn create_image(&self, desc: &ImageDesc) -> Result<AllocatedImage> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.vk.device.create_image(&info, None) }
            .map_err(|e| self.vk_error("Failed to create image", e))?;
        let requirements = unsafe { self.vk.device.get_image_memory_requirements(image) };

        let allocation = match self.allocate("image", requirements, MemoryLocation::GpuOnly, false) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.vk.device.destroy_image(image, None) };
                return Err(e);
            }
        };
        let bound = unsafe {
            self.vk
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            unsafe { self.vk.device.destroy_image(image, None) };
            self.free(allocation);
            return Err(self.vk_error("Failed to bind image memory", e));
        }

        let mut allocations = lock(&self.allocations);
        allocations.next_memory_id += 1;
        let memory_id = allocations.next_memory_id;
        allocations.images.insert(memory_id, allocation);

        Ok(AllocatedImage {
            image: ImageHandle::from_raw(image.as_raw()),
            memory: MemoryHandle::from_raw(memory_id),
        })
    }

    fn destroy_image(&self, image: ImageHandle) {
        unsafe { self.vk.device.destroy_image(image.vk(), None) };
    }

    fn free_memory(&self, memory: MemoryHandle) {
        let allocation = lock(&self.allocations).images.remove(&memory.as_raw());
        match allocation {
            Some(allocation) => self.free(allocation),
            None => engine_warn!(self.log, SOURCE, "free_memory: unknown memory handle {}", memory.as_raw()),
        }
    }

    fn create_image_view(&self, desc: &ImageViewDesc) -> Result<ImageViewHandle> {
        let info = vk::ImageViewCreateInfo::default()
            .image(desc.image.vk())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: image_aspect_to_vk(desc.aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.vk.device.create_image_view(&info, None) }
            .map_err(|e| self.vk_error("Failed to create image view", e))?;
        Ok(ImageViewHandle::from_raw(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        unsafe { self.vk.device.destroy_image_view(view.vk(), None) };
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let address_mode = address_mode_to_vk(desc.address_mode);
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .border_color(border_color_to_vk(desc.border_color))
            .compare_enable(desc.compare_op.is_some())
            .compare_op(desc.compare_op.map(compare_op_to_vk).unwrap_or(vk::CompareOp::ALWAYS))
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);
        let sampler = unsafe { self.vk.device.create_sampler(&info, None) }
            .map_err(|e| self.vk_error("Failed to create sampler", e))?;
        Ok(SamplerHandle::from_raw(sampler.as_raw()))
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        unsafe { self.vk.device.destroy_sampler(sampler.vk(), None) };
    }

    // ===== BUFFERS =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("Buffer size must be greater than zero".to_string()));
        }
        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { self.vk.device.create_buffer(&info, None) }
            .map_err(|e| self.vk_error("Failed to create buffer", e))?;
        let requirements = unsafe { self.vk.device.get_buffer_memory_requirements(buffer) };

        let allocation = match self.allocate("buffer", requirements, MemoryLocation::CpuToGpu, true) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.vk.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };
        let bound = unsafe {
            self.vk
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            unsafe { self.vk.device.destroy_buffer(buffer, None) };
            self.free(allocation);
            return Err(self.vk_error("Failed to bind buffer memory", e));
        }

        lock(&self.allocations).buffers.insert(buffer, allocation);
        Ok(BufferHandle::from_raw(buffer.as_raw()))
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut allocations = lock(&self.allocations);
        let allocation = allocations
            .buffers
            .get_mut(&buffer.vk())
            .ok_or_else(|| engine_err!(self.log, SOURCE, "write_buffer: unknown buffer {}", buffer.as_raw()))?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| engine_err!(self.log, SOURCE, "Buffer is not CPU-accessible"))?;

        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .filter(|&end| end <= mapped.len())
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "Write of {} bytes at offset {} exceeds buffer size {}",
                    data.len(), offset, mapped.len()
                ))
            })?;
        mapped[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let allocation = lock(&self.allocations).buffers.remove(&buffer.vk());
        unsafe { self.vk.device.destroy_buffer(buffer.vk(), None) };
        if let Some(allocation) = allocation {
            self.free(allocation);
        }
    }

    // ===== RENDER PASSES =====

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> Result<RenderPassHandle> {
        let attachments: Vec<vk::AttachmentDescription> = desc.attachments.iter().map(attachment_to_vk).collect();

        // Reference arrays must outlive the subpass descriptions pointing at them
        let color_refs: Vec<Vec<vk::AttachmentReference>> = desc
            .subpasses
            .iter()
            .map(|s| s.color_attachments.iter().map(attachment_ref_to_vk).collect())
            .collect();
        let depth_refs: Vec<Option<vk::AttachmentReference>> = desc
            .subpasses
            .iter()
            .map(|s| s.depth_attachment.as_ref().map(attachment_ref_to_vk))
            .collect();

        let subpasses: Vec<vk::SubpassDescription> = color_refs
            .iter()
            .zip(&depth_refs)
            .map(|(colors, depth)| {
                let subpass = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(colors);
                match depth {
                    Some(depth) => subpass.depth_stencil_attachment(depth),
                    None => subpass,
                }
            })
            .collect();
        let dependencies: Vec<vk::SubpassDependency> = desc.dependencies.iter().map(dependency_to_vk).collect();

        let info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        let render_pass = unsafe { self.vk.device.create_render_pass(&info, None) }
            .map_err(|e| self.vk_error("Failed to create render pass", e))?;
        Ok(RenderPassHandle::from_raw(render_pass.as_raw()))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe { self.vk.device.destroy_render_pass(render_pass.vk(), None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let views: Vec<vk::ImageView> = attachments.iter().map(|view| view.vk()).collect();
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.vk())
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { self.vk.device.create_framebuffer(&info, None) }
            .map_err(|e| self.vk_error("Failed to create framebuffer", e))?;
        Ok(FramebufferHandle::from_raw(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe { self.vk.device.destroy_framebuffer(framebuffer.vk(), None) };
    }

    // ===== PIPELINES =====

    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModuleHandle> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { self.vk.device.create_shader_module(&info, None) }
            .map_err(|e| self.vk_error("Failed to create shader module", e))?;
        Ok(ShaderModuleHandle::from_raw(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe { self.vk.device.destroy_shader_module(module.vk(), None) };
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constants: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle> {
        let set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts.iter().map(|l| l.vk()).collect();
        let ranges: Vec<vk::PushConstantRange> = push_constants
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stage_flags_to_vk(range.stage_flags),
                offset: range.offset,
                size: range.size,
            })
            .collect();
        let info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&ranges);
        let layout = unsafe { self.vk.device.create_pipeline_layout(&info, None) }
            .map_err(|e| self.vk_error("Failed to create pipeline layout", e))?;
        Ok(PipelineLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe { self.vk.device.destroy_pipeline_layout(layout.vk(), None) };
    }

    fn create_graphics_pipeline(
        &self,
        stages: &[PipelineShaderStage],
        state: &PipelineState,
    ) -> Result<PipelineHandle> {
        let entry_names = stages
            .iter()
            .map(|stage| CString::new(stage.entry_point.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidResource(format!("Invalid entry point name: {}", e)))?;
        let stage_infos: Vec<vk::PipelineShaderStageCreateInfo> = stages
            .iter()
            .zip(&entry_names)
            .map(|(stage, name)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(stage.stage))
                    .module(stage.module.vk())
                    .name(name)
            })
            .collect();

        let bindings: Vec<vk::VertexInputBindingDescription> = state
            .vertex_layout
            .bindings
            .iter()
            .map(|b| vk::VertexInputBindingDescription {
                binding: b.binding,
                stride: b.stride,
                input_rate: input_rate_to_vk(b.input_rate),
            })
            .collect();
        let attributes: Vec<vk::VertexInputAttributeDescription> = state
            .vertex_layout
            .attributes
            .iter()
            .map(|a| vk::VertexInputAttributeDescription {
                location: a.location,
                binding: a.binding,
                format: format_to_vk(a.format),
                offset: a.offset,
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(state.topology))
            .primitive_restart_enable(false);

        // Dynamic viewport/scissor only need the counts
        let static_viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: state.viewport_extent.width as f32,
            height: state.viewport_extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let static_scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: extent_to_vk(state.viewport_extent),
        }];
        let mut viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        if !state.dynamic_states.contains(&DynamicState::Viewport) {
            viewport_state = viewport_state.viewports(&static_viewports);
        }
        if !state.dynamic_states.contains(&DynamicState::Scissor) {
            viewport_state = viewport_state.scissors(&static_scissors);
        }

        let raster = &state.rasterization;
        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(raster.polygon_mode))
            .cull_mode(cull_mode_to_vk(raster.cull_mode))
            .front_face(front_face_to_vk(raster.front_face))
            .line_width(1.0);
        if let Some(bias) = raster.depth_bias {
            rasterization = rasterization
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_slope_factor(bias.slope_factor)
                .depth_bias_clamp(bias.clamp);
        }

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(state.multisample.sample_count))
            .alpha_to_coverage_enable(state.multisample.alpha_to_coverage);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(state.depth_stencil.depth_test_enable)
            .depth_write_enable(state.depth_stencil.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(state.depth_stencil.depth_compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> =
            state.color_blend_attachments.iter().map(color_blend_to_vk).collect();
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states: Vec<vk::DynamicState> =
            state.dynamic_states.iter().copied().map(dynamic_state_to_vk).collect();
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stage_infos)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(state.layout.vk())
            .render_pass(state.render_pass.vk())
            .subpass(state.subpass);

        let pipelines = unsafe {
            self.vk
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
        }
        .map_err(|(_, e)| self.vk_error("Failed to create graphics pipeline", e))?;
        pipelines
            .into_iter()
            .next()
            .map(|pipeline| PipelineHandle::from_raw(pipeline.as_raw()))
            .ok_or_else(|| engine_err!(self.log, SOURCE, "Driver returned no pipeline"))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe { self.vk.device.destroy_pipeline(pipeline.vk(), None) };
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                    .descriptor_count(b.count)
                    .stage_flags(shader_stage_flags_to_vk(b.stage_flags))
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe { self.vk.device.create_descriptor_set_layout(&info, None) }
            .map_err(|e| self.vk_error("Failed to create descriptor set layout", e))?;
        Ok(DescriptorSetLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe { self.vk.device.destroy_descriptor_set_layout(layout.vk(), None) };
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle> {
        let sizes: Vec<vk::DescriptorPoolSize> = pool_sizes
            .iter()
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(size.descriptor_type),
                descriptor_count: size.count,
            })
            .collect();
        let info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(&sizes);
        let pool = unsafe { self.vk.device.create_descriptor_pool(&info, None) }
            .map_err(|e| self.vk_error("Failed to create descriptor pool", e))?;

        lock(&self.descriptor_pools).insert(pool, PoolUsage { capacity: max_sets, allocated: 0 });
        Ok(DescriptorPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        lock(&self.descriptor_pools).remove(&pool.vk());
        unsafe { self.vk.device.destroy_descriptor_pool(pool.vk(), None) };
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        let mut pools = lock(&self.descriptor_pools);
        let usage = pools
            .get_mut(&pool.vk())
            .ok_or_else(|| engine_err!(self.log, SOURCE, "Unknown descriptor pool {}", pool.as_raw()))?;
        if usage.allocated >= usage.capacity {
            return Err(Error::PoolExhausted { capacity: usage.capacity });
        }

        let layouts = [layout.vk()];
        let info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool.vk())
            .set_layouts(&layouts);
        let sets = match unsafe { self.vk.device.allocate_descriptor_sets(&info) } {
            Ok(sets) => sets,
            // Per-type descriptor counts can run out before max_sets
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                return Err(Error::PoolExhausted { capacity: usage.capacity });
            }
            Err(e) => return Err(self.vk_error("Failed to allocate descriptor set", e)),
        };
        let set = sets
            .into_iter()
            .next()
            .ok_or_else(|| engine_err!(self.log, SOURCE, "Driver returned no descriptor set"))?;
        usage.allocated += 1;
        Ok(DescriptorSetHandle::from_raw(set.as_raw()))
    }

    fn update_descriptor_sets(&self, writes: &[DescriptorWrite]) {
        // Info arrays are indexed like `writes` and must outlive the write structs
        let buffer_infos: Vec<vk::DescriptorBufferInfo> = writes
            .iter()
            .map(|w| match w.update.resource {
                DescriptorResource::Buffer(region) => vk::DescriptorBufferInfo {
                    buffer: region.buffer.vk(),
                    offset: region.offset,
                    range: region.range,
                },
                DescriptorResource::Image { .. } => vk::DescriptorBufferInfo::default(),
            })
            .collect();
        let image_infos: Vec<vk::DescriptorImageInfo> = writes
            .iter()
            .map(|w| match w.update.resource {
                DescriptorResource::Image { view, sampler, layout } => vk::DescriptorImageInfo {
                    sampler: sampler.vk(),
                    image_view: view.vk(),
                    image_layout: image_layout_to_vk(layout),
                },
                DescriptorResource::Buffer(_) => vk::DescriptorImageInfo::default(),
            })
            .collect();

        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(w.set.vk())
                    .dst_binding(w.update.binding)
                    .dst_array_element(w.update.array_element)
                    .descriptor_type(descriptor_type_to_vk(w.update.descriptor_type));
                match w.update.resource {
                    DescriptorResource::Buffer(_) => write.buffer_info(std::slice::from_ref(&buffer_infos[i])),
                    DescriptorResource::Image { .. } => write.image_info(std::slice::from_ref(&image_infos[i])),
                }
            })
            .collect();

        unsafe { self.vk.device.update_descriptor_sets(&vk_writes, &[]) };
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe { self.vk.device.device_wait_idle().ok() };

        // Anything still here was leaked by the caller; release it before the
        // allocator goes away with the context
        let allocations = std::mem::take(
            self.allocations.get_mut().unwrap_or_else(PoisonError::into_inner),
        );
        let leaked = allocations.images.len() + allocations.buffers.len();
        if leaked > 0 {
            engine_warn!(self.log, SOURCE, "{} GPU allocations still alive at device drop", leaked);
        }
        for (buffer, allocation) in allocations.buffers {
            unsafe { self.vk.device.destroy_buffer(buffer, None) };
            self.free(allocation);
        }
        for (_, allocation) in allocations.images {
            self.free(allocation);
        }

        let pools = std::mem::take(self.descriptor_pools.get_mut().unwrap_or_else(PoisonError::into_inner));
        for pool in pools.into_keys() {
            unsafe { self.vk.device.destroy_descriptor_pool(pool, None) };
        }
    }
}
