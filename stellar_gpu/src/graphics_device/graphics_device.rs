/// GraphicsDevice trait - the seam between the core and a GPU backend
///
/// Every native object is created and destroyed through this trait and named
/// by an opaque handle. The core never sees backend types, which lets the
/// swapchain, caches and material synthesis run against the mock device in
/// unit tests.
///
/// Methods take `&self`: backends keep their bookkeeping behind interior
/// locks, and the core shares the device as `Arc<dyn GraphicsDevice>`.
/// Destruction of the logical device itself happens when the backend value is
/// dropped, after every cache has released its objects.

use crate::error::Result;
use crate::graphics_device::*;

pub trait GraphicsDevice: Send + Sync {
    // ===== SURFACE =====

    /// Graphics and present queue families selected at device creation
    fn queue_families(&self) -> QueueFamilyIndices;

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities>;

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>>;

    fn present_modes(&self) -> Result<Vec<PresentMode>>;

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle>;

    /// Images owned by the swapchain, in presentation index order
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    /// Destroys the swapchain and, implicitly, its images
    fn destroy_swapchain(&self, swapchain: SwapchainHandle);

    /// Acquire the next presentable image, signaling `signal` when it is ready
    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome>;

    /// Queue `image_index` for presentation once `wait` is signaled
    fn queue_present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome>;

    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    fn destroy_fence(&self, fence: FenceHandle);

    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> Result<()>;

    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;

    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Allocate a primary command buffer from the device command pool
    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle>;

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle);

    fn reset_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Submit one command buffer to the graphics queue
    fn queue_submit(&self, submit: &SubmitDesc) -> Result<()>;

    // ===== RECORDING =====

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc<'_>);

    fn cmd_next_subpass(&self, command_buffer: CommandBufferHandle);

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle);

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: &Viewport);

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: &Rect2D);

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    );

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle, offset: u64);

    fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    );

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    fn cmd_draw_indexed(
        &self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    // ===== IMAGES =====

    /// Create a device-local image and bind freshly allocated memory to it
    fn create_image(&self, desc: &ImageDesc) -> Result<AllocatedImage>;

    /// Destroy an image created by `create_image` (never a swapchain image)
    fn destroy_image(&self, image: ImageHandle);

    fn free_memory(&self, memory: MemoryHandle);

    fn create_image_view(&self, desc: &ImageViewDesc) -> Result<ImageViewHandle>;

    fn destroy_image_view(&self, view: ImageViewHandle);

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<SamplerHandle>;

    fn destroy_sampler(&self, sampler: SamplerHandle);

    // ===== BUFFERS =====

    /// Create a host-visible, persistently mapped buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle>;

    /// Copy `data` into the buffer at `offset`
    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    // ===== RENDER PASSES =====

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&self, render_pass: RenderPassHandle);

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    // ===== PIPELINES =====

    /// Create a shader module from SPIR-V words
    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModuleHandle>;

    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constants: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    fn create_graphics_pipeline(
        &self,
        stages: &[PipelineShaderStage],
        state: &PipelineState,
    ) -> Result<PipelineHandle>;

    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle>;

    /// Destroys the pool and every set allocated from it
    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle);

    /// Allocate one set; `Error::PoolExhausted` when the pool is full
    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle>;

    /// Submit all writes in one device call
    fn update_descriptor_sets(&self, writes: &[DescriptorWrite]);
}
