/// Mock graphics device for unit tests (no GPU required)
///
/// Hands out unique handles and tracks every live object by kind, so tests can
/// assert creation/destruction counts, detect double or mismatched destroys
/// (e.g. destroying a swapchain-owned image), and script acquire/present
/// outcomes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::*;

/// Kind of object tracked by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Swapchain,
    /// Image owned by a swapchain (never destroyed individually)
    SwapchainImage,
    Image,
    Memory,
    ImageView,
    Sampler,
    Framebuffer,
    RenderPass,
    CommandBuffer,
    Fence,
    Semaphore,
    ShaderModule,
    Pipeline,
    PipelineLayout,
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet,
    Buffer,
}

/// Descriptor pool bookkeeping
#[derive(Debug, Clone, Default)]
pub struct MockPool {
    pub max_sets: u32,
    pub sets: Vec<u64>,
}

/// All mock state, inspectable from tests
pub struct MockState {
    next_handle: u64,

    // Surface configuration (edit before Swapchain::setup)
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    pub queue_families: QueueFamilyIndices,

    // Object tracking
    pub live: FxHashMap<u64, ObjectKind>,
    pub created: FxHashMap<ObjectKind, usize>,
    pub destroyed: FxHashMap<ObjectKind, usize>,
    pub invalid_destroys: Vec<(ObjectKind, u64)>,

    // Per-object details
    pub swapchain_images: FxHashMap<u64, Vec<u64>>,
    pub swapchain_descs: Vec<SwapchainDesc>,
    pub framebuffers: FxHashMap<u64, (Vec<ImageViewHandle>, Extent2D)>,
    pub pipelines: FxHashMap<u64, (Vec<PipelineShaderStage>, PipelineState)>,
    pub pipeline_layouts: FxHashMap<u64, (Vec<DescriptorSetLayoutHandle>, Vec<PushConstantRange>)>,
    pub set_layouts: FxHashMap<u64, Vec<DescriptorSetLayoutBinding>>,
    pub render_passes: FxHashMap<u64, (usize, usize, usize)>,
    pub pools: FxHashMap<u64, MockPool>,
    pub images: FxHashMap<u64, ImageDesc>,
    pub samplers: FxHashMap<u64, SamplerDesc>,
    pub buffers: FxHashMap<u64, Vec<u8>>,
    fences: FxHashMap<u64, bool>,

    // Frame-loop scripting and recording
    pub acquire_script: VecDeque<AcquireOutcome>,
    pub present_script: VecDeque<PresentOutcome>,
    pub fail_submit: bool,
    pub fail_present: bool,
    pub fail_pipeline_creation: bool,
    next_image_index: u32,
    pub submits: Vec<SubmitDesc>,
    pub presents: Vec<u32>,
    pub descriptor_updates: Vec<Vec<DescriptorWrite>>,
    pub begun_command_buffers: Vec<CommandBufferHandle>,
    pub recorded_commands: Vec<String>,
    pub fence_waits: usize,
    pub wait_idle_calls: usize,
}

impl MockState {
    fn new() -> Self {
        Self {
            next_handle: 1,
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: Extent2D::new(800, 600),
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(4096, 4096),
            },
            formats: vec![SurfaceFormat {
                format: Format::B8G8R8A8_SRGB,
                color_space: ColorSpace::SrgbNonlinear,
            }],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            queue_families: QueueFamilyIndices { graphics: 0, present: 0 },
            live: FxHashMap::default(),
            created: FxHashMap::default(),
            destroyed: FxHashMap::default(),
            invalid_destroys: Vec::new(),
            swapchain_images: FxHashMap::default(),
            swapchain_descs: Vec::new(),
            framebuffers: FxHashMap::default(),
            pipelines: FxHashMap::default(),
            pipeline_layouts: FxHashMap::default(),
            set_layouts: FxHashMap::default(),
            render_passes: FxHashMap::default(),
            pools: FxHashMap::default(),
            images: FxHashMap::default(),
            samplers: FxHashMap::default(),
            buffers: FxHashMap::default(),
            fences: FxHashMap::default(),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            fail_submit: false,
            fail_present: false,
            fail_pipeline_creation: false,
            next_image_index: 0,
            submits: Vec::new(),
            presents: Vec::new(),
            descriptor_updates: Vec::new(),
            begun_command_buffers: Vec::new(),
            recorded_commands: Vec::new(),
            fence_waits: 0,
            wait_idle_calls: 0,
        }
    }

    fn create(&mut self, kind: ObjectKind) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.live.insert(raw, kind);
        *self.created.entry(kind).or_insert(0) += 1;
        raw
    }

    fn destroy(&mut self, kind: ObjectKind, raw: u64) -> bool {
        if raw == 0 {
            return false;
        }
        match self.live.get(&raw) {
            Some(k) if *k == kind => {
                self.live.remove(&raw);
                *self.destroyed.entry(kind).or_insert(0) += 1;
                true
            }
            _ => {
                self.invalid_destroys.push((kind, raw));
                false
            }
        }
    }

    fn is_live(&self, kind: ObjectKind, raw: u64) -> bool {
        self.live.get(&raw) == Some(&kind)
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn destroyed_count(&self, kind: ObjectKind) -> usize {
        self.destroyed.get(&kind).copied().unwrap_or(0)
    }

    /// Signal state of a live fence
    pub fn fence_signaled(&self, fence: FenceHandle) -> Option<bool> {
        self.fences.get(&fence.as_raw()).copied()
    }
}

/// Mock implementation of [`GraphicsDevice`]
pub struct MockGraphicsDevice {
    state: Mutex<MockState>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockState::new()) }
    }

    /// Lock the state for inspection or scripting
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state().live_count(kind)
    }

    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.state().created_count(kind)
    }

    pub fn destroyed_count(&self, kind: ObjectKind) -> usize {
        self.state().destroyed_count(kind)
    }

    /// Live objects excluding swapchain-owned images
    pub fn total_live(&self) -> usize {
        self.state()
            .live
            .values()
            .filter(|k| **k != ObjectKind::SwapchainImage)
            .count()
    }

    pub fn invalid_destroys(&self) -> Vec<(ObjectKind, u64)> {
        self.state().invalid_destroys.clone()
    }
}

/// Mock device plus the same device as a trait object
pub fn mock_device() -> (Arc<MockGraphicsDevice>, Arc<dyn GraphicsDevice>) {
    let mock = Arc::new(MockGraphicsDevice::new());
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    (mock, device)
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    // ===== SURFACE =====

    fn queue_families(&self) -> QueueFamilyIndices {
        self.state().queue_families
    }

    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        Ok(self.state().capabilities)
    }

    fn surface_formats(&self) -> Result<Vec<SurfaceFormat>> {
        Ok(self.state().formats.clone())
    }

    fn present_modes(&self) -> Result<Vec<PresentMode>> {
        Ok(self.state().present_modes.clone())
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::Swapchain);
        let images: Vec<u64> = (0..desc.min_image_count)
            .map(|_| s.create(ObjectKind::SwapchainImage))
            .collect();
        s.swapchain_images.insert(raw, images);
        s.swapchain_descs.push(desc.clone());
        s.next_image_index = 0;
        Ok(SwapchainHandle::from_raw(raw))
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let s = self.state();
        s.swapchain_images
            .get(&swapchain.as_raw())
            .map(|images| images.iter().map(|raw| ImageHandle::from_raw(*raw)).collect())
            .ok_or_else(|| Error::InvalidResource("unknown swapchain".to_string()))
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Swapchain, swapchain.as_raw()) {
            if let Some(images) = s.swapchain_images.remove(&swapchain.as_raw()) {
                for raw in images {
                    s.live.remove(&raw);
                }
            }
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
        _timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let mut s = self.state();
        if !s.is_live(ObjectKind::Swapchain, swapchain.as_raw())
            || !s.is_live(ObjectKind::Semaphore, signal.as_raw())
        {
            return Err(Error::InvalidResource("acquire on dead swapchain or semaphore".to_string()));
        }
        if let Some(outcome) = s.acquire_script.pop_front() {
            return Ok(outcome);
        }
        let count = s
            .swapchain_images
            .get(&swapchain.as_raw())
            .map(|images| images.len() as u32)
            .unwrap_or(1);
        let image_index = s.next_image_index % count;
        s.next_image_index += 1;
        Ok(AcquireOutcome::Acquired { image_index, suboptimal: false })
    }

    fn queue_present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome> {
        let mut s = self.state();
        if s.fail_present {
            return Err(Error::BackendError("present failed: device lost".to_string()));
        }
        if !s.is_live(ObjectKind::Swapchain, swapchain.as_raw())
            || !s.is_live(ObjectKind::Semaphore, wait.as_raw())
        {
            return Err(Error::InvalidResource("present on dead swapchain or semaphore".to_string()));
        }
        s.presents.push(image_index);
        Ok(s.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
    }

    // ===== SYNCHRONIZATION =====

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::Fence);
        s.fences.insert(raw, signaled);
        Ok(FenceHandle::from_raw(raw))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Fence, fence.as_raw()) {
            s.fences.remove(&fence.as_raw());
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle, _timeout_ns: u64) -> Result<()> {
        let mut s = self.state();
        s.fence_waits += 1;
        match s.fences.get(&fence.as_raw()) {
            Some(true) => Ok(()),
            // Nothing will ever signal it: a real device would hang here
            Some(false) => Err(Error::Fatal("wait on a fence that is never signaled".to_string())),
            None => Err(Error::InvalidResource("unknown fence".to_string())),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut s = self.state();
        match s.fences.get_mut(&fence.as_raw()) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(Error::InvalidResource("unknown fence".to_string())),
        }
    }

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        Ok(SemaphoreHandle::from_raw(self.state().create(ObjectKind::Semaphore)))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.state().destroy(ObjectKind::Semaphore, semaphore.as_raw());
    }

    fn wait_idle(&self) -> Result<()> {
        self.state().wait_idle_calls += 1;
        Ok(())
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle> {
        Ok(CommandBufferHandle::from_raw(self.state().create(ObjectKind::CommandBuffer)))
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        self.state().destroy(ObjectKind::CommandBuffer, command_buffer.as_raw());
    }

    fn reset_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let s = self.state();
        if s.is_live(ObjectKind::CommandBuffer, command_buffer.as_raw()) {
            Ok(())
        } else {
            Err(Error::InvalidResource("unknown command buffer".to_string()))
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        self.state().begun_command_buffers.push(command_buffer);
        Ok(())
    }

    fn end_command_buffer(&self, _command_buffer: CommandBufferHandle) -> Result<()> {
        Ok(())
    }

    fn queue_submit(&self, submit: &SubmitDesc) -> Result<()> {
        let mut s = self.state();
        if s.fail_submit {
            return Err(Error::BackendError("queue submit failed".to_string()));
        }
        // The mock GPU finishes instantly
        if let Some(signaled) = s.fences.get_mut(&submit.fence.as_raw()) {
            *signaled = true;
        }
        s.submits.push(*submit);
        Ok(())
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(&self, _command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc<'_>) {
        self.state().recorded_commands.push(format!(
            "begin_render_pass({}, {})",
            desc.render_pass.as_raw(),
            desc.framebuffer.as_raw()
        ));
    }

    fn cmd_next_subpass(&self, _command_buffer: CommandBufferHandle) {
        self.state().recorded_commands.push("next_subpass".to_string());
    }

    fn cmd_end_render_pass(&self, _command_buffer: CommandBufferHandle) {
        self.state().recorded_commands.push("end_render_pass".to_string());
    }

    fn cmd_bind_pipeline(&self, _command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        self.state()
            .recorded_commands
            .push(format!("bind_pipeline({})", pipeline.as_raw()));
    }

    fn cmd_set_viewport(&self, _command_buffer: CommandBufferHandle, viewport: &Viewport) {
        self.state()
            .recorded_commands
            .push(format!("set_viewport({}x{})", viewport.width, viewport.height));
    }

    fn cmd_set_scissor(&self, _command_buffer: CommandBufferHandle, scissor: &Rect2D) {
        self.state().recorded_commands.push(format!(
            "set_scissor({}x{})",
            scissor.extent.width, scissor.extent.height
        ));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        _command_buffer: CommandBufferHandle,
        _layout: PipelineLayoutHandle,
        first_set: u32,
        sets: &[DescriptorSetHandle],
    ) {
        self.state()
            .recorded_commands
            .push(format!("bind_descriptor_sets({}, {})", first_set, sets.len()));
    }

    fn cmd_bind_vertex_buffer(&self, _command_buffer: CommandBufferHandle, buffer: BufferHandle, _offset: u64) {
        self.state()
            .recorded_commands
            .push(format!("bind_vertex_buffer({})", buffer.as_raw()));
    }

    fn cmd_bind_index_buffer(
        &self,
        _command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        _offset: u64,
        _index_type: IndexType,
    ) {
        self.state()
            .recorded_commands
            .push(format!("bind_index_buffer({})", buffer.as_raw()));
    }

    fn cmd_draw(
        &self,
        _command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.state()
            .recorded_commands
            .push(format!("draw({}, {})", vertex_count, instance_count));
    }

    fn cmd_draw_indexed(
        &self,
        _command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.state()
            .recorded_commands
            .push(format!("draw_indexed({}, {})", index_count, instance_count));
    }

    // ===== IMAGES =====

    fn create_image(&self, desc: &ImageDesc) -> Result<AllocatedImage> {
        if desc.extent.is_zero() {
            return Err(Error::InvalidResource("zero-sized image".to_string()));
        }
        let mut s = self.state();
        let image = s.create(ObjectKind::Image);
        let memory = s.create(ObjectKind::Memory);
        s.images.insert(image, *desc);
        Ok(AllocatedImage {
            image: ImageHandle::from_raw(image),
            memory: MemoryHandle::from_raw(memory),
        })
    }

    fn destroy_image(&self, image: ImageHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Image, image.as_raw()) {
            s.images.remove(&image.as_raw());
        }
    }

    fn free_memory(&self, memory: MemoryHandle) {
        self.state().destroy(ObjectKind::Memory, memory.as_raw());
    }

    fn create_image_view(&self, desc: &ImageViewDesc) -> Result<ImageViewHandle> {
        let mut s = self.state();
        let raw = desc.image.as_raw();
        if !s.is_live(ObjectKind::Image, raw) && !s.is_live(ObjectKind::SwapchainImage, raw) {
            return Err(Error::InvalidResource("view of unknown image".to_string()));
        }
        Ok(ImageViewHandle::from_raw(s.create(ObjectKind::ImageView)))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        self.state().destroy(ObjectKind::ImageView, view.as_raw());
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::Sampler);
        s.samplers.insert(raw, *desc);
        Ok(SamplerHandle::from_raw(raw))
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        self.state().destroy(ObjectKind::Sampler, sampler.as_raw());
    }

    // ===== BUFFERS =====

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::Buffer);
        s.buffers.insert(raw, vec![0; desc.size as usize]);
        Ok(BufferHandle::from_raw(raw))
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut s = self.state();
        let contents = s
            .buffers
            .get_mut(&buffer.as_raw())
            .ok_or_else(|| Error::InvalidResource("unknown buffer".to_string()))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(Error::InvalidResource("write past end of buffer".to_string()));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Buffer, buffer.as_raw()) {
            s.buffers.remove(&buffer.as_raw());
        }
    }

    // ===== RENDER PASSES =====

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> Result<RenderPassHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::RenderPass);
        s.render_passes.insert(
            raw,
            (desc.attachments.len(), desc.subpasses.len(), desc.dependencies.len()),
        );
        Ok(RenderPassHandle::from_raw(raw))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        self.state().destroy(ObjectKind::RenderPass, render_pass.as_raw());
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let mut s = self.state();
        if !s.is_live(ObjectKind::RenderPass, render_pass.as_raw()) {
            return Err(Error::InvalidResource("framebuffer for unknown render pass".to_string()));
        }
        let raw = s.create(ObjectKind::Framebuffer);
        s.framebuffers.insert(raw, (attachments.to_vec(), extent));
        Ok(FramebufferHandle::from_raw(raw))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Framebuffer, framebuffer.as_raw()) {
            s.framebuffers.remove(&framebuffer.as_raw());
        }
    }

    // ===== PIPELINES =====

    fn create_shader_module(&self, code: &[u32]) -> Result<ShaderModuleHandle> {
        if code.is_empty() {
            return Err(Error::InvalidResource("empty SPIR-V".to_string()));
        }
        Ok(ShaderModuleHandle::from_raw(self.state().create(ObjectKind::ShaderModule)))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        self.state().destroy(ObjectKind::ShaderModule, module.as_raw());
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constants: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::PipelineLayout);
        s.pipeline_layouts
            .insert(raw, (set_layouts.to_vec(), push_constants.to_vec()));
        Ok(PipelineLayoutHandle::from_raw(raw))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::PipelineLayout, layout.as_raw()) {
            s.pipeline_layouts.remove(&layout.as_raw());
        }
    }

    fn create_graphics_pipeline(
        &self,
        stages: &[PipelineShaderStage],
        state: &PipelineState,
    ) -> Result<PipelineHandle> {
        let mut s = self.state();
        if s.fail_pipeline_creation {
            return Err(Error::BackendError("pipeline creation failed".to_string()));
        }
        for stage in stages {
            if !s.is_live(ObjectKind::ShaderModule, stage.module.as_raw()) {
                return Err(Error::InvalidResource("pipeline stage uses dead shader module".to_string()));
            }
        }
        let raw = s.create(ObjectKind::Pipeline);
        s.pipelines.insert(raw, (stages.to_vec(), state.clone()));
        Ok(PipelineHandle::from_raw(raw))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::Pipeline, pipeline.as_raw()) {
            s.pipelines.remove(&pipeline.as_raw());
        }
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorSetLayoutBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::DescriptorSetLayout);
        s.set_layouts.insert(raw, bindings.to_vec());
        Ok(DescriptorSetLayoutHandle::from_raw(raw))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::DescriptorSetLayout, layout.as_raw()) {
            s.set_layouts.remove(&layout.as_raw());
        }
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        _pool_sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::DescriptorPool);
        s.pools.insert(raw, MockPool { max_sets, sets: Vec::new() });
        Ok(DescriptorPoolHandle::from_raw(raw))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        let mut s = self.state();
        if s.destroy(ObjectKind::DescriptorPool, pool.as_raw()) {
            if let Some(pool) = s.pools.remove(&pool.as_raw()) {
                for raw in pool.sets {
                    s.live.remove(&raw);
                }
            }
        }
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        let mut s = self.state();
        if !s.is_live(ObjectKind::DescriptorSetLayout, layout.as_raw()) {
            return Err(Error::InvalidResource("unknown descriptor set layout".to_string()));
        }
        let (max_sets, used) = match s.pools.get(&pool.as_raw()) {
            Some(p) => (p.max_sets, p.sets.len() as u32),
            None => return Err(Error::InvalidResource("unknown descriptor pool".to_string())),
        };
        if used >= max_sets {
            return Err(Error::PoolExhausted { capacity: max_sets });
        }
        let raw = s.create(ObjectKind::DescriptorSet);
        if let Some(p) = s.pools.get_mut(&pool.as_raw()) {
            p.sets.push(raw);
        }
        Ok(DescriptorSetHandle::from_raw(raw))
    }

    fn update_descriptor_sets(&self, writes: &[DescriptorWrite]) {
        self.state().descriptor_updates.push(writes.to_vec());
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
