/// Renderer - owns the device handle, swapchain, render passes and caches
///
/// This is the explicit context object every GPU-facing subsystem hangs off.
/// It registers the "Main" pass against the swapchain surface format at
/// construction, wraps the swapchain frame loop, and tears everything down in
/// dependency order on `shutdown` (or drop).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use stellar_gpu::{Config, Context, Platform, Renderer, WinitPlatform};
/// use stellar_gpu_vulkan::VulkanGraphicsDevice;
///
/// let ctx = Context::new(Config::default());
/// let mut platform = WinitPlatform::new("demo", 1280, 720);
/// platform.initialize()?;
/// let device = Arc::new(VulkanGraphicsDevice::new(&ctx, &platform)?);
/// let mut renderer = Renderer::new(&ctx, device, &platform)?;
///
/// while !platform.should_close() {
///     platform.poll_events();
///     if let Some(frame) = renderer.begin_frame(&mut platform)? {
///         renderer.begin_main_pass(&frame);
///         // record draws here
///         renderer.end_main_pass(&frame);
///         renderer.end_frame(&mut platform, frame)?;
///     }
/// }
/// renderer.shutdown();
/// # Ok::<(), stellar_gpu::Error>(())
/// ```

use std::sync::Arc;

use crate::cache::{
    DescriptorSetLayoutCache, DescriptorSetManager, PipelineCache, PipelineLayoutCache,
};
use crate::context::Context;
use crate::error::Result;
use crate::graphics_device::{
    ClearValue, CommandBufferHandle, Extent2D, FramebufferHandle, GraphicsDevice,
    RenderPassBeginDesc, RenderPassHandle, Rect2D, Viewport,
};
use crate::log::Log;
use crate::material::Material;
use crate::platform::Platform;
use crate::render_pass::{RenderPasses, RenderpassDescription, MAIN_PASS};
use crate::swapchain::Swapchain;
use crate::{engine_error, engine_info, engine_violation};

const SOURCE: &str = "stellar::Renderer";

/// What renderer-specific code needs to record one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    /// Acquired swapchain image
    pub image_index: u32,
    /// Command buffer of the current frame slot, already recording
    pub command_buffer: CommandBufferHandle,
    /// Framebuffer of the acquired image
    pub framebuffer: FramebufferHandle,
    pub extent: Extent2D,
}

pub struct Renderer {
    device: Arc<dyn GraphicsDevice>,
    log: Log,
    swapchain: Swapchain,
    render_passes: RenderPasses,
    pipeline_cache: PipelineCache,
    pipeline_layout_cache: PipelineLayoutCache,
    descriptor_set_layout_cache: DescriptorSetLayoutCache,
    descriptor_sets: DescriptorSetManager,
    clear_color: [f32; 4],
    is_shutdown: bool,
}

impl Renderer {
    /// Set up the swapchain, register the main pass and create the caches
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>, platform: &dyn Platform) -> Result<Self> {
        let log = ctx.log().clone();

        let mut swapchain = Swapchain::new(ctx, device.clone());
        swapchain.setup(platform)?;

        let mut render_passes = RenderPasses::new(ctx, device.clone());
        let main = render_passes.register(RenderpassDescription::main(
            swapchain.surface_format().format,
            ctx.config().depth_format,
        ))?;
        swapchain.create(main)?;

        let descriptor_sets = DescriptorSetManager::new(ctx, device.clone())?;

        let extent = swapchain.extent();
        engine_info!(log, SOURCE,
            "Renderer ready: {}x{}, {} frames in flight, {:?}",
            extent.width, extent.height, swapchain.frame_count(), swapchain.present_mode());

        Ok(Self {
            pipeline_cache: PipelineCache::new(ctx, device.clone()),
            pipeline_layout_cache: PipelineLayoutCache::new(ctx, device.clone()),
            descriptor_set_layout_cache: DescriptorSetLayoutCache::new(ctx, device.clone()),
            descriptor_sets,
            device,
            log,
            swapchain,
            render_passes,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            is_shutdown: false,
        })
    }

    /// Register an additional render pass (built if not yet built)
    pub fn register_render_pass(&mut self, desc: RenderpassDescription) -> Result<RenderPassHandle> {
        self.render_passes.register(desc)
    }

    // ===== FRAME LOOP =====

    /// Acquire the next image and start recording
    ///
    /// `None` means the surface was recreated and this frame must be skipped.
    pub fn begin_frame(&mut self, platform: &mut dyn Platform) -> Result<Option<FrameContext>> {
        let Some(image_index) = self.swapchain.prepare_frame(platform)? else {
            return Ok(None);
        };
        let command_buffer = self
            .swapchain
            .current_frame()
            .map(|frame| frame.command_buffer())
            .ok_or_else(|| engine_violation!(self.log, SOURCE, "No current frame"))?;
        let framebuffer = self
            .swapchain
            .render_target(image_index)
            .and_then(|target| target.framebuffer())
            .ok_or_else(|| {
                engine_violation!(self.log, SOURCE, "Image {} has no framebuffer", image_index)
            })?;

        Ok(Some(FrameContext {
            image_index,
            command_buffer,
            framebuffer,
            extent: self.swapchain.extent(),
        }))
    }

    /// Begin the main pass on the acquired image, with full-extent
    /// viewport and scissor
    pub fn begin_main_pass(&self, frame: &FrameContext) {
        let clear_values = [
            ClearValue::Color(self.clear_color),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ];
        self.device.cmd_begin_render_pass(
            frame.command_buffer,
            &RenderPassBeginDesc {
                render_pass: self.swapchain.render_pass(),
                framebuffer: frame.framebuffer,
                render_area: Rect2D::from_extent(frame.extent),
                clear_values: &clear_values,
            },
        );
        self.device.cmd_set_viewport(frame.command_buffer, &Viewport::from_extent(frame.extent));
        self.device.cmd_set_scissor(frame.command_buffer, &Rect2D::from_extent(frame.extent));
    }

    pub fn end_main_pass(&self, frame: &FrameContext) {
        self.device.cmd_end_render_pass(frame.command_buffer);
    }

    /// Bind the pipeline `material` uses for `pass`
    pub fn bind_material(&self, frame: &FrameContext, material: &Material, pass: &str) -> Result<()> {
        let pipeline = material
            .pipeline(pass)
            .and_then(|p| self.pipeline_cache.get(p.config()))
            .map(|data| data.pipeline)
            .ok_or_else(|| {
                engine_violation!(self.log, SOURCE,
                    "Material '{}' has no pipeline for pass '{}'", material.name(), pass)
            })?;
        self.device.cmd_bind_pipeline(frame.command_buffer, pipeline);
        Ok(())
    }

    /// Submit, present and advance to the next frame slot
    pub fn end_frame(&mut self, platform: &mut dyn Platform, frame: FrameContext) -> Result<()> {
        self.swapchain.submit_frame()?;
        self.swapchain.present_frame(platform, frame.image_index)?;
        self.swapchain.end_frame();
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn render_passes(&self) -> &RenderPasses {
        &self.render_passes
    }

    pub fn render_passes_mut(&mut self) -> &mut RenderPasses {
        &mut self.render_passes
    }

    /// Handle of the swapchain pass
    pub fn main_render_pass(&self) -> Option<RenderPassHandle> {
        self.render_passes.handle(MAIN_PASS)
    }

    pub fn pipeline_cache(&self) -> &PipelineCache {
        &self.pipeline_cache
    }

    pub fn pipeline_cache_mut(&mut self) -> &mut PipelineCache {
        &mut self.pipeline_cache
    }

    pub fn pipeline_layout_cache(&self) -> &PipelineLayoutCache {
        &self.pipeline_layout_cache
    }

    pub fn pipeline_layout_cache_mut(&mut self) -> &mut PipelineLayoutCache {
        &mut self.pipeline_layout_cache
    }

    pub fn descriptor_set_layout_cache(&self) -> &DescriptorSetLayoutCache {
        &self.descriptor_set_layout_cache
    }

    pub fn descriptor_set_layout_cache_mut(&mut self) -> &mut DescriptorSetLayoutCache {
        &mut self.descriptor_set_layout_cache
    }

    pub fn descriptor_sets(&self) -> &DescriptorSetManager {
        &self.descriptor_sets
    }

    pub fn descriptor_sets_mut(&mut self) -> &mut DescriptorSetManager {
        &mut self.descriptor_sets
    }

    /// Disjoint borrows needed by `Material::reload`
    pub fn material_caches(&mut self) -> (&RenderPasses, &mut PipelineLayoutCache, &mut PipelineCache) {
        (&self.render_passes, &mut self.pipeline_layout_cache, &mut self.pipeline_cache)
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    // ===== SHUTDOWN =====

    /// Destroy every GPU object in reverse construction order
    ///
    /// Frames and render targets go first, then the swapchain, the pipeline,
    /// layout and set-layout caches, the descriptor pool and finally the
    /// render passes. The device itself goes when its last `Arc` is dropped.
    pub fn shutdown(&mut self) {
        if self.is_shutdown {
            return;
        }
        if let Err(e) = self.device.wait_idle() {
            engine_error!(self.log, SOURCE, "wait_idle failed during shutdown: {}", e);
        }
        self.swapchain.cleanup();
        self.pipeline_cache.cleanup();
        self.pipeline_layout_cache.cleanup();
        self.descriptor_set_layout_cache.cleanup();
        self.descriptor_sets.cleanup();
        self.render_passes.cleanup();
        self.is_shutdown = true;
        engine_info!(self.log, SOURCE, "Renderer shut down");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
