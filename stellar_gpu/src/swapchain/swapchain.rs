/// Swapchain - presentable image chain and the ring of frames in flight
///
/// Lifecycle: `setup` picks surface parameters, `create` builds the image
/// chain plus one frame per image against an externally owned render pass,
/// and each frame of the render loop runs
/// `prepare_frame` → record → `submit_frame` → `present_frame` → `end_frame`.
///
/// A stale or suboptimal surface is never reported as an error: the swapchain
/// recreates itself in place (keeping the same render pass) and the caller
/// just skips the frame when `prepare_frame` returns `None`.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, Extent2D, Format, GraphicsDevice, ImageUsage, PipelineStageFlags,
    PresentMode, PresentOutcome, RenderPassHandle, SubmitDesc, SurfaceCapabilities,
    SurfaceFormat, SwapchainDesc, SwapchainHandle,
};
use crate::log::Log;
use crate::platform::Platform;
use crate::swapchain::surface_selection::{
    choose_extent, choose_present_mode, choose_sharing_mode, choose_surface_format,
    compute_image_count,
};
use crate::swapchain::Frame;
use crate::target::{AttachmentDesc, RenderTarget, RenderTargetAttachment};
use crate::{engine_debug, engine_error, engine_fatal, engine_info, engine_require, engine_trace};

const SOURCE: &str = "stellar::Swapchain";

pub struct Swapchain {
    device: Arc<dyn GraphicsDevice>,
    log: Log,

    // Requested parameters
    preferred_format: SurfaceFormat,
    preferred_present_mode: PresentMode,
    depth_format: Format,

    // Chosen by setup()
    is_setup: bool,
    capabilities: Option<SurfaceCapabilities>,
    surface_format: SurfaceFormat,
    present_mode: PresentMode,
    extent: Extent2D,

    // Built by create()
    handle: SwapchainHandle,
    render_pass: RenderPassHandle,
    frames: Vec<Frame>,
    depth: Option<Arc<RenderTargetAttachment>>,
    current_frame: usize,

    recreate_count: u64,
}

impl Swapchain {
    /// Bind a swapchain to a device; nothing is created yet
    pub fn new(ctx: &Context, device: Arc<dyn GraphicsDevice>) -> Self {
        let config = ctx.config();
        Self {
            device,
            log: ctx.log().clone(),
            preferred_format: config.preferred_surface_format,
            preferred_present_mode: config.preferred_present_mode,
            depth_format: config.depth_format,
            is_setup: false,
            capabilities: None,
            surface_format: config.preferred_surface_format,
            present_mode: PresentMode::Fifo,
            extent: Extent2D::default(),
            handle: SwapchainHandle::NULL,
            render_pass: RenderPassHandle::NULL,
            frames: Vec::new(),
            depth: None,
            current_frame: 0,
            recreate_count: 0,
        }
    }

    // ===== LIFECYCLE =====

    /// Query the surface and choose format, present mode and extent
    pub fn setup(&mut self, platform: &dyn Platform) -> Result<()> {
        let capabilities = self.device.surface_capabilities()?;
        let formats = self.device.surface_formats()?;
        let present_modes = self.device.present_modes()?;

        self.surface_format = choose_surface_format(&formats, self.preferred_format)
            .ok_or_else(|| {
                engine_error!(self.log, SOURCE, "Surface reports no supported formats");
                Error::InitializationFailed("Surface reports no supported formats".to_string())
            })?;
        self.present_mode = choose_present_mode(&present_modes, self.preferred_present_mode);
        self.extent = choose_extent(&capabilities, platform.extent());
        self.capabilities = Some(capabilities);
        self.is_setup = true;

        engine_debug!(self.log, SOURCE,
            "Surface: {:?}/{:?}, {:?}, {}x{}",
            self.surface_format.format, self.surface_format.color_space,
            self.present_mode, self.extent.width, self.extent.height);
        Ok(())
    }

    /// Build the image chain and one frame per image
    ///
    /// Each frame's render target holds `[color (swapchain image), depth]`,
    /// the depth attachment being shared by every frame.
    pub fn create(&mut self, render_pass: RenderPassHandle) -> Result<()> {
        engine_require!(self.log, SOURCE, self.is_setup, "Swapchain::create() called before setup()");
        engine_require!(self.log, SOURCE, self.handle.is_null(), "Swapchain already created");
        engine_require!(self.log, SOURCE, !render_pass.is_null(), "Swapchain::create() needs a render pass");
        let capabilities = match self.capabilities {
            Some(capabilities) => capabilities,
            None => return Err(Error::PreconditionViolated("Surface capabilities missing".to_string())),
        };

        let desc = SwapchainDesc {
            min_image_count: compute_image_count(&capabilities),
            surface_format: self.surface_format,
            present_mode: self.present_mode,
            extent: self.extent,
            image_usage: ImageUsage::COLOR_ATTACHMENT,
            sharing_mode: choose_sharing_mode(self.device.queue_families()),
        };
        self.handle = self.device.create_swapchain(&desc)?;
        self.render_pass = render_pass;

        if let Err(e) = self.create_frames() {
            self.teardown();
            return Err(e);
        }
        self.current_frame = 0;

        engine_info!(self.log, SOURCE,
            "Swapchain created: {} frames, {}x{}",
            self.frames.len(), self.extent.width, self.extent.height);
        Ok(())
    }

    fn create_frames(&mut self) -> Result<()> {
        let images = self.device.swapchain_images(self.handle)?;
        let depth = Arc::new(RenderTargetAttachment::allocate(
            self.device.clone(),
            &AttachmentDesc::depth(self.extent, self.depth_format),
        )?);

        let mut frames = Vec::with_capacity(images.len());
        for image in images {
            let color = Arc::new(RenderTargetAttachment::borrow_image(
                self.device.clone(),
                image,
                self.surface_format.format,
                self.extent,
            )?);
            let mut target = RenderTarget::new(self.device.clone(), self.log.clone(), self.extent);
            target.add_attachment(color);
            target.add_attachment(depth.clone());
            target.build(self.render_pass)?;
            frames.push(Frame::new(self.device.clone(), target)?);
        }

        self.frames = frames;
        self.depth = Some(depth);
        Ok(())
    }

    // ===== FRAME LOOP =====

    /// Wait for the current frame slot, acquire an image and begin recording
    ///
    /// Returns `None` when the surface was stale: the swapchain has been
    /// recreated and the caller must skip this frame.
    pub fn prepare_frame(&mut self, platform: &mut dyn Platform) -> Result<Option<u32>> {
        engine_require!(self.log, SOURCE, !self.frames.is_empty(),
            "prepare_frame() called on a swapchain without frames");

        let frame = &self.frames[self.current_frame];
        let fence = frame.in_flight();
        let image_available = frame.image_available();
        let command_buffer = frame.command_buffer();

        self.device.wait_for_fence(fence, u64::MAX)
            .map_err(|e| engine_fatal!(self.log, SOURCE, "Failed to wait for frame fence: {}", e))?;

        let image_index = match self.device.acquire_next_image(self.handle, image_available, u64::MAX) {
            Ok(AcquireOutcome::Acquired { image_index, suboptimal }) => {
                if suboptimal {
                    engine_trace!(self.log, SOURCE, "Acquired suboptimal image {}", image_index);
                }
                image_index
            }
            Ok(AcquireOutcome::OutOfDate) => {
                engine_debug!(self.log, SOURCE, "Surface out of date on acquire, recreating");
                self.recreate(platform)?;
                return Ok(None);
            }
            Err(e) => {
                return Err(engine_fatal!(self.log, SOURCE, "Failed to acquire swapchain image: {}", e));
            }
        };

        // Only reset once work is guaranteed to be submitted, or the fence
        // stays unsignaled when the frame is skipped
        self.device.reset_fence(fence)
            .map_err(|e| engine_fatal!(self.log, SOURCE, "Failed to reset frame fence: {}", e))?;
        self.device.reset_command_buffer(command_buffer)?;
        self.device.begin_command_buffer(command_buffer)?;
        Ok(Some(image_index))
    }

    /// End recording and submit the current frame's command buffer
    pub fn submit_frame(&mut self) -> Result<()> {
        engine_require!(self.log, SOURCE, !self.frames.is_empty(),
            "submit_frame() called on a swapchain without frames");

        let frame = &self.frames[self.current_frame];
        self.device.end_command_buffer(frame.command_buffer())
            .map_err(|e| engine_fatal!(self.log, SOURCE, "Failed to end command buffer: {}", e))?;

        let submit = SubmitDesc {
            command_buffer: frame.command_buffer(),
            wait_semaphore: frame.image_available(),
            wait_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: frame.render_finished(),
            fence: frame.in_flight(),
        };
        self.device.queue_submit(&submit)
            .map_err(|e| engine_fatal!(self.log, SOURCE, "Failed to submit frame: {}", e))
    }

    /// Present `image_index`, recreating the swapchain if the surface went stale
    pub fn present_frame(&mut self, platform: &mut dyn Platform, image_index: u32) -> Result<()> {
        engine_require!(self.log, SOURCE, (image_index as usize) < self.frames.len(),
            "Image index {} out of range ({} images)", image_index, self.frames.len());

        let wait = self.frames[self.current_frame].render_finished();
        match self.device.queue_present(self.handle, image_index, wait) {
            Ok(PresentOutcome::Presented) => Ok(()),
            Ok(outcome) => {
                engine_debug!(self.log, SOURCE, "Present returned {:?}, recreating", outcome);
                self.recreate(platform)
            }
            Err(e) => Err(engine_fatal!(self.log, SOURCE, "Failed to present image {}: {}", image_index, e)),
        }
    }

    /// Advance to the next frame slot
    pub fn end_frame(&mut self) {
        if self.frames.is_empty() {
            self.current_frame = 0;
        } else {
            self.current_frame = (self.current_frame + 1) % self.frames.len();
        }
    }

    /// Rebuild the image chain and frames for the current surface
    ///
    /// Blocks while the window is minimized (zero extent), polling the
    /// platform. If the window is closed during that wait, nothing is rebuilt.
    /// The frame cursor is kept (wrapped to the new frame count), so an
    /// `end_frame` following a present-triggered recreation still advances
    /// it by one.
    pub fn recreate(&mut self, platform: &mut dyn Platform) -> Result<()> {
        let mut extent = platform.extent();
        while extent.is_zero() {
            if platform.should_close() {
                engine_info!(self.log, SOURCE, "Window closed while minimized, skipping recreation");
                return Ok(());
            }
            platform.poll_events();
            extent = platform.extent();
        }

        self.device.wait_idle()
            .map_err(|e| engine_fatal!(self.log, SOURCE, "Failed to wait for device idle: {}", e))?;

        let render_pass = self.render_pass;
        let cursor = self.current_frame;
        self.teardown();
        self.setup(&*platform)?;
        self.create(render_pass)?;
        if !self.frames.is_empty() {
            self.current_frame = cursor % self.frames.len();
        }
        self.recreate_count += 1;
        Ok(())
    }

    /// Wait for the device, then destroy frames and the image chain
    pub fn cleanup(&mut self) {
        if self.frames.is_empty() && self.handle.is_null() && self.depth.is_none() {
            return;
        }
        if let Err(e) = self.device.wait_idle() {
            engine_error!(self.log, SOURCE, "wait_idle failed during cleanup: {}", e);
        }
        self.teardown();
    }

    // Frames (framebuffers, views, sync objects) before the swapchain itself
    fn teardown(&mut self) {
        self.frames.clear();
        self.depth = None;
        if !self.handle.is_null() {
            self.device.destroy_swapchain(self.handle);
            self.handle = SwapchainHandle::NULL;
        }
        self.current_frame = 0;
    }

    // ===== ACCESSORS =====

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.current_frame)
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Render target wrapping presentable image `image_index`
    pub fn render_target(&self, image_index: u32) -> Option<&RenderTarget> {
        self.frames.get(image_index as usize).map(|f| f.render_target())
    }

    pub fn depth_attachment(&self) -> Option<&Arc<RenderTargetAttachment>> {
        self.depth.as_ref()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    pub fn handle(&self) -> SwapchainHandle {
        self.handle
    }

    /// Number of successful recreations since creation
    pub fn recreate_count(&self) -> u64 {
        self.recreate_count
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.cleanup();
    }
}
