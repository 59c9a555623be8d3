//! Unit tests for MockGraphicsDevice
//!
//! The mock backs every other unit test, so its bookkeeping is checked here.

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, ObjectKind};
use crate::graphics_device::*;

fn swapchain_desc(count: u32) -> SwapchainDesc {
    SwapchainDesc {
        min_image_count: count,
        surface_format: SurfaceFormat {
            format: Format::B8G8R8A8_SRGB,
            color_space: ColorSpace::SrgbNonlinear,
        },
        present_mode: PresentMode::Fifo,
        extent: Extent2D::new(800, 600),
        image_usage: ImageUsage::COLOR_ATTACHMENT,
        sharing_mode: SharingMode::Exclusive,
    }
}

// ============================================================================
// OBJECT TRACKING
// ============================================================================

#[test]
fn test_mock_handles_are_unique_and_non_null() {
    let device = MockGraphicsDevice::new();
    let a = device.create_semaphore().unwrap();
    let b = device.create_semaphore().unwrap();
    assert!(!a.is_null());
    assert_ne!(a, b);
    assert_eq!(device.live_count(ObjectKind::Semaphore), 2);
}

#[test]
fn test_mock_double_destroy_is_recorded() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    device.destroy_fence(fence);
    device.destroy_fence(fence);
    assert_eq!(device.destroyed_count(ObjectKind::Fence), 1);
    assert_eq!(device.invalid_destroys(), vec![(ObjectKind::Fence, fence.as_raw())]);
}

#[test]
fn test_mock_destroy_null_is_noop() {
    let device = MockGraphicsDevice::new();
    device.destroy_image_view(ImageViewHandle::NULL);
    assert!(device.invalid_destroys().is_empty());
}

#[test]
fn test_mock_swapchain_images_cannot_be_destroyed_individually() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(&swapchain_desc(3)).unwrap();
    let images = device.swapchain_images(swapchain).unwrap();
    assert_eq!(images.len(), 3);

    device.destroy_image(images[0]);
    assert_eq!(device.invalid_destroys().len(), 1);

    device.destroy_swapchain(swapchain);
    assert_eq!(device.live_count(ObjectKind::SwapchainImage), 0);
}

// ============================================================================
// FRAME LOOP SCRIPTING
// ============================================================================

#[test]
fn test_mock_acquire_cycles_images_by_default() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(&swapchain_desc(2)).unwrap();
    let semaphore = device.create_semaphore().unwrap();

    let indices: Vec<u32> = (0..4)
        .map(|_| match device.acquire_next_image(swapchain, semaphore, u64::MAX).unwrap() {
            AcquireOutcome::Acquired { image_index, .. } => image_index,
            AcquireOutcome::OutOfDate => panic!("unexpected out-of-date"),
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 0, 1]);
}

#[test]
fn test_mock_acquire_script_takes_precedence() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(&swapchain_desc(2)).unwrap();
    let semaphore = device.create_semaphore().unwrap();
    device.state().acquire_script.push_back(AcquireOutcome::OutOfDate);

    assert_eq!(
        device.acquire_next_image(swapchain, semaphore, 0).unwrap(),
        AcquireOutcome::OutOfDate
    );
}

#[test]
fn test_mock_fence_wait_semantics() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    assert!(device.wait_for_fence(fence, u64::MAX).is_ok());

    device.reset_fence(fence).unwrap();
    assert!(device.wait_for_fence(fence, u64::MAX).unwrap_err().is_fatal());

    let cmd = device.allocate_command_buffer().unwrap();
    let semaphore = device.create_semaphore().unwrap();
    device
        .queue_submit(&SubmitDesc {
            command_buffer: cmd,
            wait_semaphore: semaphore,
            wait_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: semaphore,
            fence,
        })
        .unwrap();
    assert!(device.wait_for_fence(fence, u64::MAX).is_ok());
}

// ============================================================================
// DESCRIPTORS / BUFFERS
// ============================================================================

#[test]
fn test_mock_pool_exhaustion() {
    let device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&[]).unwrap();
    let pool = device.create_descriptor_pool(2, &[]).unwrap();

    device.allocate_descriptor_set(pool, layout).unwrap();
    device.allocate_descriptor_set(pool, layout).unwrap();
    assert_eq!(
        device.allocate_descriptor_set(pool, layout),
        Err(Error::PoolExhausted { capacity: 2 })
    );

    device.destroy_descriptor_pool(pool);
    assert_eq!(device.live_count(ObjectKind::DescriptorSet), 0);
}

#[test]
fn test_mock_buffer_write_bounds() {
    let device = MockGraphicsDevice::new();
    let buffer = device
        .create_buffer(&BufferDesc { size: 8, usage: BufferUsage::UNIFORM })
        .unwrap();
    assert!(device.write_buffer(buffer, 4, &[1, 2, 3, 4]).is_ok());
    assert!(device.write_buffer(buffer, 6, &[1, 2, 3, 4]).is_err());
    assert_eq!(device.state().buffers[&buffer.as_raw()], vec![0, 0, 0, 0, 1, 2, 3, 4]);
}
