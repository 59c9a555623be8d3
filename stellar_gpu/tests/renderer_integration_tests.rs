//! Integration tests for Renderer with the real Vulkan backend
//!
//! All tests require a GPU and a display, and are marked with #[ignore].
//!
//! Run with: cargo test -p stellar_gpu --test renderer_integration_tests -- --ignored


use stellar_gpu::graphics_device::{BufferDesc, BufferUsage, DescriptorType, DescriptorUpdate, Format, ShaderStage};
use stellar_gpu::material::{EntryPoint, Material, ResourceKind, ShaderReflection, ShaderResource};
use stellar_gpu::render_pass::{RenderpassDescription, MAIN_PASS};
use stellar_gpu::Renderer;

use gpu_test_utils::{test_context, test_device, SurfacePlatform};
use serial_test::serial;

fn lit_reflection() -> ShaderReflection {
    ShaderReflection::new()
        .with_resource(ShaderResource::new("camera", 0, 0, ResourceKind::ConstantBuffer))
        .with_resource(ShaderResource::new("albedo", 1, 0, ResourceKind::Texture))
        .with_entry_point(EntryPoint::new("main", ShaderStage::Vertex))
        .with_entry_point(EntryPoint::new("main", ShaderStage::Fragment))
}

// ============================================================================
// CONSTRUCTION TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_renderer_creation_registers_main_pass() {
    let ctx = test_context();
    let platform = SurfacePlatform::new();

    let mut renderer = Renderer::new(&ctx, test_device(), &platform).unwrap();

    assert!(renderer.render_passes().contains(MAIN_PASS));
    assert!(!renderer.main_render_pass().unwrap().is_null());
    assert!(renderer.swapchain().frame_count() >= 1);
    assert!(!renderer.swapchain().extent().is_zero());

    renderer.shutdown();
    assert!(renderer.is_shutdown());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_renderer_registers_depth_only_pass() {
    let ctx = test_context();
    let platform = SurfacePlatform::new();
    let mut renderer = Renderer::new(&ctx, test_device(), &platform).unwrap();

    let handle = renderer
        .register_render_pass(RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT))
        .unwrap();

    assert!(!handle.is_null());
    assert_eq!(renderer.render_passes().handle("Shadow"), Some(handle));
    assert_eq!(renderer.render_passes().len(), 2);
}

// ============================================================================
// FRAME LOOP TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_renderer_presents_frames() {
    let ctx = test_context();
    let mut platform = SurfacePlatform::new();
    let mut renderer = Renderer::new(&ctx, test_device(), &platform).unwrap();
    renderer.set_clear_color([0.1, 0.2, 0.3, 1.0]);

    let mut presented = 0;
    for _ in 0..8 {
        if let Some(frame) = renderer.begin_frame(&mut platform).unwrap() {
            renderer.begin_main_pass(&frame);
            renderer.end_main_pass(&frame);
            renderer.end_frame(&mut platform, frame).unwrap();
            presented += 1;
        }
    }

    assert!(presented > 0);
    renderer.shutdown();
}

// ============================================================================
// MATERIAL / DESCRIPTOR TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_material_layouts_and_descriptor_sets() {
    let ctx = test_context();
    let platform = SurfacePlatform::new();
    let mut renderer = Renderer::new(&ctx, test_device(), &platform).unwrap();

    let mut material = Material::new(&ctx, "lit", lit_reflection());
    let layouts = material
        .create_descriptor_set_layouts(renderer.descriptor_set_layout_cache_mut())
        .unwrap()
        .to_vec();
    assert_eq!(layouts.len(), 2);
    assert!(renderer.descriptor_set_layout_cache().contains("lit_set0"));
    assert!(renderer.descriptor_set_layout_cache().contains("lit_set1"));

    let buffer = renderer
        .device()
        .create_buffer(&BufferDesc { size: 64, usage: BufferUsage::UNIFORM })
        .unwrap();
    renderer.device().write_buffer(buffer, 0, bytemuck::cast_slice(&[1.0f32; 16])).unwrap();

    let set = renderer.descriptor_sets_mut().allocate_named("camera", layouts[0]).unwrap();
    renderer
        .descriptor_sets()
        .update_named(
            "camera",
            DescriptorUpdate::buffer(0, DescriptorType::UniformBuffer, buffer, 0, 64),
        )
        .unwrap();
    assert_eq!(renderer.descriptor_sets().get("camera"), Some(set));

    renderer.shutdown();
    renderer.device().destroy_buffer(buffer);
}
