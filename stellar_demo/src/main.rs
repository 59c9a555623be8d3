//! Stellar demo - clears the window every frame and, when given a compiled
//! SPIR-V shader, draws a triangle with a material built from its reflection.
//!
//! Usage: stellar_demo [shader.spv]
//!
//! The shader must expose `main` entry points for the vertex and fragment
//! stages and consume `stellar_gpu::material::Vertex`. An optional uniform
//! block at set 0, binding 0 receives a 4x4 transform.

use std::path::PathBuf;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use stellar_gpu::graphics_device::{
    BufferDesc, BufferHandle, BufferUsage, DescriptorSetHandle, DescriptorType, DescriptorUpdate,
    GraphicsDevice,
};
use stellar_gpu::material::{Material, ResourceKind, Vertex};
use stellar_gpu::render_pass::MAIN_PASS;
use stellar_gpu::{
    engine_info, engine_warn, Config, Context, DebugSeverity, FrameContext, Platform, Renderer,
    Result, WinitPlatform,
};
use stellar_gpu_vulkan::{reflect_spirv_file, VulkanGraphicsDevice};

const SOURCE: &str = "stellar::demo";

/// GPU objects needed to draw the triangle
struct Scene {
    material: Material,
    vertex_buffer: BufferHandle,
    uniform_buffer: Option<BufferHandle>,
    descriptor_set: Option<DescriptorSetHandle>,
}

fn triangle() -> [Vertex; 3] {
    let vertex = |x: f32, y: f32, u: f32, v: f32| Vertex {
        position: Vec3::new(x, y, 0.0),
        normal: Vec3::Z,
        uv: Vec2::new(u, v),
        tangent: Vec3::X,
        bitangent: Vec3::Y,
    };
    [
        vertex(0.0, -0.5, 0.5, 0.0),
        vertex(0.5, 0.5, 1.0, 1.0),
        vertex(-0.5, 0.5, 0.0, 1.0),
    ]
}

fn load_scene(ctx: &Context, renderer: &mut Renderer, shader: PathBuf) -> Result<Scene> {
    let reflection = reflect_spirv_file(&shader)?;
    let has_transform = reflection
        .resources
        .iter()
        .any(|r| r.set == 0 && r.binding == 0 && r.kind == ResourceKind::ConstantBuffer);

    let mut material = Material::new(ctx, "demo", reflection)
        .with_shader(shader)
        .with_pass(MAIN_PASS);
    let set_layouts = material
        .create_descriptor_set_layouts(renderer.descriptor_set_layout_cache_mut())?
        .to_vec();
    material.reload(renderer)?;

    let device = renderer.device().clone();
    let vertices = triangle();
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let vertex_buffer = device.create_buffer(&BufferDesc {
        size: vertex_bytes.len() as u64,
        usage: BufferUsage::VERTEX,
    })?;
    device.write_buffer(vertex_buffer, 0, vertex_bytes)?;

    let (uniform_buffer, descriptor_set) = match set_layouts.first() {
        Some(&layout) if has_transform => {
            let transform = Mat4::IDENTITY;
            let size = std::mem::size_of::<Mat4>() as u64;
            let buffer = device.create_buffer(&BufferDesc { size, usage: BufferUsage::UNIFORM })?;
            device.write_buffer(buffer, 0, bytemuck::bytes_of(&transform))?;

            let set = renderer.descriptor_sets_mut().allocate_named("demo_transform", layout)?;
            renderer.descriptor_sets().update(
                set,
                DescriptorUpdate::buffer(0, DescriptorType::UniformBuffer, buffer, 0, size),
            )?;
            (Some(buffer), Some(set))
        }
        _ => (None, None),
    };

    engine_info!(ctx.log(), SOURCE,
        "Material '{}' ready: {} descriptor set layouts",
        material.name(), set_layouts.len());
    Ok(Scene { material, vertex_buffer, uniform_buffer, descriptor_set })
}

fn draw(renderer: &Renderer, frame: &FrameContext, scene: &Scene) -> Result<()> {
    let device = renderer.device();
    renderer.bind_material(frame, &scene.material, MAIN_PASS)?;
    if let (Some(set), Some(pipeline)) = (scene.descriptor_set, scene.material.pipeline(MAIN_PASS)) {
        device.cmd_bind_descriptor_sets(frame.command_buffer, pipeline.layout(), 0, &[set]);
    }
    device.cmd_bind_vertex_buffer(frame.command_buffer, scene.vertex_buffer, 0);
    device.cmd_draw(frame.command_buffer, 3, 1, 0, 0);
    Ok(())
}

fn release_scene(device: &Arc<dyn GraphicsDevice>, scene: Scene) {
    device.destroy_buffer(scene.vertex_buffer);
    if let Some(buffer) = scene.uniform_buffer {
        device.destroy_buffer(buffer);
    }
}

fn main() -> Result<()> {
    let config = Config {
        app_name: "Stellar Demo".to_string(),
        enable_validation: cfg!(feature = "vulkan-validation"),
        debug_severity: DebugSeverity::ErrorsAndWarnings,
        ..Config::default()
    };
    let ctx = Context::new(config);

    let mut platform = WinitPlatform::new("Stellar Demo", 1280, 720);
    platform.initialize()?;

    let device = Arc::new(VulkanGraphicsDevice::new(&ctx, &platform)?);
    let mut renderer = Renderer::new(&ctx, device.clone(), &platform)?;
    renderer.set_clear_color([0.05, 0.05, 0.1, 1.0]);

    let scene = match std::env::args().nth(1) {
        Some(path) => Some(load_scene(&ctx, &mut renderer, PathBuf::from(path))?),
        None => {
            engine_warn!(ctx.log(), SOURCE, "No shader given, only clearing the window");
            None
        }
    };

    let mut frames: u64 = 0;
    while !platform.should_close() {
        platform.poll_events();
        let Some(frame) = renderer.begin_frame(&mut platform)? else {
            continue;
        };
        renderer.begin_main_pass(&frame);
        if let Some(scene) = &scene {
            draw(&renderer, &frame, scene)?;
        }
        renderer.end_main_pass(&frame);
        renderer.end_frame(&mut platform, frame)?;
        frames += 1;
    }

    engine_info!(ctx.log(), SOURCE,
        "{} frames, {} swapchain recreations", frames, renderer.swapchain().recreate_count());

    if let Some(scene) = scene {
        device.wait_idle()?;
        release_scene(renderer.device(), scene);
    }
    renderer.shutdown();

    #[cfg(feature = "vulkan-validation")]
    device.print_validation_stats_report();

    Ok(())
}
