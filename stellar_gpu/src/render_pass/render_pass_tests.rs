//! Unit tests for Subpass, RenderpassDescription and RenderPasses

use crate::cache::PipelineConfig;
use crate::config::Config;
use crate::context::Context;
use crate::graphics_device::mock_graphics_device::{mock_device, ObjectKind};
use crate::graphics_device::{
    AccessFlags, AttachmentDescription, Format, ImageLayout, PipelineStageFlags, StoreOp,
    SubpassDependency, SubpassIndex,
};
use crate::log::capture::capture_log;
use crate::render_pass::{RenderPasses, RenderpassDescription, Subpass, MAIN_PASS};

fn dependency(src: SubpassIndex, dst: SubpassIndex) -> SubpassDependency {
    SubpassDependency {
        src_subpass: src,
        dst_subpass: dst,
        src_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
        src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
        dst_access: AccessFlags::SHADER_READ,
        by_region: true,
    }
}

// ============================================================================
// SUBPASS TESTS
// ============================================================================

#[test]
fn test_subpass_builder() {
    let subpass = Subpass::graphics().with_color(0).with_color(1).with_depth(2);
    assert_eq!(subpass.color_attachments.len(), 2);
    assert_eq!(subpass.color_attachments[1].layout, ImageLayout::ColorAttachment);
    assert_eq!(subpass.depth_attachment.unwrap().attachment, 2);
    assert!(!subpass.depth_only);
    assert_eq!(subpass.referenced_attachments().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_depth_only_subpass() {
    let subpass = Subpass::depth_only(0);
    assert!(subpass.depth_only);
    assert!(subpass.color_attachments.is_empty());
    assert_eq!(
        subpass.depth_attachment.unwrap().layout,
        ImageLayout::DepthStencilAttachment
    );
}

// ============================================================================
// DESCRIPTION BUILD TESTS
// ============================================================================

#[test]
fn test_main_preset_builds_one_render_pass() {
    let (mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::main(Format::B8G8R8A8_SRGB, Format::D32_SFLOAT);

    let handle = desc.build(device.as_ref(), &log).unwrap();
    assert_eq!(desc.name(), MAIN_PASS);
    assert_eq!(desc.handle(), handle);
    assert_eq!(mock.state().render_passes[&handle.as_raw()], (2, 1, 1));
    assert_eq!(desc.attachments()[0].final_layout, ImageLayout::PresentSrc);
}

#[test]
fn test_depth_only_preset_stores_depth() {
    let (mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT);

    let handle = desc.build(device.as_ref(), &log).unwrap();
    assert_eq!(desc.attachments()[0].store_op, StoreOp::Store);
    assert_eq!(mock.state().render_passes[&handle.as_raw()], (1, 1, 2));
}

#[test]
fn test_build_twice_is_precondition_violation() {
    let (_mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::main(Format::B8G8R8A8_SRGB, Format::D32_SFLOAT);
    desc.build(device.as_ref(), &log).unwrap();
    assert!(desc.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());

    desc.destroy(device.as_ref());
    assert!(!desc.is_built());
    desc.build(device.as_ref(), &log).unwrap();
}

#[test]
fn test_out_of_range_attachment_rejected() {
    let (mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::new("Broken");
    desc.add_attachment(AttachmentDescription::color(Format::R8G8B8A8_UNORM, ImageLayout::ShaderReadOnly));
    desc.add_subpass(Subpass::graphics().with_color(3));

    assert!(desc.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());
    assert_eq!(mock.created_count(ObjectKind::RenderPass), 0);
}

#[test]
fn test_depth_format_as_color_rejected() {
    let (_mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::new("Broken");
    let depth = desc.add_attachment(AttachmentDescription::depth(
        Format::D32_SFLOAT,
        StoreOp::Store,
        ImageLayout::DepthStencilReadOnly,
    ));
    desc.add_subpass(Subpass::graphics().with_color(depth));
    assert!(desc.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());
}

#[test]
fn test_colorless_subpass_must_be_depth_only() {
    let (_mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::new("Broken");
    let depth = desc.add_attachment(AttachmentDescription::depth(
        Format::D32_SFLOAT,
        StoreOp::Store,
        ImageLayout::DepthStencilReadOnly,
    ));
    desc.add_subpass(Subpass::graphics().with_depth(depth));
    assert!(desc.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());
}

#[test]
fn test_no_subpass_rejected() {
    let (_mock, device) = mock_device();
    let (log, _) = capture_log();
    let mut desc = RenderpassDescription::new("Empty");
    assert!(desc.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());
}

#[test]
fn test_dependency_validation() {
    let (_mock, device) = mock_device();
    let (log, _) = capture_log();
    let base = {
        let mut desc = RenderpassDescription::new("Deferred");
        let a = desc.add_attachment(AttachmentDescription::color(Format::R16G16B16A16_SFLOAT, ImageLayout::ShaderReadOnly));
        let b = desc.add_attachment(AttachmentDescription::color(Format::B8G8R8A8_SRGB, ImageLayout::PresentSrc));
        desc.add_subpass(Subpass::graphics().with_color(a));
        desc.add_subpass(Subpass::graphics().with_color(b));
        desc
    };

    let mut forward = base.clone();
    forward.add_dependency(dependency(SubpassIndex::Index(0), SubpassIndex::Index(1)));
    assert!(forward.build(device.as_ref(), &log).is_ok());

    let mut missing = base.clone();
    missing.add_dependency(dependency(SubpassIndex::Index(0), SubpassIndex::Index(5)));
    assert!(missing.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());

    let mut backwards = base.clone();
    backwards.add_dependency(dependency(SubpassIndex::Index(1), SubpassIndex::Index(0)));
    assert!(backwards.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());

    let mut external = base;
    external.add_dependency(dependency(SubpassIndex::External, SubpassIndex::External));
    assert!(external.build(device.as_ref(), &log).unwrap_err().is_precondition_violation());
}

// ============================================================================
// REGISTRY TESTS
// ============================================================================

#[test]
fn test_registry_builds_and_looks_up_by_name() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut passes = RenderPasses::new(&ctx, device);

    let main = passes
        .register(RenderpassDescription::main(Format::B8G8R8A8_SRGB, Format::D32_SFLOAT))
        .unwrap();
    let shadow = passes
        .register(RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT))
        .unwrap();

    assert_eq!(passes.handle(MAIN_PASS), Some(main));
    assert_eq!(passes.main().unwrap().handle(), main);
    assert_eq!(passes.handle("Shadow"), Some(shadow));
    assert_eq!(passes.iter().map(|p| p.name()).collect::<Vec<_>>(), vec!["Main", "Shadow"]);
    assert_eq!(mock.live_count(ObjectKind::RenderPass), 2);
}

#[test]
fn test_registry_rejects_duplicate_name() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut passes = RenderPasses::new(&ctx, device);
    passes.register(RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT)).unwrap();

    let err = passes
        .register(RenderpassDescription::depth_only("Shadow", Format::D16_UNORM))
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(mock.created_count(ObjectKind::RenderPass), 1);
}

#[test]
fn test_registry_default_pipeline() {
    let (_mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut passes = RenderPasses::new(&ctx, device);
    passes.register(RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT)).unwrap();

    passes.set_default_pipeline("Shadow", PipelineConfig::new("shadow_default")).unwrap();
    assert_eq!(
        passes.get("Shadow").unwrap().default_pipeline(),
        Some(&PipelineConfig::new("shadow_default"))
    );
    assert!(passes
        .set_default_pipeline("Missing", PipelineConfig::new("x"))
        .unwrap_err()
        .is_precondition_violation());
}

#[test]
fn test_registry_cleanup_destroys_all_passes() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    {
        let mut passes = RenderPasses::new(&ctx, device);
        passes.register(RenderpassDescription::main(Format::B8G8R8A8_SRGB, Format::D32_SFLOAT)).unwrap();
        passes.register(RenderpassDescription::depth_only("Shadow", Format::D32_SFLOAT)).unwrap();
        passes.cleanup();
        assert!(passes.is_empty());
    }
    assert_eq!(mock.destroyed_count(ObjectKind::RenderPass), 2);
    assert!(mock.invalid_destroys().is_empty());
}
