//! Unit tests for PipelineLayoutCache

use crate::cache::{PipelineLayoutCache, PipelineLayoutKey};
use crate::config::Config;
use crate::context::Context;
use crate::graphics_device::mock_graphics_device::{mock_device, ObjectKind};
use crate::graphics_device::{DescriptorSetLayoutHandle, PushConstantRange, ShaderStageFlags};
use crate::log::capture::capture_log;

fn ctx() -> Context {
    Context::with_log(Config::default(), capture_log().0)
}

fn set_layout(raw: u64) -> DescriptorSetLayoutHandle {
    DescriptorSetLayoutHandle::from_raw(raw)
}

fn push_range(offset: u32, size: u32) -> PushConstantRange {
    PushConstantRange { stage_flags: ShaderStageFlags::VERTEX, offset, size }
}

// ============================================================================
// KEY TESTS
// ============================================================================

#[test]
fn test_key_equal_for_identical_ordered_inputs() {
    let a = PipelineLayoutKey::new(&[set_layout(1), set_layout(2)], &[push_range(0, 64)]);
    let b = PipelineLayoutKey::new(&[set_layout(1), set_layout(2)], &[push_range(0, 64)]);
    assert_eq!(a, b);
    assert_eq!(a.combined_hash(), b.combined_hash());
}

#[test]
fn test_key_is_order_sensitive() {
    let a = PipelineLayoutKey::new(&[set_layout(1), set_layout(2)], &[]);
    let b = PipelineLayoutKey::new(&[set_layout(2), set_layout(1)], &[]);
    assert_ne!(a, b);
    assert_ne!(a.combined_hash(), b.combined_hash());
}

#[test]
fn test_key_includes_push_constant_ranges() {
    let a = PipelineLayoutKey::new(&[set_layout(1)], &[push_range(0, 64)]);
    let b = PipelineLayoutKey::new(&[set_layout(1)], &[push_range(0, 128)]);
    let c = PipelineLayoutKey::new(&[set_layout(1)], &[PushConstantRange {
        stage_flags: ShaderStageFlags::FRAGMENT,
        offset: 0,
        size: 64,
    }]);
    assert_ne!(a.combined_hash(), b.combined_hash());
    assert_ne!(a.combined_hash(), c.combined_hash());
}

// ============================================================================
// CACHE TESTS
// ============================================================================

#[test]
fn test_get_or_create_is_idempotent() {
    let (mock, device) = mock_device();
    let mut cache = PipelineLayoutCache::new(&ctx(), device);
    let sets = [set_layout(10), set_layout(11)];

    let first = cache.get_or_create(&sets, &[]).unwrap();
    let second = cache.get_or_create(&sets, &[]).unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.created_count(ObjectKind::PipelineLayout), 1);
    assert_eq!(cache.ref_count(first), 2);
}

#[test]
fn test_different_order_creates_distinct_layouts() {
    let (mock, device) = mock_device();
    let mut cache = PipelineLayoutCache::new(&ctx(), device);

    let a = cache.get_or_create(&[set_layout(1), set_layout(2)], &[]).unwrap();
    let b = cache.get_or_create(&[set_layout(2), set_layout(1)], &[]).unwrap();

    assert_ne!(a, b);
    assert_eq!(mock.live_count(ObjectKind::PipelineLayout), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_get_does_not_create() {
    let (mock, device) = mock_device();
    let mut cache = PipelineLayoutCache::new(&ctx(), device);
    assert!(cache.get(&[set_layout(1)], &[]).is_none());
    let layout = cache.get_or_create(&[set_layout(1)], &[]).unwrap();
    assert_eq!(cache.get(&[set_layout(1)], &[]), Some(layout));
    assert_eq!(cache.ref_count(layout), 1);
    assert_eq!(mock.created_count(ObjectKind::PipelineLayout), 1);
}

#[test]
fn test_release_destroys_with_last_reference() {
    let (mock, device) = mock_device();
    let mut cache = PipelineLayoutCache::new(&ctx(), device);
    let layout = cache.get_or_create(&[set_layout(1)], &[]).unwrap();
    cache.get_or_create(&[set_layout(1)], &[]).unwrap();

    cache.release(layout).unwrap();
    assert_eq!(mock.live_count(ObjectKind::PipelineLayout), 1);
    cache.release(layout).unwrap();
    assert_eq!(mock.live_count(ObjectKind::PipelineLayout), 0);
    assert!(cache.is_empty());

    assert!(cache.release(layout).unwrap_err().is_precondition_violation());
}

#[test]
fn test_cleanup_destroys_all() {
    let (mock, device) = mock_device();
    {
        let mut cache = PipelineLayoutCache::new(&ctx(), device);
        cache.get_or_create(&[set_layout(1)], &[]).unwrap();
        cache.get_or_create(&[set_layout(2)], &[push_range(0, 16)]).unwrap();
        cache.cleanup();
        assert!(cache.is_empty());
    }
    assert_eq!(mock.destroyed_count(ObjectKind::PipelineLayout), 2);
    assert!(mock.invalid_destroys().is_empty());
}
