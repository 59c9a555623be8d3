//! Unit tests for PipelineCache
//!
//! Shader files are written to temporary files; the mock device accepts any
//! non-empty word stream as a shader module.

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::cache::{read_spirv, PipelineCache, PipelineConfig, PipelineCreateInfo};
use crate::config::Config;
use crate::context::Context;
use crate::graphics_device::mock_graphics_device::{mock_device, ObjectKind};
use crate::graphics_device::{
    GraphicsDevice, PipelineLayoutHandle, PipelineState, RenderPassDesc, RenderPassHandle,
    ShaderStage,
};
use crate::log::capture::capture_log;
use crate::log::LogSeverity;

fn spirv_file(words: &[u32]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytemuck::cast_slice(words)).unwrap();
    file.flush().unwrap();
    file
}

fn valid_shader() -> NamedTempFile {
    spirv_file(&[0x0723_0203, 0x0001_0000, 0, 8, 0])
}

fn targets(device: &Arc<dyn GraphicsDevice>) -> (PipelineLayoutHandle, RenderPassHandle) {
    let layout = device.create_pipeline_layout(&[], &[]).unwrap();
    let render_pass = device
        .create_render_pass(&RenderPassDesc { attachments: &[], subpasses: &[], dependencies: &[] })
        .unwrap();
    (layout, render_pass)
}

fn create_info(shader: &NamedTempFile, layout: PipelineLayoutHandle, render_pass: RenderPassHandle) -> PipelineCreateInfo {
    PipelineCreateInfo {
        shader_path: shader.path().to_path_buf(),
        entry_points: vec![
            (ShaderStage::Vertex, "vs_main".to_string()),
            (ShaderStage::Fragment, "fs_main".to_string()),
        ],
        state: PipelineState::new(layout, render_pass),
        descriptor_set_layouts: Vec::new(),
    }
}

// ============================================================================
// GET OR CREATE TESTS
// ============================================================================

#[test]
fn test_get_or_create_is_idempotent() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);
    let config = PipelineConfig::new("lit_Main");

    let first = cache.get_or_create(&config, create_info(&shader, layout, render_pass)).unwrap();
    let second = cache.get_or_create(&config, create_info(&shader, layout, render_pass)).unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.created_count(ObjectKind::Pipeline), 1);
    assert_eq!(mock.created_count(ObjectKind::ShaderModule), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_shader_module_destroyed_after_creation() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);

    cache.get_or_create(&"unlit".into(), create_info(&shader, layout, render_pass)).unwrap();
    assert_eq!(mock.live_count(ObjectKind::ShaderModule), 0);
    assert_eq!(mock.live_count(ObjectKind::Pipeline), 1);
}

#[test]
fn test_one_stage_per_entry_point_sharing_one_module() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);

    let pipeline = cache
        .get_or_create(&"lit".into(), create_info(&shader, layout, render_pass))
        .unwrap();

    let state = mock.state();
    let (stages, pipeline_state) = &state.pipelines[&pipeline.as_raw()];
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].stage, ShaderStage::Vertex);
    assert_eq!(stages[0].entry_point, "vs_main");
    assert_eq!(stages[1].stage, ShaderStage::Fragment);
    assert_eq!(stages[0].module, stages[1].module);
    assert_eq!(pipeline_state.layout, layout);
}

#[test]
fn test_pipeline_data_records_inputs() {
    let (_mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);
    let config = PipelineConfig::new("lit");

    cache.get_or_create(&config, create_info(&shader, layout, render_pass)).unwrap();
    let data = cache.get(&config).unwrap();
    assert_eq!(data.layout, layout);
    assert_eq!(data.shader_path, shader.path());
    assert_eq!(data.entry_points.len(), 2);
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[test]
fn test_missing_shader_file_is_invalid_resource() {
    let (mock, device) = mock_device();
    let (log, logger) = capture_log();
    let ctx = Context::with_log(Config::default(), log);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let (layout, render_pass) = targets(&device);

    let mut info = create_info(&valid_shader(), layout, render_pass);
    info.shader_path = "does/not/exist.spv".into();
    let err = cache.get_or_create(&"broken".into(), info).unwrap_err();

    assert!(matches!(err, crate::error::Error::InvalidResource(_)));
    assert_eq!(logger.count(LogSeverity::Error), 1);
    assert_eq!(mock.created_count(ObjectKind::ShaderModule), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_device_failure_is_fatal_and_releases_module() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);
    mock.state().fail_pipeline_creation = true;

    let err = cache
        .get_or_create(&"lit".into(), create_info(&shader, layout, render_pass))
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(mock.live_count(ObjectKind::ShaderModule), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_no_entry_points_is_precondition_violation() {
    let (_mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);

    let mut info = create_info(&shader, layout, render_pass);
    info.entry_points.clear();
    assert!(cache.get_or_create(&"lit".into(), info).unwrap_err().is_precondition_violation());
}

// ============================================================================
// DESTRUCTION TESTS
// ============================================================================

#[test]
fn test_destroy_pipeline_removes_one_entry() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let mut cache = PipelineCache::new(&ctx, device.clone());
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);

    cache.get_or_create(&"a".into(), create_info(&shader, layout, render_pass)).unwrap();
    cache.get_or_create(&"b".into(), create_info(&shader, layout, render_pass)).unwrap();
    cache.destroy_pipeline(&"a".into()).unwrap();

    assert!(!cache.contains(&"a".into()));
    assert!(cache.contains(&"b".into()));
    assert_eq!(mock.live_count(ObjectKind::Pipeline), 1);

    let err = cache.destroy_pipeline(&"a".into()).unwrap_err();
    assert!(err.is_precondition_violation());
}

#[test]
fn test_cleanup_destroys_pipelines_but_not_layouts() {
    let (mock, device) = mock_device();
    let ctx = Context::with_log(Config::default(), capture_log().0);
    let shader = valid_shader();
    let (layout, render_pass) = targets(&device);
    {
        let mut cache = PipelineCache::new(&ctx, device.clone());
        cache.get_or_create(&"a".into(), create_info(&shader, layout, render_pass)).unwrap();
        cache.get_or_create(&"b".into(), create_info(&shader, layout, render_pass)).unwrap();
        cache.cleanup();
        assert!(cache.is_empty());
        assert_eq!(mock.live_count(ObjectKind::Pipeline), 0);
    }
    assert_eq!(mock.destroyed_count(ObjectKind::Pipeline), 2);
    assert_eq!(mock.live_count(ObjectKind::PipelineLayout), 1);
    assert!(mock.invalid_destroys().is_empty());
}

// ============================================================================
// SPIR-V LOADING TESTS
// ============================================================================

#[test]
fn test_read_spirv_returns_words() {
    let shader = valid_shader();
    let words = read_spirv(shader.path()).unwrap();
    assert_eq!(words.len(), 5);
    assert_eq!(words[0], 0x0723_0203);
}

#[test]
fn test_read_spirv_rejects_partial_word() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0x03, 0x02, 0x23, 0x07, 0x00]).unwrap();
    assert!(read_spirv(file.path()).is_err());
}

#[test]
fn test_read_spirv_rejects_bad_magic() {
    let file = spirv_file(&[0xdead_beef, 0]);
    assert!(read_spirv(file.path()).is_err());
}

#[test]
fn test_read_spirv_rejects_empty_file() {
    let file = NamedTempFile::new().unwrap();
    assert!(read_spirv(file.path()).is_err());
}
