//! Tests for the single-file job.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use netcdf_parser::SweepDecoder;
use quicklooks::job::{self, JobContext, JobError, JobSuccess};
use quicklooks::FailureKind;
use radar_common::{JobDescriptor, QuicklookLayout, RadarRecord};
use renderer::{PanelOutcome, PpiRenderer, QuicklookRenderer, RenderReport, RenderResult};
use test_utils::{full_sweep, list_tree, synthetic_sweep, write_corrupt, write_fixture, JsonSweepDecoder};
use tokio_util::sync::CancellationToken;

const REQUIRED: [&str; 4] = [
    "corrected_reflectivity",
    "radar_estimated_rain_rate",
    "radar_echo_classification",
    "corrected_differential_reflectivity",
];

fn small_layout() -> QuicklookLayout {
    QuicklookLayout {
        panel_size: 96,
        ..QuicklookLayout::default()
    }
}

fn context() -> JobContext {
    JobContext::new(
        Arc::new(JsonSweepDecoder),
        Arc::new(PpiRenderer::new()),
        small_layout(),
    )
}

struct PanickingRenderer;

impl QuicklookRenderer for PanickingRenderer {
    fn render(
        &self,
        _record: &RadarRecord,
        _layout: &QuicklookLayout,
        _path: &Path,
        _cancelled: &dyn Fn() -> bool,
    ) -> RenderResult<RenderReport> {
        panic!("colour bar overflow");
    }
}

// ============================================================================
// Success paths
// ============================================================================

#[test]
fn test_renders_to_timestamp_path() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let time = Utc.with_ymd_and_hms(2019, 12, 1, 13, 47, 12).unwrap();
    let file = write_fixture(&input.path().join("cpol_20191201.nc"), &full_sweep(time)).unwrap();

    let job = JobDescriptor::new(file, Some(output.path().to_path_buf()));
    let success = job::run(&job, &context()).unwrap();

    let JobSuccess::Rendered(report) = success else {
        panic!("expected an image");
    };
    assert_eq!(report.path, output.path().join("2019/20191201/20191201_1347.png"));
    assert_eq!(list_tree(output.path()), vec![Path::new("2019/20191201/20191201_1347.png")]);
}

#[test]
fn test_missing_optional_field_still_renders() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let time = Utc.with_ymd_and_hms(2019, 12, 1, 0, 0, 0).unwrap();
    let mut fields = REQUIRED.to_vec();
    fields.push("velocity");
    let file = write_fixture(&input.path().join("a.nc"), &synthetic_sweep(time, &fields)).unwrap();

    let job = JobDescriptor::new(file, Some(output.path().to_path_buf()));
    let JobSuccess::Rendered(report) = job::run(&job, &context()).unwrap() else {
        panic!("expected an image");
    };

    assert!(report.path.exists());
    let corrected_velocity = report
        .panels
        .iter()
        .find(|(field, _)| field == "corrected_velocity")
        .map(|(_, outcome)| *outcome);
    assert!(matches!(corrected_velocity, Some(PanelOutcome::Skipped(_))));
    assert_eq!(report.rendered_count(), 5);
}

#[test]
fn test_same_minute_maps_to_same_image() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let a = Utc.with_ymd_and_hms(2019, 12, 1, 6, 30, 1).unwrap();
    let b = Utc.with_ymd_and_hms(2019, 12, 1, 6, 30, 58).unwrap();
    let fa = write_fixture(&input.path().join("a.nc"), &full_sweep(a)).unwrap();
    let fb = write_fixture(&input.path().join("b.nc"), &full_sweep(b)).unwrap();

    for file in [fa, fb] {
        job::run(&JobDescriptor::new(file, Some(output.path().to_path_buf())), &context()).unwrap();
    }
    assert_eq!(list_tree(output.path()), vec![Path::new("2019/20191201/20191201_0630.png")]);
}

#[test]
fn test_no_output_root_decodes_only() {
    let input = tempfile::tempdir().unwrap();
    let file = write_fixture(&input.path().join("a.nc"), &full_sweep(test_utils::sample_time())).unwrap();

    let success = job::run(&JobDescriptor::new(file, None), &context()).unwrap();
    assert!(matches!(success, JobSuccess::NoOutput));
    assert_eq!(list_tree(input.path()).len(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_required_field_fails_without_image() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let record = synthetic_sweep(test_utils::sample_time(), &REQUIRED[..3]);
    let file = write_fixture(&input.path().join("a.nc"), &record).unwrap();

    let err = job::run(&JobDescriptor::new(file, Some(output.path().to_path_buf())), &context())
        .unwrap_err();

    match err {
        JobError::MissingRequiredField(field) => {
            assert_eq!(field, "corrected_differential_reflectivity")
        }
        other => panic!("expected MissingRequiredField, got {other:?}"),
    }
    assert!(list_tree(output.path()).is_empty());
}

#[test]
fn test_corrupt_input_is_decode_error() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let file = write_corrupt(&input.path().join("bad.nc")).unwrap();

    let err = job::run_isolated(
        &JobDescriptor::new(file, Some(output.path().to_path_buf())),
        &context(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Decode);
    assert!(list_tree(output.path()).is_empty());
}

#[test]
fn test_missing_output_root_is_io_error() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let file = write_fixture(&input.path().join("a.nc"), &full_sweep(test_utils::sample_time())).unwrap();

    let err = job::run(
        &JobDescriptor::new(file, Some(output.path().join("absent"))),
        &context(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Io);
}

#[test]
fn test_panic_becomes_worker_crash() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let file = write_fixture(&input.path().join("a.nc"), &full_sweep(test_utils::sample_time())).unwrap();
    let ctx = JobContext::new(Arc::new(JsonSweepDecoder), Arc::new(PanickingRenderer), small_layout());

    let err = job::run_isolated(
        &JobDescriptor::new(file, Some(output.path().to_path_buf())),
        &ctx,
        &CancellationToken::new(),
    )
    .unwrap_err();

    match err {
        JobError::WorkerCrash(msg) => assert_eq!(msg, "colour bar overflow"),
        other => panic!("expected WorkerCrash, got {other:?}"),
    }
}

#[test]
fn test_cancelled_before_render() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let file = write_fixture(&input.path().join("a.nc"), &full_sweep(test_utils::sample_time())).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let err = job::run_isolated(
        &JobDescriptor::new(file, Some(output.path().to_path_buf())),
        &context(),
        &token,
    )
    .unwrap_err();
    assert!(matches!(err, JobError::Cancelled));
    assert!(list_tree(output.path()).is_empty());
}

#[test]
fn test_decoder_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let ctx = context();
    assert_send_sync(&ctx);
    let decoder: &dyn SweepDecoder = ctx.decoder.as_ref();
    assert!(decoder.decode(Path::new("/nonexistent.nc")).is_err());
}
