//! Date-range batch driver tests.
//!
//! Input trees are built from JSON fixtures; a wrapper renderer stalls or
//! panics on sweeps whose instrument name asks for it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use quicklooks::{
    run_batch, BatchDriver, DriverConfig, DriverState, JobContext, JobError, JobOutcome, JobSuccess,
};
use radar_common::{ConfigError, DateRange, QuicklookLayout, RadarRecord};
use renderer::{PpiRenderer, QuicklookRenderer, RenderError, RenderReport, RenderResult};
use test_utils::{day_dir, full_sweep, list_tree, write_corrupt, write_fixture, JsonSweepDecoder};

/// PPI renderer that misbehaves on request and records peak concurrency.
#[derive(Default)]
struct ScriptedRenderer {
    inner: PpiRenderer,
    active: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl QuicklookRenderer for ScriptedRenderer {
    fn render(
        &self,
        record: &RadarRecord,
        layout: &QuicklookLayout,
        path: &Path,
        cancelled: &dyn Fn() -> bool,
    ) -> RenderResult<RenderReport> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = match record.instrument.as_deref() {
            Some("panic") => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("renderer exploded");
            }
            Some("stall") => {
                let deadline = Instant::now() + Duration::from_secs(10);
                while !cancelled() && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(RenderError::Cancelled)
            }
            _ => {
                std::thread::sleep(self.delay);
                self.inner.render(record, layout, path, cancelled)
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn layout() -> QuicklookLayout {
    QuicklookLayout {
        panel_size: 96,
        ..QuicklookLayout::default()
    }
}

fn time(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 12, d, h, m, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 12, d).unwrap()
}

fn sweep(t: DateTime<Utc>, instrument: &str) -> RadarRecord {
    let mut record = full_sweep(t);
    record.instrument = Some(instrument.to_string());
    record
}

struct Harness {
    input: tempfile::TempDir,
    output: tempfile::TempDir,
    renderer: Arc<ScriptedRenderer>,
}

impl Harness {
    fn new() -> Self {
        Self::with_renderer(ScriptedRenderer::default())
    }

    fn with_renderer(renderer: ScriptedRenderer) -> Self {
        Self {
            input: tempfile::tempdir().unwrap(),
            output: tempfile::tempdir().unwrap(),
            renderer: Arc::new(renderer),
        }
    }

    fn add(&self, d: u32, name: &str, record: &RadarRecord) -> PathBuf {
        write_fixture(&day_dir(self.input.path(), day(d)).join(name), record).unwrap()
    }

    fn add_corrupt(&self, d: u32, name: &str) -> PathBuf {
        write_corrupt(&day_dir(self.input.path(), day(d)).join(name)).unwrap()
    }

    fn driver(&self, concurrency: usize, timeout: Duration) -> BatchDriver {
        let config = DriverConfig {
            input_dir: self.input.path().to_path_buf(),
            output_dir: Some(self.output.path().to_path_buf()),
            concurrency,
            job_timeout: timeout,
        };
        let renderer: Arc<dyn QuicklookRenderer> = self.renderer.clone();
        let context = JobContext::new(Arc::new(JsonSweepDecoder), renderer, layout());
        BatchDriver::new(config, context)
    }

    fn outputs(&self) -> Vec<PathBuf> {
        list_tree(self.output.path())
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_corrupt_file_in_a_day() {
    let h = Harness::new();
    h.add(1, "cpol_0000.nc", &sweep(time(1, 0, 0), "CPOL"));
    h.add(1, "cpol_0010.nc", &sweep(time(1, 0, 10), "CPOL"));
    h.add_corrupt(1, "cpol_0020.nc");

    let mut driver = h.driver(2, Duration::from_secs(60));
    let summary = run_batch("20191201", "20191201", &mut driver).await.unwrap();

    assert_eq!((summary.days, summary.files), (1, 3));
    assert_eq!((summary.succeeded, summary.failed, summary.timed_out), (2, 1, 0));
    assert_eq!(
        h.outputs(),
        vec![
            PathBuf::from("2019/20191201/20191201_0000.png"),
            PathBuf::from("2019/20191201/20191201_0010.png"),
        ]
    );

    let failed: Vec<_> = summary.reports[0]
        .files
        .iter()
        .filter(|f| matches!(f.outcome, JobOutcome::Failed(JobError::Decode(_))))
        .map(|f| f.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, ["cpol_0020.nc"]);
    assert_eq!(driver.state(), DriverState::Done);
}

#[tokio::test]
async fn test_inverted_range_is_rejected_before_work() {
    let h = Harness::new();
    h.add(1, "cpol.nc", &sweep(time(1, 0, 0), "CPOL"));

    let mut driver = h.driver(2, Duration::from_secs(60));
    let err = run_batch("20191205", "20191201", &mut driver).await.unwrap_err();

    assert!(matches!(err, ConfigError::InvertedRange { .. }));
    assert!(h.outputs().is_empty());
    assert_eq!(std::fs::read_dir(h.output.path()).unwrap().count(), 0);
    assert_eq!(driver.state(), DriverState::Idle);
}

#[tokio::test]
async fn test_malformed_date_is_rejected() {
    let h = Harness::new();
    let mut driver = h.driver(1, Duration::from_secs(60));
    for (start, end) in [("2019-12-01", "20191201"), ("20191301", "20191302"), ("20191201", "")] {
        let err = run_batch(start, end, &mut driver).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate(_)), "{start}..{end}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_days_visited_once_in_order() {
    let h = Harness::new();
    h.add(1, "a.nc", &sweep(time(1, 3, 0), "CPOL"));
    h.add(3, "a.nc", &sweep(time(3, 4, 0), "CPOL"));

    let range = DateRange::parse("20191130", "20191203").unwrap();
    let summary = h.driver(2, Duration::from_secs(60)).run(&range).await;

    let days: Vec<NaiveDate> = summary.reports.iter().map(|r| r.day).collect();
    assert_eq!(
        days,
        vec![NaiveDate::from_ymd_opt(2019, 11, 30).unwrap(), day(1), day(2), day(3)]
    );
    assert_eq!(summary.files, 2);
    assert!(summary.reports[2].files.is_empty());
    assert_eq!(
        h.outputs(),
        vec![
            PathBuf::from("2019/20191201/20191201_0300.png"),
            PathBuf::from("2019/20191203/20191203_0400.png"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_input_tree() {
    let h = Harness::new();
    let summary = run_batch("20191201", "20191207", &mut h.driver(4, Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!((summary.days, summary.files), (7, 0));
    assert!(h.outputs().is_empty());
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_cancels_only_the_slow_job() {
    let h = Harness::new();
    h.add(1, "a.nc", &sweep(time(1, 0, 0), "CPOL"));
    h.add(1, "b.nc", &sweep(time(1, 0, 10), "stall"));
    h.add(1, "c.nc", &sweep(time(1, 0, 20), "CPOL"));

    let started = Instant::now();
    let summary = run_batch("20191201", "20191201", &mut h.driver(2, Duration::from_millis(300)))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(8));
    assert_eq!((summary.succeeded, summary.failed, summary.timed_out), (2, 0, 1));
    let stalled = &summary.reports[0].files[1];
    assert!(stalled.input.ends_with("b.nc"));
    assert!(matches!(stalled.outcome, JobOutcome::TimedOut(d) if d == Duration::from_millis(300)));
    assert_eq!(h.outputs().len(), 2);
    assert!(!h.outputs().contains(&PathBuf::from("2019/20191201/20191201_0010.png")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panic_is_reported_as_crash() {
    let h = Harness::new();
    h.add(1, "a.nc", &sweep(time(1, 0, 0), "panic"));
    h.add(1, "b.nc", &sweep(time(1, 0, 10), "CPOL"));

    let summary = run_batch("20191201", "20191201", &mut h.driver(2, Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    match &summary.reports[0].files[0].outcome {
        JobOutcome::Failed(JobError::WorkerCrash(msg)) => assert!(msg.contains("renderer exploded")),
        other => panic!("expected WorkerCrash, got {other:?}"),
    }
    assert!(matches!(
        summary.reports[0].files[1].outcome,
        JobOutcome::Success(JobSuccess::Rendered(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_is_bounded() {
    let h = Harness::with_renderer(ScriptedRenderer {
        delay: Duration::from_millis(100),
        ..ScriptedRenderer::default()
    });
    for i in 0..6 {
        h.add(1, &format!("f{i}.nc"), &sweep(time(1, 1, i), "CPOL"));
    }

    let summary = run_batch("20191201", "20191201", &mut h.driver(2, Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 6);
    assert!(h.renderer.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_output_mode_writes_nothing() {
    let h = Harness::new();
    h.add(1, "a.nc", &sweep(time(1, 0, 0), "CPOL"));
    h.add_corrupt(1, "b.nc");

    let mut driver = h.driver(2, Duration::from_secs(60));
    let mut config = driver.config().clone();
    config.output_dir = None;
    let renderer: Arc<dyn QuicklookRenderer> = h.renderer.clone();
    driver = BatchDriver::new(
        config,
        JobContext::new(Arc::new(JsonSweepDecoder), renderer, layout()),
    );

    let summary = run_batch("20191201", "20191201", &mut driver).await.unwrap();
    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    assert!(matches!(
        summary.reports[0].files[0].outcome,
        JobOutcome::Success(JobSuccess::NoOutput)
    ));
    assert!(h.outputs().is_empty());
}
