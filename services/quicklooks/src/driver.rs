//! Date-range batch driver.
//!
//! Walks an inclusive day range in ascending order. Each day's files are
//! listed, dispatched onto a bounded pool and awaited before the next day
//! starts. A job that overruns its timeout is reported and cancelled; its
//! permit is returned to the pool straight away.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use radar_common::{ConfigResult, DateRange, JobDescriptor};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::job::{self, JobContext, JobError, JobSuccess};

pub const DEFAULT_INPUT_DIR: &str = "/g/data/hj10/cpol_level_1b/v2020/ppi";
pub const DEFAULT_OUTPUT_DIR: &str = "/g/data/hj10/cpol_level_1b/v2020/quicklooks";
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(180);
/// Upper bound on `concurrency`; well below the semaphore's permit limit.
pub const MAX_CONCURRENCY: usize = 1024;

/// Batch driver configuration.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Root of the `<YYYY>/<YYYYMMDD>/` input tree
    pub input_dir: PathBuf,
    /// Root of the output tree; `None` decodes without rendering
    pub output_dir: Option<PathBuf>,
    /// Jobs allowed to run at once
    pub concurrency: usize,
    /// Wall-clock limit per job
    pub job_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
            concurrency: default_concurrency(),
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

/// One worker per available CPU.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Validating,
    Listing(NaiveDate),
    Dispatching(NaiveDate),
    Awaiting(NaiveDate),
    Done,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Idle => write!(f, "idle"),
            DriverState::Validating => write!(f, "validating"),
            DriverState::Listing(day) => write!(f, "listing {}", day.format("%Y%m%d")),
            DriverState::Dispatching(day) => write!(f, "dispatching {}", day.format("%Y%m%d")),
            DriverState::Awaiting(day) => write!(f, "awaiting {}", day.format("%Y%m%d")),
            DriverState::Done => write!(f, "done"),
        }
    }
}

/// Result of one job as seen by the driver.
#[derive(Debug)]
pub enum JobOutcome {
    Success(JobSuccess),
    Failed(JobError),
    TimedOut(Duration),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub outcome: JobOutcome,
}

#[derive(Debug)]
pub struct DayReport {
    pub day: NaiveDate,
    pub files: Vec<FileOutcome>,
}

/// Totals for a whole run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub days: usize,
    pub files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed: Duration,
    pub reports: Vec<DayReport>,
}

impl BatchSummary {
    fn record(&mut self, report: DayReport) {
        self.days += 1;
        for file in &report.files {
            self.files += 1;
            match file.outcome {
                JobOutcome::Success(_) => self.succeeded += 1,
                JobOutcome::Failed(_) => self.failed += 1,
                JobOutcome::TimedOut(_) => self.timed_out += 1,
            }
        }
        self.reports.push(report);
    }
}

/// Sorted input files for `day`: regular files under
/// `<root>/<YYYY>/<YYYYMMDD>/` whose name contains a dot.
pub fn list_day_files(input_root: &Path, day: NaiveDate) -> Vec<PathBuf> {
    let dir = input_root
        .join(format!("{:04}", day.year()))
        .join(day.format("%Y%m%d").to_string());

    WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) if is_missing(&e) => {
                debug!(dir = %dir.display(), error = %e, "Day directory absent");
                None
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains('.'))
        .map(|entry| entry.into_path())
        .collect()
}

/// A day without a directory is normal; anything else is worth a warning.
fn is_missing(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

pub struct BatchDriver {
    config: DriverConfig,
    context: JobContext,
    state: DriverState,
}

impl BatchDriver {
    pub fn new(config: DriverConfig, context: JobContext) -> Self {
        Self {
            config,
            context,
            state: DriverState::Idle,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = %self.state, to = %next, "Driver state");
        self.state = next;
    }

    /// Process every day of `range`, oldest first.
    pub async fn run(&mut self, range: &DateRange) -> BatchSummary {
        let start = Instant::now();

        info!(
            start = %range.start().format("%Y%m%d"),
            end = %range.end().format("%Y%m%d"),
            input = %self.config.input_dir.display(),
            output = %self
                .config
                .output_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
            concurrency = self.config.concurrency,
            timeout_secs = self.config.job_timeout.as_secs(),
            "Starting quicklook batch"
        );

        let mut summary = BatchSummary::default();
        for day in range.days() {
            let report = self.run_day(day).await;
            summary.record(report);
        }

        summary.elapsed = start.elapsed();
        self.transition(DriverState::Done);

        info!(
            days = summary.days,
            files = summary.files,
            succeeded = summary.succeeded,
            failed = summary.failed,
            timed_out = summary.timed_out,
            elapsed_secs = format!("{:.2}", summary.elapsed.as_secs_f64()),
            "Process completed"
        );
        summary
    }

    /// List, dispatch and await one day.
    pub async fn run_day(&mut self, day: NaiveDate) -> DayReport {
        self.transition(DriverState::Listing(day));
        let files = list_day_files(&self.config.input_dir, day);
        let date = day.format("%Y%m%d").to_string();
        if files.is_empty() {
            info!(day = %date, "No file found");
            return DayReport {
                day,
                files: Vec::new(),
            };
        }
        info!(day = %date, files = files.len(), "Files found");

        self.transition(DriverState::Dispatching(day));
        let handles = self.dispatch(files).await;

        self.transition(DriverState::Awaiting(day));
        let mut outcomes = Vec::with_capacity(handles.len());
        for (input, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(file = %input.display(), error = %e, "Job task aborted");
                    JobOutcome::Failed(JobError::WorkerCrash(e.to_string()))
                }
            };
            outcomes.push(FileOutcome { input, outcome });
        }

        DayReport {
            day,
            files: outcomes,
        }
    }

    async fn dispatch(
        &self,
        files: Vec<PathBuf>,
    ) -> Vec<(PathBuf, tokio::task::JoinHandle<JobOutcome>)> {
        let permits = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut handles = Vec::with_capacity(files.len());

        for input in files {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let job = JobDescriptor::new(input.clone(), self.config.output_dir.clone());
            let ctx = self.context.clone();
            let limit = self.config.job_timeout;

            let handle = tokio::spawn(async move {
                let outcome = run_with_timeout(job, ctx, limit).await;
                drop(permit);
                outcome
            });
            handles.push((input, handle));
        }

        handles
    }
}

/// Run one job on the blocking pool, cancelling it once `limit` elapses.
async fn run_with_timeout(job: JobDescriptor, ctx: JobContext, limit: Duration) -> JobOutcome {
    let token = CancellationToken::new();
    let child = token.clone();
    let name = job.file_name();

    let task = tokio::task::spawn_blocking(move || job::run_isolated(&job, &ctx, &child));

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(success))) => JobOutcome::Success(success),
        Ok(Ok(Err(err))) => JobOutcome::Failed(err),
        Ok(Err(join_err)) => {
            error!(file = %name, error = %join_err, "Quicklook worker crashed");
            JobOutcome::Failed(JobError::WorkerCrash(join_err.to_string()))
        }
        Err(_) => {
            token.cancel();
            warn!(
                file = %name,
                timeout_secs = limit.as_secs_f32(),
                "Quicklook timed out, cancelling"
            );
            JobOutcome::TimedOut(limit)
        }
    }
}

/// Validate the range, then run the batch.
///
/// Malformed or inverted dates fail before any file is listed or any
/// directory is created, leaving the driver idle.
pub async fn run_batch(
    start: &str,
    end: &str,
    driver: &mut BatchDriver,
) -> ConfigResult<BatchSummary> {
    driver.transition(DriverState::Validating);
    let range = match DateRange::parse(start, end) {
        Ok(range) => range,
        Err(e) => {
            error!(start, end, error = %e, "Rejected date range");
            driver.transition(DriverState::Idle);
            return Err(e);
        }
    };
    Ok(driver.run(&range).await)
}
