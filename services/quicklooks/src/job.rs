//! Single-file quicklook job.
//!
//! A job decodes one input, resolves its output path and renders it. Every
//! failure stops here: [`run_isolated`] turns errors and panics into a
//! logged [`JobError`] so sibling jobs keep going.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use netcdf_parser::{DecodeError, SweepDecoder};
use radar_common::{JobDescriptor, QuicklookLayout};
use renderer::{QuicklookRenderer, RenderError, RenderReport};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use crate::paths;

/// Collaborators shared by every job of a run.
#[derive(Clone)]
pub struct JobContext {
    pub decoder: Arc<dyn SweepDecoder>,
    pub renderer: Arc<dyn QuicklookRenderer>,
    pub layout: Arc<QuicklookLayout>,
}

impl JobContext {
    pub fn new(
        decoder: Arc<dyn SweepDecoder>,
        renderer: Arc<dyn QuicklookRenderer>,
        layout: QuicklookLayout,
    ) -> Self {
        Self {
            decoder,
            renderer,
            layout: Arc::new(layout),
        }
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("panels", &self.layout.panels.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum JobSuccess {
    Rendered(RenderReport),
    /// Decoded only; the job had no output root.
    NoOutput,
}

/// File-level failure.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("decoding failed")]
    Decode(#[from] DecodeError),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("cannot create output directory under {}", .root.display())]
    Io {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rendering failed")]
    Render(#[source] RenderError),

    #[error("cancelled")]
    Cancelled,

    #[error("worker crashed: {0}")]
    WorkerCrash(String),
}

impl From<RenderError> for JobError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::MissingRequiredField(field) => JobError::MissingRequiredField(field),
            RenderError::Cancelled => JobError::Cancelled,
            other => JobError::Render(other),
        }
    }
}

/// Coarse failure category, for summaries and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Decode,
    MissingRequiredField,
    Io,
    Render,
    Cancelled,
    WorkerCrash,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Decode => "decode",
            FailureKind::MissingRequiredField => "missing_required_field",
            FailureKind::Io => "io",
            FailureKind::Render => "render",
            FailureKind::Cancelled => "cancelled",
            FailureKind::WorkerCrash => "worker_crash",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JobError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::Decode(_) => FailureKind::Decode,
            JobError::MissingRequiredField(_) => FailureKind::MissingRequiredField,
            JobError::Io { .. } => FailureKind::Io,
            JobError::Render(_) => FailureKind::Render,
            JobError::Cancelled => FailureKind::Cancelled,
            JobError::WorkerCrash(_) => FailureKind::WorkerCrash,
        }
    }
}

/// `error: cause: cause ...` for a single log field.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Run a job that is never cancelled.
pub fn run(job: &JobDescriptor, ctx: &JobContext) -> Result<JobSuccess, JobError> {
    run_cancellable(job, ctx, &|| false)
}

/// Decode, resolve and render one file.
///
/// `cancelled` is forwarded to the renderer and checked before any output
/// directory is created.
pub fn run_cancellable(
    job: &JobDescriptor,
    ctx: &JobContext,
    cancelled: &dyn Fn() -> bool,
) -> Result<JobSuccess, JobError> {
    let record = ctx.decoder.decode(&job.input)?;
    debug!(
        time = %record.time,
        rays = record.nrays(),
        gates = record.ngates(),
        fields = ?record.field_names(),
        "Decoded sweep"
    );

    let Some(root) = job.output_root.as_deref() else {
        info!(file = %job.file_name(), time = %record.time, "Decoded, no output requested");
        return Ok(JobSuccess::NoOutput);
    };

    if cancelled() {
        return Err(JobError::Cancelled);
    }

    let path = paths::resolve(&record.time, root).map_err(|source| JobError::Io {
        root: root.to_path_buf(),
        source,
    })?;

    let report = ctx.renderer.render(&record, &ctx.layout, &path, cancelled)?;

    let skipped: Vec<&str> = report.skipped().collect();
    info!(
        file = %job.file_name(),
        output = %report.path.display(),
        panels = report.rendered_count(),
        skipped = ?skipped,
        "Quicklook written"
    );

    Ok(JobSuccess::Rendered(report))
}

/// Run a job with panics contained and every failure logged.
///
/// Never propagates: the caller only sees the returned outcome.
pub fn run_isolated(
    job: &JobDescriptor,
    ctx: &JobContext,
    cancel: &CancellationToken,
) -> Result<JobSuccess, JobError> {
    let name = job.file_name();
    let span = info_span!("quicklook", file = %name);
    let _guard = span.enter();

    let cancelled = || cancel.is_cancelled();
    let result = panic::catch_unwind(AssertUnwindSafe(|| run_cancellable(job, ctx, &cancelled)))
        .unwrap_or_else(|payload| Err(JobError::WorkerCrash(panic_message(payload.as_ref()))));

    if let Err(err) = &result {
        match err {
            JobError::Cancelled => {
                warn!(file = %name, "Quicklook abandoned after cancellation");
            }
            _ => {
                error!(
                    file = %name,
                    kind = %err.kind(),
                    error = %error_chain(err),
                    "Quicklook failed"
                );
            }
        }
    }

    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
