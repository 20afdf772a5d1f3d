//! Radar PPI quicklook batch pipeline.
//!
//! Turns daily directories of CF/Radial sweeps into multi-panel PNG
//! quicklooks:
//! - [`paths`] maps a sweep timestamp to its output image
//! - [`job`] decodes and renders one file with failures contained
//! - [`driver`] walks a date range with a bounded worker pool

pub mod config;
pub mod driver;
pub mod job;
pub mod logging;
pub mod paths;

pub use config::RunConfig;
pub use driver::{
    list_day_files, run_batch, BatchDriver, BatchSummary, DayReport, DriverConfig, DriverState,
    FileOutcome, JobOutcome,
};
pub use job::{FailureKind, JobContext, JobError, JobSuccess};
