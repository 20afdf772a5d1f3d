//! Job inputs and timestamp-derived output locations.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// One unit of batch work: an input file and where its image should go.
///
/// `output_root` of `None` means the file is decoded but nothing is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub input: PathBuf,
    pub output_root: Option<PathBuf>,
}

impl JobDescriptor {
    pub fn new(input: impl Into<PathBuf>, output_root: Option<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_root,
        }
    }

    /// File name of the input, for log lines.
    pub fn file_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Output location components derived from a sweep timestamp.
///
/// Seconds are dropped, so every record acquired within the same minute maps
/// to the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputLocator {
    /// Four-digit year, e.g. `2019`.
    pub year: String,
    /// `YYYYMMDD`
    pub date: String,
    /// `YYYYMMDD_HHMM`
    pub stamp: String,
}

impl OutputLocator {
    pub fn from_timestamp(time: &DateTime<Utc>) -> Self {
        Self {
            year: time.year().to_string(),
            date: time.format("%Y%m%d").to_string(),
            stamp: time.format("%Y%m%d_%H%M").to_string(),
        }
    }

    pub fn year_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.year)
    }

    pub fn date_dir(&self, root: &Path) -> PathBuf {
        self.year_dir(root).join(&self.date)
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.stamp)
    }

    /// Full image path under `root`. Does not touch the filesystem.
    pub fn path(&self, root: &Path) -> PathBuf {
        self.date_dir(root).join(self.file_name())
    }
}
