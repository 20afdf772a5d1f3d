//! Output path resolution.
//!
//! Images land at `<root>/<YYYY>/<YYYYMMDD>/<YYYYMMDD_HHMM>.png`. Workers
//! race to create the same day directory, so `AlreadyExists` is success.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use radar_common::OutputLocator;
use tracing::debug;

/// Output image path for a sweep, creating the year and date directories.
///
/// `output_root` itself must already exist. An image already at the
/// returned path is overwritten by the renderer.
pub fn resolve(time: &DateTime<Utc>, output_root: &Path) -> io::Result<PathBuf> {
    let locator = OutputLocator::from_timestamp(time);
    ensure_dir(&locator.year_dir(output_root))?;
    ensure_dir(&locator.date_dir(output_root))?;
    Ok(locator.path(output_root))
}

fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "Created output directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
