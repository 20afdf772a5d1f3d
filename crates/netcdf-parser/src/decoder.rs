//! Decoder seam between the batch pipeline and file formats.

use std::path::Path;

use radar_common::RadarRecord;

use crate::error::DecodeResult;

/// Turns one input file into the sweep that gets rendered.
///
/// Implementations are shared across worker threads and must not keep
/// per-file state.
pub trait SweepDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> DecodeResult<RadarRecord>;
}
