//! Radar sweep decoding.
//!
//! Reads CF/Radial NetCDF volumes (the format written by Py-ART and most
//! research radar pipelines) and extracts one sweep as a
//! [`radar_common::RadarRecord`].
//!
//! # CF/Radial Structure
//!
//! Moments are stored as `(time, range)` variables, one row per ray, with all
//! sweeps of the volume concatenated along `time`. Sweep boundaries come from
//! `sweep_start_ray_index` / `sweep_end_ray_index` (inclusive). Packed integer
//! moments carry `scale_factor`, `add_offset` and `_FillValue`.

pub mod cfradial;
pub mod decoder;
pub mod error;
pub mod units;

pub use cfradial::{silence_hdf5_errors, CfRadialDecoder};
pub use decoder::SweepDecoder;
pub use error::{DecodeError, DecodeResult};
pub use units::TimeUnits;
