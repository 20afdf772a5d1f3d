//! CF/Radial reader built on the native netcdf library.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Once;

use radar_common::{RadarField, RadarRecord};
use tracing::{debug, warn};

use crate::decoder::SweepDecoder;
use crate::error::{DecodeError, DecodeResult};
use crate::units::TimeUnits;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostic stacks even when the Rust side
/// handles the error (probing optional attributes, opening a corrupt file).
/// With many workers this drowns the per-file log lines, so it is disabled
/// once per process.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Decoder for CF/Radial NetCDF volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CfRadialDecoder {
    sweep: usize,
}

impl CfRadialDecoder {
    /// Decoder for sweep `sweep` (0 = lowest elevation).
    pub fn for_sweep(sweep: usize) -> Self {
        Self { sweep }
    }
}

impl SweepDecoder for CfRadialDecoder {
    fn decode(&self, path: &Path) -> DecodeResult<RadarRecord> {
        silence_hdf5_errors();

        // libnetcdf reports a missing file as a generic format error.
        std::fs::metadata(path)?;

        let file = netcdf::open(path)
            .map_err(|e| DecodeError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

        let nrays = dimension_len(&file, "time")?;
        let ngates = dimension_len(&file, "range")?;

        let starts = read_optional_indices(&file, "sweep_start_ray_index")?;
        let ends = read_optional_indices(&file, "sweep_end_ray_index")?;
        let rays = sweep_rays(starts.as_deref(), ends.as_deref(), self.sweep, nrays)?;

        let time_var = require_variable(&file, "time")?;
        let units = get_string_attr(&time_var, "units")
            .ok_or_else(|| DecodeError::MissingData("time:units attribute".to_string()))?;
        let times = read_as_f64(&time_var, || ..)
            .map_err(|e| DecodeError::InvalidFormat(format!("Failed to read time: {}", e)))?;
        let first = times
            .get(rays.start)
            .copied()
            .ok_or_else(|| DecodeError::MissingData("time values".to_string()))?;
        let time = TimeUnits::parse(&units)?.to_datetime(first)?;

        let azimuths = read_f32(&file, "azimuth")?
            .get(rays.clone())
            .map(|a| a.iter().map(|v| v.rem_euclid(360.0)).collect::<Vec<f32>>())
            .ok_or_else(|| DecodeError::InvalidFormat("azimuth shorter than time".to_string()))?;
        let elevation = match read_f32(&file, "fixed_angle") {
            Ok(angles) if angles.len() > self.sweep => angles[self.sweep],
            _ => read_f32(&file, "elevation")?
                .get(rays.start)
                .copied()
                .unwrap_or(f32::NAN),
        };
        let ranges = read_f32(&file, "range")?;
        if ranges.len() != ngates {
            return Err(DecodeError::InvalidFormat(format!(
                "range has {} values, dimension says {}",
                ranges.len(),
                ngates
            )));
        }

        let mut fields = HashMap::new();
        for var in file.variables() {
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            if dims != ["time", "range"] {
                continue;
            }
            let name = var.name();
            match read_moment(&var, &rays, ngates) {
                Ok(field) => {
                    fields.insert(name, field);
                }
                Err(e) => {
                    // A broken moment is treated like an absent one.
                    warn!(file = %path.display(), field = %name, error = %e, "Skipping unreadable field");
                }
            }
        }

        let instrument = file
            .attribute("instrument_name")
            .and_then(|a| a.value().ok())
            .and_then(|v| match v {
                netcdf::AttributeValue::Str(s) => Some(s),
                _ => None,
            });

        let record = RadarRecord {
            time,
            instrument,
            elevation,
            azimuths,
            ranges,
            fields,
        };
        record.validate().map_err(DecodeError::InvalidFormat)?;

        debug!(
            file = %path.display(),
            sweep = self.sweep,
            rays = record.nrays(),
            gates = record.ngates(),
            fields = ?record.field_names(),
            "Decoded sweep"
        );

        Ok(record)
    }
}

/// Ray index range of `sweep`, from the CF/Radial inclusive start/end indices.
///
/// Files without sweep indices are treated as a single sweep.
pub fn sweep_rays(
    starts: Option<&[i64]>,
    ends: Option<&[i64]>,
    sweep: usize,
    nrays: usize,
) -> DecodeResult<Range<usize>> {
    let (start, end) = match (starts, ends) {
        (Some(starts), Some(ends)) => {
            let (start, end) = starts
                .get(sweep)
                .zip(ends.get(sweep))
                .ok_or_else(|| DecodeError::MissingData(format!("sweep {}", sweep)))?;
            (*start, *end + 1)
        }
        _ if sweep == 0 => (0, nrays as i64),
        _ => return Err(DecodeError::MissingData(format!("sweep {}", sweep))),
    };

    if start < 0 || end <= start || end as usize > nrays {
        return Err(DecodeError::InvalidFormat(format!(
            "sweep {} spans rays {}..{} of {}",
            sweep, start, end, nrays
        )));
    }
    Ok(start as usize..end as usize)
}

/// Packing attributes of a stored moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f32,
    pub add_offset: f32,
    pub fill_value: Option<f32>,
    pub missing_value: Option<f32>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
            missing_value: None,
        }
    }
}

impl Packing {
    /// Apply scale/offset in place, turning fill and missing markers into NaN.
    pub fn unpack(&self, raw: &mut [f32]) {
        for v in raw.iter_mut() {
            if Some(*v) == self.fill_value || Some(*v) == self.missing_value || !v.is_finite() {
                *v = f32::NAN;
            } else {
                *v = *v * self.scale_factor + self.add_offset;
            }
        }
    }
}

fn read_moment(var: &netcdf::Variable, rays: &Range<usize>, ngates: usize) -> DecodeResult<RadarField> {
    let mut data: Vec<f32> = read_as_f64(var, || (rays.clone(), 0..ngates))
        .map_err(|e| DecodeError::InvalidFormat(e.to_string()))?
        .into_iter()
        .map(|v| v as f32)
        .collect();

    let packing = Packing {
        scale_factor: get_f32_attr(var, "scale_factor").unwrap_or(1.0),
        add_offset: get_f32_attr(var, "add_offset").unwrap_or(0.0),
        fill_value: get_f32_attr(var, "_FillValue"),
        missing_value: get_f32_attr(var, "missing_value"),
    };
    packing.unpack(&mut data);

    Ok(RadarField {
        data,
        units: get_string_attr(var, "units"),
        long_name: get_string_attr(var, "long_name"),
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

fn dimension_len(file: &netcdf::File, name: &str) -> DecodeResult<usize> {
    file.dimension(name)
        .map(|d| d.len())
        .ok_or_else(|| DecodeError::MissingData(format!("{} dimension", name)))
}

fn require_variable<'f>(file: &'f netcdf::File, name: &str) -> DecodeResult<netcdf::Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| DecodeError::MissingData(format!("{} variable", name)))
}

/// Read a numeric variable whatever its stored type.
///
/// Values are requested in the stored type first (CF/Radial writers use
/// `short`, `byte`, `int`, `float` and `double` freely), then widened.
fn read_as_f64<E>(var: &netcdf::Variable, extents: impl Fn() -> E) -> Result<Vec<f64>, netcdf::Error>
where
    E: TryInto<netcdf::Extents>,
    E::Error: Into<netcdf::Error>,
{
    fn widen<T: Into<f64>>(values: Vec<T>) -> Vec<f64> {
        values.into_iter().map(Into::into).collect()
    }

    var.get_values::<f64, _>(extents())
        .or_else(|_| var.get_values::<f32, _>(extents()).map(widen))
        .or_else(|_| var.get_values::<i32, _>(extents()).map(widen))
        .or_else(|_| var.get_values::<i16, _>(extents()).map(widen))
        .or_else(|_| var.get_values::<i8, _>(extents()).map(widen))
        .or_else(|_| var.get_values::<u8, _>(extents()).map(widen))
        .or_else(|_| {
            var.get_values::<i64, _>(extents())
                .map(|v| v.into_iter().map(|x| x as f64).collect())
        })
}

fn read_f32(file: &netcdf::File, name: &str) -> DecodeResult<Vec<f32>> {
    read_as_f64(&require_variable(file, name)?, || ..)
        .map(|values| values.into_iter().map(|v| v as f32).collect())
        .map_err(|e| DecodeError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

fn read_optional_indices(file: &netcdf::File, name: &str) -> DecodeResult<Option<Vec<i64>>> {
    match file.variable(name) {
        None => Ok(None),
        Some(var) => read_as_f64(&var, || ..)
            .map(|values| Some(values.into_iter().map(|v| v as i64).collect()))
            .map_err(|e| DecodeError::InvalidFormat(format!("Failed to read {}: {}", name, e))),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
