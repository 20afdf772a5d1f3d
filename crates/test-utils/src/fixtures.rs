//! JSON sweep fixtures.
//!
//! Tests that drive the batch pipeline need input files without a NetCDF
//! writer. A fixture is a JSON rendition of a [`RadarRecord`] in which `NaN`
//! gates are written as `null`; [`JsonSweepDecoder`] reads them back.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use netcdf_parser::{DecodeError, DecodeResult, SweepDecoder};
use radar_common::{RadarField, RadarRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct FixtureField {
    data: Vec<Option<f32>>,
    #[serde(default)]
    units: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FixtureSweep {
    time: DateTime<Utc>,
    #[serde(default)]
    instrument: Option<String>,
    elevation: f32,
    azimuths: Vec<f32>,
    ranges: Vec<f32>,
    fields: HashMap<String, FixtureField>,
}

impl From<&RadarRecord> for FixtureSweep {
    fn from(record: &RadarRecord) -> Self {
        let fields = record
            .fields
            .iter()
            .map(|(name, field)| {
                let data = field
                    .data
                    .iter()
                    .map(|v| v.is_finite().then_some(*v))
                    .collect();
                let fixture = FixtureField {
                    data,
                    units: field.units.clone(),
                };
                (name.clone(), fixture)
            })
            .collect();

        Self {
            time: record.time,
            instrument: record.instrument.clone(),
            elevation: record.elevation,
            azimuths: record.azimuths.clone(),
            ranges: record.ranges.clone(),
            fields,
        }
    }
}

impl From<FixtureSweep> for RadarRecord {
    fn from(sweep: FixtureSweep) -> Self {
        let fields = sweep
            .fields
            .into_iter()
            .map(|(name, field)| {
                let data = field.data.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect();
                let mut radar_field = RadarField::new(data);
                radar_field.units = field.units;
                (name, radar_field)
            })
            .collect();

        RadarRecord {
            time: sweep.time,
            instrument: sweep.instrument,
            elevation: sweep.elevation,
            azimuths: sweep.azimuths,
            ranges: sweep.ranges,
            fields,
        }
    }
}

/// Write `record` as a JSON fixture at `path`, creating parent directories.
pub fn write_fixture(path: &Path, record: &RadarRecord) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(&FixtureSweep::from(record))?;
    fs::write(path, json)?;
    Ok(path.to_path_buf())
}

/// Write bytes that no decoder accepts.
pub fn write_corrupt(path: &Path) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"\x89HDF\r\n\x1a\ntruncated")?;
    Ok(path.to_path_buf())
}

/// [`SweepDecoder`] over JSON fixtures.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSweepDecoder;

impl SweepDecoder for JsonSweepDecoder {
    fn decode(&self, path: &Path) -> DecodeResult<RadarRecord> {
        let bytes = fs::read(path)?;
        let sweep: FixtureSweep = serde_json::from_slice(&bytes)
            .map_err(|e| DecodeError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
        let record = RadarRecord::from(sweep);
        record.validate().map_err(DecodeError::InvalidFormat)?;
        Ok(record)
    }
}
