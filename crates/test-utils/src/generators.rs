//! Synthetic PPI sweeps with predictable values.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use radar_common::{QuicklookLayout, RadarField, RadarRecord};

/// Rays in a generated sweep (one per degree).
pub const SYNTHETIC_RAYS: usize = 360;
/// Gates in a generated sweep (1 km spacing out to 150 km).
pub const SYNTHETIC_GATES: usize = 150;
/// Gates beyond this index are `NaN` in every generated field.
pub const SYNTHETIC_VALID_GATES: usize = 120;

/// Acquisition time used when a test does not care.
pub fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 12, 1, 0, 4, 31)
        .single()
        .unwrap_or_default()
}

/// Every field the default layout draws.
pub fn default_field_names() -> Vec<String> {
    QuicklookLayout::default()
        .panels
        .iter()
        .map(|p| p.field.clone())
        .collect()
}

/// Values for one synthetic field.
///
/// Each gate holds `ray / 10 + gate / 5`, so the value under any pixel can
/// be predicted from its ray and gate. Gates past
/// [`SYNTHETIC_VALID_GATES`] are `NaN`.
pub fn synthetic_field(nrays: usize, ngates: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nrays * ngates);
    for ray in 0..nrays {
        for gate in 0..ngates {
            if gate >= SYNTHETIC_VALID_GATES {
                data.push(f32::NAN);
            } else {
                data.push(ray as f32 / 10.0 + gate as f32 / 5.0);
            }
        }
    }
    data
}

/// A 360 x 150 sweep carrying the named fields.
pub fn synthetic_sweep(time: DateTime<Utc>, fields: &[&str]) -> RadarRecord {
    synthetic_sweep_sized(time, fields, SYNTHETIC_RAYS, SYNTHETIC_GATES)
}

pub fn synthetic_sweep_sized(
    time: DateTime<Utc>,
    fields: &[&str],
    nrays: usize,
    ngates: usize,
) -> RadarRecord {
    let fields: HashMap<String, RadarField> = fields
        .iter()
        .map(|name| (name.to_string(), RadarField::new(synthetic_field(nrays, ngates))))
        .collect();

    RadarRecord {
        time,
        instrument: Some("CPOL".to_string()),
        elevation: 0.5,
        azimuths: (0..nrays).map(|i| i as f32 * 360.0 / nrays as f32).collect(),
        ranges: (0..ngates).map(|g| (g as f32 + 0.5) * 1000.0).collect(),
        fields,
    }
}

/// A sweep with every default-layout field present.
pub fn full_sweep(time: DateTime<Utc>) -> RadarRecord {
    let names = default_field_names();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    synthetic_sweep(time, &refs)
}
