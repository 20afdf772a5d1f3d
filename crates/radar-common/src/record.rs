//! Decoded radar sweep.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named moment (reflectivity, velocity, ...) of a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarField {
    /// Row-major `[ray][gate]` values. Invalid gates are NaN.
    pub data: Vec<f32>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
}

impl RadarField {
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            data,
            units: None,
            long_name: None,
        }
    }
}

/// The first sweep of a radar volume, as handed to the renderer.
///
/// Field presence is not guaranteed; callers look fields up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarRecord {
    /// Acquisition time of the first ray.
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub instrument: Option<String>,
    /// Fixed elevation angle in degrees.
    pub elevation: f32,
    /// Azimuth of each ray in degrees clockwise from north.
    pub azimuths: Vec<f32>,
    /// Range to the centre of each gate in metres.
    pub ranges: Vec<f32>,
    pub fields: HashMap<String, RadarField>,
}

impl RadarRecord {
    pub fn nrays(&self) -> usize {
        self.azimuths.len()
    }

    pub fn ngates(&self) -> usize {
        self.ranges.len()
    }

    pub fn field(&self, name: &str) -> Option<&RadarField> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Sorted field names, for log lines.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every field matches the ray/gate geometry.
    pub fn validate(&self) -> Result<(), String> {
        if self.nrays() == 0 || self.ngates() == 0 {
            return Err(format!(
                "empty sweep geometry ({} rays x {} gates)",
                self.nrays(),
                self.ngates()
            ));
        }
        let expected = self.nrays() * self.ngates();
        for (name, field) in &self.fields {
            if field.data.len() != expected {
                return Err(format!(
                    "field '{}' has {} values, expected {} ({} rays x {} gates)",
                    name,
                    field.data.len(),
                    expected,
                    self.nrays(),
                    self.ngates()
                ));
            }
        }
        Ok(())
    }
}
