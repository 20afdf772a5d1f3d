//! Polar-to-Cartesian sampling of a PPI sweep.
//!
//! Every panel of a quicklook shares the same square window centred on the
//! radar, so the gate under each pixel is computed once per render and
//! reused for all fields.

use radar_common::RadarRecord;
use rayon::prelude::*;

use crate::error::{RenderError, RenderResult};

/// Nearest-ray / nearest-gate lookup for one sweep.
#[derive(Debug, Clone)]
pub struct PolarIndex {
    /// `(azimuth, ray)` sorted by azimuth.
    rays: Vec<(f32, usize)>,
    /// Largest angular distance (degrees) at which a ray still covers a pixel.
    tolerance_deg: f32,
    first_gate_m: f32,
    gate_spacing_m: f32,
    ngates: usize,
}

impl PolarIndex {
    pub fn new(record: &RadarRecord) -> RenderResult<Self> {
        if record.nrays() == 0 || record.ngates() == 0 {
            return Err(RenderError::InvalidSweep(format!(
                "{} rays x {} gates",
                record.nrays(),
                record.ngates()
            )));
        }

        let mut rays: Vec<(f32, usize)> = record
            .azimuths
            .iter()
            .enumerate()
            .filter(|(_, az)| az.is_finite())
            .map(|(i, az)| (az.rem_euclid(360.0), i))
            .collect();
        if rays.is_empty() {
            return Err(RenderError::InvalidSweep("no valid azimuths".to_string()));
        }
        rays.sort_by(|a, b| a.0.total_cmp(&b.0));

        let tolerance_deg = median_spacing(&rays).max(0.1);

        let ngates = record.ngates();
        let first_gate_m = record.ranges[0];
        let gate_spacing_m = if ngates > 1 {
            (record.ranges[ngates - 1] - first_gate_m) / (ngates - 1) as f32
        } else {
            1000.0
        };
        if !(gate_spacing_m > 0.0) {
            return Err(RenderError::InvalidSweep(format!(
                "non-increasing ranges (spacing {} m)",
                gate_spacing_m
            )));
        }

        Ok(Self {
            rays,
            tolerance_deg,
            first_gate_m,
            gate_spacing_m,
            ngates,
        })
    }

    /// Flat `ray * ngates + gate` index of the gate under a point given in
    /// kilometres east (`x`) and north (`y`) of the radar.
    pub fn locate(&self, x_km: f32, y_km: f32) -> Option<usize> {
        let range_m = x_km.hypot(y_km) * 1000.0;
        let gate = ((range_m - self.first_gate_m) / self.gate_spacing_m).round();
        if gate < 0.0 || gate as usize >= self.ngates {
            return None;
        }

        let azimuth = x_km.atan2(y_km).to_degrees().rem_euclid(360.0);
        let ray = self.nearest_ray(azimuth)?;
        Some(ray * self.ngates + gate as usize)
    }

    fn nearest_ray(&self, azimuth: f32) -> Option<usize> {
        let n = self.rays.len();
        let idx = self.rays.partition_point(|(az, _)| *az < azimuth);
        let after = self.rays[idx % n];
        let before = self.rays[(idx + n - 1) % n];

        let (dist, ray) = [before, after]
            .iter()
            .map(|(az, ray)| (angular_distance(*az, azimuth), *ray))
            .min_by(|a, b| a.0.total_cmp(&b.0))?;

        (dist <= self.tolerance_deg).then_some(ray)
    }
}

fn angular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

fn median_spacing(sorted: &[(f32, usize)]) -> f32 {
    if sorted.len() < 2 {
        return 1.0;
    }
    let mut gaps: Vec<f32> = sorted.windows(2).map(|w| w[1].0 - w[0].0).filter(|g| *g > 0.0).collect();
    if gaps.is_empty() {
        return 1.0;
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    gaps[gaps.len() / 2]
}

/// Gate index under every pixel of a square panel.
#[derive(Debug, Clone)]
pub struct PanelGrid {
    size: u32,
    cells: Vec<Option<usize>>,
}

impl PanelGrid {
    /// Sample `index` over `[-extent_km, extent_km]` in both axes, north up.
    pub fn new(index: &PolarIndex, size: u32, extent_km: f32) -> Self {
        let step = 2.0 * extent_km / size as f32;
        let cells = (0..size * size)
            .into_par_iter()
            .map(|i| {
                let px = (i % size) as f32;
                let py = (i / size) as f32;
                let x = -extent_km + (px + 0.5) * step;
                let y = extent_km - (py + 0.5) * step;
                index.locate(x, y)
            })
            .collect();
        Self { size, cells }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row-major gate indices, `None` outside the sweep coverage.
    pub fn cells(&self) -> &[Option<usize>] {
        &self.cells
    }
}
