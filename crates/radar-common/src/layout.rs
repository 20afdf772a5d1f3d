//! Quicklook panel layout.
//!
//! A layout is an ordered list of [`FieldSpec`]s plus the geometry shared by
//! every panel. It is loaded from YAML, or taken from
//! [`QuicklookLayout::default`], which reproduces the standard 3x3 CPOL
//! quality-control sheet:
//!
//! ```yaml
//! mask_field: corrected_reflectivity
//! columns: 3
//! panels:
//!   - field: corrected_reflectivity
//!     colormap: NWSRef
//!     vmin: -15
//!     vmax: 75
//!     gatefilter: true
//!     required: true
//!   - field: radar_echo_classification
//!     colormap: ["#FFFFFF", "#ADD8E6", "#4682B4"]
//!     labels: [None, Drizzle, Rain]
//!     vmin: 0
//!     vmax: 2
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Colour map reference: a built-in name or an explicit list of hex colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColormapSpec {
    Named(String),
    Listed(Vec<String>),
}

impl Default for ColormapSpec {
    fn default() -> Self {
        ColormapSpec::Named("HomeyerRainbow".to_string())
    }
}

/// How data values map onto the `[0, 1]` colour axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueScale {
    #[default]
    Linear,
    Log,
}

/// One panel of the quicklook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the radar file.
    pub field: String,
    /// Panel title override; the field name is used otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub colormap: ColormapSpec,
    /// Lower colour bound; the data minimum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmin: Option<f32>,
    /// Upper colour bound; the data maximum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmax: Option<f32>,
    #[serde(default)]
    pub scale: ValueScale,
    /// Hide gates flagged invalid by the layout's mask field.
    #[serde(default)]
    pub gatefilter: bool,
    /// A missing required field fails the whole file instead of skipping the panel.
    #[serde(default)]
    pub required: bool,
    /// Colour bar class names, one per entry of a listed colour map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl FieldSpec {
    pub fn new(field: &str, colormap: ColormapSpec) -> Self {
        Self {
            field: field.to_string(),
            title: None,
            colormap,
            vmin: None,
            vmax: None,
            scale: ValueScale::Linear,
            gatefilter: false,
            required: false,
            labels: None,
        }
    }

    pub fn bounds(mut self, vmin: f32, vmax: f32) -> Self {
        self.vmin = Some(vmin);
        self.vmax = Some(vmax);
        self
    }

    pub fn log(mut self) -> Self {
        self.scale = ValueScale::Log;
        self
    }

    pub fn filtered(mut self) -> Self {
        self.gatefilter = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn labelled(mut self, labels: &[&str]) -> Self {
        self.labels = Some(labels.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.field)
    }
}

fn default_mask_field() -> String {
    "corrected_reflectivity".to_string()
}

fn default_columns() -> usize {
    3
}

fn default_panel_size() -> u32 {
    400
}

fn default_extent_km() -> f32 {
    150.0
}

fn default_range_rings_km() -> Vec<f32> {
    vec![50.0, 100.0, 150.0]
}

fn default_ring_color() -> String {
    "#CDCDCD".to_string()
}

/// Ordered panel list plus the window shared by all panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuicklookLayout {
    /// Field whose invalid gates form the validity mask. Always required.
    #[serde(default = "default_mask_field")]
    pub mask_field: String,
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Side of each square panel in pixels.
    #[serde(default = "default_panel_size")]
    pub panel_size: u32,
    /// Half-width of the plotted window in kilometres.
    #[serde(default = "default_extent_km")]
    pub extent_km: f32,
    #[serde(default = "default_range_rings_km")]
    pub range_rings_km: Vec<f32>,
    #[serde(default = "default_ring_color")]
    pub ring_color: String,
    pub panels: Vec<FieldSpec>,
}

/// Largest accepted panel side in pixels.
pub const MAX_PANEL_SIZE: u32 = 4096;
/// Largest accepted plot extent or range ring radius.
pub const MAX_RANGE_KM: f32 = 1000.0;
pub const MAX_RANGE_RINGS: usize = 32;

/// Hydrometeor classification classes, in class-index order.
const HCA_LABELS: [&str; 11] = [
    "None",
    "Drizzle",
    "Rain",
    "Ice Crystals",
    "Aggregates",
    "Wet Snow",
    "Vertical Ice",
    "LD Graupel",
    "HD Graupel",
    "Hail",
    "Big Drops",
];

const HCA_COLORS: [&str; 11] = [
    "#FFFFFF", "#ADD8E6", "#4682B4", "#0000CD", "#DDA0DD", "#9370DB", "#BF00BF", "#008000",
    "#9ACD32", "#FFD700", "#FF0000",
];

impl Default for QuicklookLayout {
    fn default() -> Self {
        let named = |n: &str| ColormapSpec::Named(n.to_string());
        let hca = ColormapSpec::Listed(HCA_COLORS.iter().map(|c| c.to_string()).collect());

        Self {
            mask_field: default_mask_field(),
            columns: default_columns(),
            panel_size: default_panel_size(),
            extent_km: default_extent_km(),
            range_rings_km: default_range_rings_km(),
            ring_color: default_ring_color(),
            panels: vec![
                FieldSpec::new("corrected_reflectivity", named("NWSRef"))
                    .bounds(-15.0, 75.0)
                    .filtered()
                    .required(),
                FieldSpec::new("radar_estimated_rain_rate", named("HomeyerRainbow"))
                    .bounds(1e-2, 1e2)
                    .log()
                    .required(),
                FieldSpec::new("radar_echo_classification", hca)
                    .bounds(0.0, 10.0)
                    .labelled(&HCA_LABELS)
                    .required(),
                FieldSpec::new("corrected_differential_reflectivity", named("RefDiff"))
                    .bounds(-1.0, 8.0)
                    .filtered()
                    .required(),
                FieldSpec::new("corrected_differential_phase", named("Wild25"))
                    .bounds(-180.0, 180.0)
                    .filtered(),
                FieldSpec::new("corrected_specific_differential_phase", named("Theodore16"))
                    .bounds(-2.0, 5.0)
                    .filtered(),
                FieldSpec::new("velocity", named("BuDRd18")).bounds(-30.0, 30.0),
                FieldSpec::new("corrected_velocity", named("BuDRd18"))
                    .bounds(-30.0, 30.0)
                    .filtered(),
                FieldSpec::new("cross_correlation_ratio", named("RefDiff")).bounds(0.5, 1.05),
            ],
        }
    }
}

impl QuicklookLayout {
    /// Parse and validate a layout from YAML.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let layout: Self = serde_yaml::from_str(yaml)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load and validate a layout file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn rows(&self) -> usize {
        self.panels.len().div_ceil(self.columns.max(1))
    }

    /// Names of every field whose absence fails the file, mask field first.
    pub fn required_fields(&self) -> Vec<&str> {
        let mut names = vec![self.mask_field.as_str()];
        for spec in self.panels.iter().filter(|s| s.required) {
            if !names.contains(&spec.field.as_str()) {
                names.push(spec.field.as_str());
            }
        }
        names
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::InvalidLayout(msg));

        if self.panels.is_empty() {
            return invalid("layout has no panels".to_string());
        }
        if self.columns == 0 {
            return invalid("columns must be at least 1".to_string());
        }
        if self.panel_size < 64 {
            return invalid(format!("panel_size {} is below 64 px", self.panel_size));
        }
        if self.panel_size > MAX_PANEL_SIZE {
            return invalid(format!(
                "panel_size {} exceeds {} px",
                self.panel_size, MAX_PANEL_SIZE
            ));
        }
        if !(self.extent_km > 0.0 && self.extent_km <= MAX_RANGE_KM) {
            return invalid(format!(
                "extent_km must be in (0, {}], got {}",
                MAX_RANGE_KM, self.extent_km
            ));
        }
        if self.mask_field.trim().is_empty() {
            return invalid("mask_field is empty".to_string());
        }
        if self.range_rings_km.len() > MAX_RANGE_RINGS {
            return invalid(format!(
                "{} range rings, at most {} allowed",
                self.range_rings_km.len(),
                MAX_RANGE_RINGS
            ));
        }
        if let Some(ring) = self
            .range_rings_km
            .iter()
            .find(|r| !(**r > 0.0 && **r <= MAX_RANGE_KM))
        {
            return invalid(format!(
                "range ring {} km is outside (0, {}]",
                ring, MAX_RANGE_KM
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.panels {
            if spec.field.trim().is_empty() {
                return invalid("panel with empty field name".to_string());
            }
            if !seen.insert(spec.field.as_str()) {
                return invalid(format!("field '{}' appears twice", spec.field));
            }
            if let (Some(lo), Some(hi)) = (spec.vmin, spec.vmax) {
                if !(lo < hi) {
                    return invalid(format!(
                        "field '{}': vmin {} must be below vmax {}",
                        spec.field, lo, hi
                    ));
                }
            }
            if spec.scale == ValueScale::Log && spec.vmin.is_some_and(|v| v <= 0.0) {
                return invalid(format!(
                    "field '{}': log scale needs a positive vmin",
                    spec.field
                ));
            }
            if let ColormapSpec::Listed(colors) = &spec.colormap {
                if colors.is_empty() {
                    return invalid(format!("field '{}': empty colour list", spec.field));
                }
            }
            if let Some(labels) = &spec.labels {
                match &spec.colormap {
                    ColormapSpec::Listed(colors) if colors.len() == labels.len() => {}
                    ColormapSpec::Listed(colors) => {
                        return invalid(format!(
                            "field '{}': {} labels for {} colours",
                            spec.field,
                            labels.len(),
                            colors.len()
                        ))
                    }
                    ColormapSpec::Named(_) => {
                        return invalid(format!(
                            "field '{}': labels need a listed colour map",
                            spec.field
                        ))
                    }
                }
            }
        }
        if !seen.contains(self.mask_field.as_str()) {
            return invalid(format!("mask_field '{}' has no panel", self.mask_field));
        }
        Ok(())
    }
}
