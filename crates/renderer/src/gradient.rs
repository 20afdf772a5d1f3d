//! Colour ramps and value normalisation for radar panels.

use radar_common::ValueScale;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;

    Color::new(
        ((color1.r as f32 * t_inv) + (color2.r as f32 * t)).round() as u8,
        ((color1.g as f32 * t_inv) + (color2.g as f32 * t)).round() as u8,
        ((color1.b as f32 * t_inv) + (color2.b as f32 * t)).round() as u8,
        ((color1.a as f32 * t_inv) + (color2.a as f32 * t)).round() as u8,
    )
}

/// A colour ramp sampled on `[0, 1]`.
///
/// Continuous ramps interpolate between evenly spaced stops. Discrete ramps
/// split the axis into one equal bin per colour, like a listed colour map.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    colors: Vec<Color>,
    discrete: bool,
}

impl Colormap {
    pub fn continuous(colors: Vec<Color>) -> Self {
        Self {
            colors,
            discrete: false,
        }
    }

    pub fn discrete(colors: Vec<Color>) -> Self {
        Self {
            colors,
            discrete: true,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn is_discrete(&self) -> bool {
        self.discrete
    }

    /// Colour at normalised position `t`; out-of-range positions clamp to
    /// the end colours.
    pub fn sample(&self, t: f32) -> Color {
        let n = self.colors.len();
        match n {
            0 => return Color::transparent(),
            1 => return self.colors[0],
            _ => {}
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        if self.discrete {
            let idx = ((t * n as f32) as usize).min(n - 1);
            return self.colors[idx];
        }

        let pos = t * (n - 1) as f32;
        let low = (pos.floor() as usize).min(n - 2);
        interpolate_color(self.colors[low], self.colors[low + 1], pos - low as f32)
    }
}

/// Colour bounds of one panel after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub vmin: f32,
    pub vmax: f32,
    pub scale: ValueScale,
}

impl ValueRange {
    /// Bounds from explicit limits, falling back to the data extent.
    ///
    /// `data_range` is the finite min/max of the field. A log scale ignores
    /// non-positive data when choosing defaults.
    pub fn resolve(
        vmin: Option<f32>,
        vmax: Option<f32>,
        scale: ValueScale,
        data: &[f32],
    ) -> Self {
        let usable = |v: &f32| v.is_finite() && (scale == ValueScale::Linear || *v > 0.0);
        let (data_min, data_max) = data
            .iter()
            .copied()
            .filter(usable)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let mut lo = vmin.unwrap_or(if data_min.is_finite() { data_min } else { 0.0 });
        let mut hi = vmax.unwrap_or(if data_max.is_finite() { data_max } else { 1.0 });

        if scale == ValueScale::Log {
            if lo <= 0.0 {
                lo = 1e-3;
            }
            if hi <= lo {
                hi = lo * 10.0;
            }
        } else if (hi - lo).abs() < 0.001 {
            lo -= 0.5;
            hi += 0.5;
        }

        Self {
            vmin: lo,
            vmax: hi,
            scale,
        }
    }

    /// Data value at position `t` of the colour axis.
    pub fn value_at(&self, t: f32) -> f32 {
        match self.scale {
            ValueScale::Linear => self.vmin + t * (self.vmax - self.vmin),
            ValueScale::Log => (self.vmin.ln() + t * (self.vmax.ln() - self.vmin.ln())).exp(),
        }
    }

    /// Position of `value` on the colour axis, or `None` for masked values.
    pub fn normalize(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        let t = match self.scale {
            ValueScale::Linear => (value - self.vmin) / (self.vmax - self.vmin),
            ValueScale::Log => {
                if value <= 0.0 {
                    return None;
                }
                (value.ln() - self.vmin.ln()) / (self.vmax.ln() - self.vmin.ln())
            }
        };
        Some(t.clamp(0.0, 1.0))
    }
}
