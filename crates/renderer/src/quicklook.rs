//! Multi-panel PPI quicklook rendering.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use radar_common::{FieldSpec, QuicklookLayout, RadarRecord};
use rayon::prelude::*;
use rusttype::Font;
use tracing::{debug, warn};

use crate::canvas::{Canvas, GridGeometry, Tick};
use crate::error::{RenderError, RenderResult};
use crate::gradient::{Color, ValueRange};
use crate::ppi::{PanelGrid, PolarIndex};
use crate::style::{parse_color, resolve_colormap};

/// Why a panel was left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    Rendered,
    Skipped(SkipReason),
}

/// What one render call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub path: PathBuf,
    /// `(field, outcome)` in layout order.
    pub panels: Vec<(String, PanelOutcome)>,
}

impl RenderReport {
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.panels
            .iter()
            .filter(|(_, outcome)| matches!(outcome, PanelOutcome::Skipped(_)))
            .map(|(field, _)| field.as_str())
    }

    pub fn rendered_count(&self) -> usize {
        self.panels
            .iter()
            .filter(|(_, outcome)| *outcome == PanelOutcome::Rendered)
            .count()
    }
}

/// Turns one decoded sweep into a quicklook image on disk.
///
/// `cancelled` is polled between panels; once it returns true the render
/// stops with [`RenderError::Cancelled`] and nothing is written.
pub trait QuicklookRenderer: Send + Sync {
    fn render(
        &self,
        record: &RadarRecord,
        layout: &QuicklookLayout,
        path: &Path,
        cancelled: &dyn Fn() -> bool,
    ) -> RenderResult<RenderReport>;
}

/// Nearest-gate PPI renderer with optional panel titles.
#[derive(Clone, Default)]
pub struct PpiRenderer {
    font: Option<Arc<Font<'static>>>,
}

impl fmt::Debug for PpiRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PpiRenderer")
            .field("titles", &self.font.is_some())
            .finish()
    }
}

impl PpiRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: Arc<Font<'static>>) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TrueType/OpenType font for panel titles.
    pub fn load_font(path: &Path) -> RenderResult<Font<'static>> {
        let bytes = std::fs::read(path)?;
        Font::try_from_vec(bytes).ok_or_else(|| RenderError::Font(path.display().to_string()))
    }

    fn paint(
        &self,
        canvas: &mut Canvas<'_>,
        index: usize,
        spec: &FieldSpec,
        data: &[f32],
        grid: &PanelGrid,
        mask: &[bool],
    ) -> RenderResult<()> {
        let colormap = resolve_colormap(&spec.colormap)?;
        let range = ValueRange::resolve(spec.vmin, spec.vmax, spec.scale, data);

        let pixels: Vec<Option<Color>> = grid
            .cells()
            .par_iter()
            .map(|cell| {
                let gate = (*cell)?;
                if spec.gatefilter && mask.get(gate).copied().unwrap_or(true) {
                    return None;
                }
                let t = range.normalize(*data.get(gate)?)?;
                Some(colormap.sample(t))
            })
            .collect();

        canvas.paint_panel(index, &pixels);
        canvas.draw_colorbar(index, &colormap, &colorbar_ticks(spec, &range));
        Ok(())
    }
}

/// Class names at bin centres when the panel has labels, otherwise the
/// bounds and midpoint of the colour axis.
pub fn colorbar_ticks(spec: &FieldSpec, range: &ValueRange) -> Vec<Tick> {
    if let Some(labels) = spec.labels.as_ref().filter(|l| !l.is_empty()) {
        let n = labels.len() as f32;
        return labels
            .iter()
            .enumerate()
            .map(|(k, label)| Tick {
                t: (k as f32 + 0.5) / n,
                label: label.clone(),
            })
            .collect();
    }
    [0.0, 0.5, 1.0]
        .into_iter()
        .map(|t| Tick {
            t,
            label: format_tick(range.value_at(t)),
        })
        .collect()
}

fn format_tick(value: f32) -> String {
    if value.abs() >= 10.0 {
        return format!("{:.0}", value);
    }
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl QuicklookRenderer for PpiRenderer {
    fn render(
        &self,
        record: &RadarRecord,
        layout: &QuicklookLayout,
        path: &Path,
        cancelled: &dyn Fn() -> bool,
    ) -> RenderResult<RenderReport> {
        for name in layout.required_fields() {
            if !record.has_field(name) {
                return Err(RenderError::MissingRequiredField(name.to_string()));
            }
        }

        let expected = record.nrays() * record.ngates();
        // Gates the mask field flags as invalid.
        let mask: Vec<bool> = record
            .field(&layout.mask_field)
            .map(|f| f.data.iter().map(|v| !v.is_finite()).collect())
            .unwrap_or_else(|| vec![true; expected]);

        let index = PolarIndex::new(record)?;
        let grid = PanelGrid::new(&index, layout.panel_size, layout.extent_km);
        let ring_color = parse_color(&layout.ring_color)?;
        let rings_px: Vec<f32> = layout
            .range_rings_km
            .iter()
            .map(|km| km / (2.0 * layout.extent_km) * layout.panel_size as f32)
            .collect();

        let mut canvas = Canvas::new(GridGeometry::from_layout(layout), self.font.as_deref());
        let stamp = record.time.format("%Y-%m-%dT%H:%M");
        let mut panels = Vec::with_capacity(layout.panels.len());

        for (i, spec) in layout.panels.iter().enumerate() {
            if cancelled() {
                return Err(RenderError::Cancelled);
            }

            let outcome = match record.field(&spec.field) {
                Some(field) if field.data.len() == expected => {
                    self.paint(&mut canvas, i, spec, &field.data, &grid, &mask)?;
                    PanelOutcome::Rendered
                }
                Some(field) => {
                    return Err(RenderError::InvalidSweep(format!(
                        "{} has {} values, expected {}",
                        spec.field,
                        field.data.len(),
                        expected
                    )));
                }
                None => {
                    warn!(field = %spec.field, "Field not found in sweep, leaving panel blank");
                    PanelOutcome::Skipped(SkipReason::MissingField)
                }
            };

            canvas.draw_rings(i, &rings_px, ring_color);
            canvas.draw_frame(i);
            canvas.draw_title(i, &format!("{} {}", spec.title(), stamp));
            panels.push((spec.field.clone(), outcome));
        }

        let png = canvas.into_png().map_err(RenderError::Encode)?;
        if cancelled() {
            return Err(RenderError::Cancelled);
        }
        write_atomic(path, &png)?;

        debug!(
            path = %path.display(),
            bytes = png.len(),
            panels = panels.len(),
            "Quicklook written"
        );

        Ok(RenderReport {
            path: path.to_path_buf(),
            panels,
        })
    }
}

/// Write through a sibling temp file so readers never see a partial PNG.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".quicklook-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
