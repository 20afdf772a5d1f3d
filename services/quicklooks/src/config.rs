//! Run configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use netcdf_parser::CfRadialDecoder;
use radar_common::QuicklookLayout;
use renderer::{validate_layout_styles, PpiRenderer};
use tracing::info;

use crate::driver::{DriverConfig, MAX_CONCURRENCY};
use crate::job::JobContext;

/// Everything a batch run needs, assembled from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Decode only, write nothing
    pub no_output: bool,
    pub concurrency: usize,
    pub job_timeout: Duration,
    pub layout_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    /// Sweep index rendered from each volume
    pub sweep: usize,
}

impl RunConfig {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            input_dir: self.input_dir.clone(),
            output_dir: (!self.no_output).then(|| self.output_dir.clone()),
            concurrency: self.concurrency.clamp(1, MAX_CONCURRENCY),
            job_timeout: self.job_timeout,
        }
    }

    pub fn layout(&self) -> Result<QuicklookLayout> {
        load_layout(self.layout_path.as_deref())
    }

    /// CF/Radial decoder plus PPI renderer, titles enabled when a font is set.
    pub fn job_context(&self) -> Result<JobContext> {
        build_context(self.layout()?, self.font_path.as_deref(), self.sweep)
    }
}

/// Layout from a YAML file, or the built-in 3x3 layout.
///
/// Every structural and colour check runs here, so a bad layout stops the
/// run before any file is processed.
pub fn load_layout(path: Option<&Path>) -> Result<QuicklookLayout> {
    let layout = match path {
        Some(path) => QuicklookLayout::from_file(path)
            .with_context(|| format!("Failed to load layout {}", path.display()))?,
        None => QuicklookLayout::default(),
    };
    layout.validate().context("Layout rejected")?;
    validate_layout_styles(&layout).context("Layout rejected")?;

    info!(
        source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".to_string()),
        panels = layout.panels.len(),
        mask_field = %layout.mask_field,
        "Loaded quicklook layout"
    );
    Ok(layout)
}

pub fn build_context(
    layout: QuicklookLayout,
    font: Option<&Path>,
    sweep: usize,
) -> Result<JobContext> {
    let renderer = match font {
        Some(path) => {
            let font = PpiRenderer::load_font(path)
                .with_context(|| format!("Failed to load font {}", path.display()))?;
            PpiRenderer::with_font(Arc::new(font))
        }
        None => PpiRenderer::new(),
    };

    Ok(JobContext::new(
        Arc::new(CfRadialDecoder::for_sweep(sweep)),
        Arc::new(renderer),
        layout,
    ))
}
