//! Quicklook rendering for radar PPI sweeps.
//!
//! Implements:
//! - Colour maps (discrete, continuous, listed) and linear/log normalisation
//! - Polar-to-Cartesian nearest-gate sampling
//! - Multi-panel composites with range rings, colour bars and titles
//! - PNG encoding (indexed when the palette fits)

pub mod canvas;
pub mod error;
pub mod gradient;
pub mod png;
pub mod ppi;
pub mod quicklook;
pub mod style;

pub use error::{RenderError, RenderResult};
pub use quicklook::{PanelOutcome, PpiRenderer, QuicklookRenderer, RenderReport, SkipReason};
pub use style::validate_layout_styles;
