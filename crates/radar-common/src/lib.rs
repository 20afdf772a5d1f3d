//! Common types shared by the radar quicklook crates.

pub mod error;
pub mod layout;
pub mod locator;
pub mod record;
pub mod time;

pub use error::{ConfigError, ConfigResult};
pub use layout::{ColormapSpec, FieldSpec, QuicklookLayout, ValueScale};
pub use locator::{JobDescriptor, OutputLocator};
pub use record::{RadarField, RadarRecord};
pub use time::DateRange;
