//! Common types shared by the radar decode, georeference and render crates.

pub mod angle;
pub mod bbox;
pub mod color;
pub mod error;
pub mod layer;
pub mod site;
pub mod time;
pub mod vcp;

pub use angle::{clockwise_delta, normalize_azimuth};
pub use bbox::BoundingBox;
pub use color::Rgba;
pub use error::{RadarError, RadarResult};
pub use layer::{LayerId, ProductCode};
pub use site::{SiteCatalog, SiteInfo, SiteMetadata};
pub use time::{datetime_from_julian, julian_from_datetime};
pub use vcp::vcp_description;
