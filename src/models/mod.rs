//! Core data models for the map pipeline.

pub mod bbox;
pub mod crs;
pub mod site;

pub use bbox::{BoundingBox, DEFAULT_MARGIN};
pub use crs::Crs;
pub use site::{SiteRecord, SiteTable};
