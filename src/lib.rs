//! Sitemap - annotated field-site maps with an overview inset
//!
//! This library provides the loaders, layout and rendering used by the
//! `sitemap` binary.

pub mod basemap;
pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod sites;
pub mod style;
pub mod summary;

pub use config::MapConfig;
pub use error::{MapError, Result};
pub use models::{BoundingBox, Crs, SiteRecord, SiteTable};
pub use pipeline::{compose, run, PipelineInputs};
