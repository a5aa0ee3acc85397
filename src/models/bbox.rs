//! Padded latitude/longitude bounding box around a set of sites.

use geo::{coord, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

use super::SiteRecord;
use crate::error::{MapError, Result};

/// Padding applied around the site extrema, in degrees
pub const DEFAULT_MARGIN: f64 = 0.05;

/// Rectangular lat/long extent used to frame a map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub long_min: f64,
    pub long_max: f64,
}

impl BoundingBox {
    pub fn new(lat_min: f64, lat_max: f64, long_min: f64, long_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            long_min,
            long_max,
        }
    }

    /// Derive the box from site extrema, padding every side by `margin`.
    ///
    /// Fails on an empty collection instead of returning infinite bounds.
    pub fn from_sites(sites: &[SiteRecord], margin: f64) -> Result<Self> {
        check_margin("margin", margin)?;

        let (first, rest) = sites.split_first().ok_or(MapError::EmptySiteTable)?;
        let mut bbox = Self::new(first.lat, first.lat, first.long, first.long);
        for site in rest {
            bbox.lat_min = bbox.lat_min.min(site.lat);
            bbox.lat_max = bbox.lat_max.max(site.lat);
            bbox.long_min = bbox.long_min.min(site.long);
            bbox.long_max = bbox.long_max.max(site.long);
        }

        Ok(bbox.padded(margin))
    }

    /// A new box grown by `margin` degrees on every side
    pub fn expand(&self, margin: f64) -> Result<Self> {
        check_margin("overview.margin", margin)?;
        Ok(self.padded(margin))
    }

    fn padded(&self, margin: f64) -> Self {
        Self {
            lat_min: self.lat_min - margin,
            lat_max: self.lat_max + margin,
            long_min: self.long_min - margin,
            long_max: self.long_max + margin,
        }
    }

    pub fn contains(&self, lat: f64, long: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && long >= self.long_min && long <= self.long_max
    }

    /// Longitude span in degrees
    pub fn width(&self) -> f64 {
        self.long_max - self.long_min
    }

    /// Latitude span in degrees
    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// (lat, long) of the box centre
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.long_min + self.long_max) / 2.0,
        )
    }

    /// Width/height ratio on the ground, with longitude shrunk by cos(latitude).
    pub fn aspect_ratio(&self) -> f64 {
        let (mid_lat, _) = self.center();
        let ground_width = self.width() * mid_lat.to_radians().cos().max(f64::EPSILON);
        ground_width / self.height()
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.long_min, y: self.lat_min },
            coord! { x: self.long_max, y: self.lat_max },
        )
    }

    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.long_min, self.lat_min], [self.long_max, self.lat_max])
    }
}

fn check_margin(name: &'static str, margin: f64) -> Result<()> {
    if !margin.is_finite() || margin <= 0.0 {
        return Err(MapError::invalid_config(name, margin, "must be a positive number of degrees"));
    }
    Ok(())
}
