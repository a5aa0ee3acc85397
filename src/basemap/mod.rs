//! Vector basemap: polygon and line features with a CRS tag.
//!
//! Features are indexed in an R-tree so each view only visits what
//! intersects its bounding box.

mod index;
mod loader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo::{BooleanOps, BoundingRect, MultiLineString, MultiPolygon, Rect};
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{BoundingBox, Crs};

pub use index::FeatureIndex;
pub use loader::{find_shapefile, load_polygons};

/// One drawable basemap feature
#[derive(Debug, Clone, PartialEq)]
pub enum BasemapFeature {
    /// Filled area (landmass, island, lake)
    Area(MultiPolygon<f64>),
    /// Stroked line (coastline, river, border)
    Line(MultiLineString<f64>),
}

impl BasemapFeature {
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            BasemapFeature::Area(mp) => mp.bounding_rect(),
            BasemapFeature::Line(ml) => ml.bounding_rect(),
        }
    }

    /// The part of this feature inside `bbox`, or `None` if nothing is left.
    pub fn clip_to(&self, bbox: &BoundingBox) -> Option<BasemapFeature> {
        let window = bbox.to_rect().to_polygon();
        match self {
            BasemapFeature::Area(mp) => {
                let clipped = mp.intersection(&MultiPolygon::new(vec![window]));
                (!clipped.0.is_empty()).then_some(BasemapFeature::Area(clipped))
            }
            BasemapFeature::Line(_) => self.outline_within(bbox).map(BasemapFeature::Line),
        }
    }

    /// Boundary of this feature inside `bbox`: polygon rings (holes included)
    /// or the lines themselves, cut at the window without tracing its edge.
    pub fn outline_within(&self, bbox: &BoundingBox) -> Option<MultiLineString<f64>> {
        let window = bbox.to_rect().to_polygon();
        let clipped = match self {
            BasemapFeature::Area(mp) => {
                let rings = mp
                    .0
                    .iter()
                    .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
                    .cloned()
                    .collect();
                window.clip(&MultiLineString::new(rings), false)
            }
            BasemapFeature::Line(ml) => window.clip(ml, false),
        };
        (!clipped.0.is_empty()).then_some(clipped)
    }
}

/// Loaded basemap. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Basemap {
    features: Vec<Arc<BasemapFeature>>,
    index: FeatureIndex,
    crs: Crs,
    source: Option<PathBuf>,
}

impl Basemap {
    pub fn new(features: Vec<BasemapFeature>, crs: Crs) -> Self {
        let features: Vec<Arc<BasemapFeature>> = features.into_iter().map(Arc::new).collect();
        let index = FeatureIndex::build(&features);
        Self {
            features,
            index,
            crs,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Re-tag the basemap with `crs` (EPSG code, PROJ string or WKT).
    ///
    /// Coordinates are left untouched. A non-geographic CRS or data outside
    /// lon/lat range is logged, since the map is drawn in degrees.
    pub fn set_crs(mut self, crs: &str) -> Result<Self> {
        let crs = Crs::parse(crs)?;
        if crs != self.crs {
            info!("Assigning CRS {} (was {})", crs, self.crs);
        }
        if !crs.is_geographic() {
            warn!("CRS {} is not geographic; coordinates are drawn as lon/lat degrees", crs);
        }
        if let Some(rect) = self.bounding_rect() {
            let (min, max) = (rect.min(), rect.max());
            if min.x < -180.0 || max.x > 180.0 || min.y < -90.0 || max.y > 90.0 {
                warn!(
                    "Basemap extent ({:.3}, {:.3}) - ({:.3}, {:.3}) is outside lon/lat range",
                    min.x, min.y, max.x, max.y
                );
            }
        }
        self.crs = crs;
        Ok(self)
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Envelope of all features
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.index.extent()
    }

    /// Features whose envelope intersects `bbox`, clipped to it
    pub fn clipped_to(&self, bbox: &BoundingBox) -> Vec<BasemapFeature> {
        self.index
            .intersecting(bbox)
            .filter_map(|feature| feature.clip_to(bbox))
            .collect()
    }

    /// Outlines of the features intersecting `bbox`, clipped to it as lines
    pub fn outlines_in(&self, bbox: &BoundingBox) -> Vec<MultiLineString<f64>> {
        self.index
            .intersecting(bbox)
            .filter_map(|feature| feature.outline_within(bbox))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString};

    fn square(x0: f64, y0: f64, size: f64) -> BasemapFeature {
        BasemapFeature::Area(MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]]))
    }

    #[test]
    fn test_clip_area() {
        let feature = square(0.0, 0.0, 10.0);
        let bbox = BoundingBox::new(2.0, 4.0, 2.0, 4.0);

        let clipped = feature.clip_to(&bbox).unwrap();
        let rect = clipped.bounding_rect().unwrap();
        assert!((rect.min().x - 2.0).abs() < 1e-9 && (rect.max().x - 4.0).abs() < 1e-9);
        assert!((rect.min().y - 2.0).abs() < 1e-9 && (rect.max().y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_line() {
        let line = BasemapFeature::Line(MultiLineString::new(vec![LineString::from(vec![
            (-5.0, 1.0),
            (5.0, 1.0),
        ])]));
        let bbox = BoundingBox::new(0.0, 2.0, 0.0, 2.0);

        let clipped = line.clip_to(&bbox).unwrap();
        let rect = clipped.bounding_rect().unwrap();
        assert!(rect.min().x >= -1e-9 && rect.max().x <= 2.0 + 1e-9);
    }

    #[test]
    fn test_outline_stays_off_window_edge() {
        let feature = BasemapFeature::Area(MultiPolygon::new(vec![polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
            ],
            interiors: [[
                (x: 1.0, y: 1.0),
                (x: 2.0, y: 1.0),
                (x: 2.0, y: 2.0),
                (x: 1.0, y: 2.0),
            ]],
        )]));
        let bbox = BoundingBox::new(-5.0, 5.0, -5.0, 5.0);

        let outline = feature.outline_within(&bbox).unwrap();
        let coords: Vec<_> = outline.0.iter().flat_map(|l| l.coords()).collect();
        // Only the square's own edges and the hole, never the window edge at 5
        assert!(coords.iter().all(|c| c.x < 5.0 - 1e-9 || c.y < 5.0 - 1e-9));
        assert!(coords.iter().any(|c| (c.x - 2.0).abs() < 1e-9 && (c.y - 2.0).abs() < 1e-9));
        assert!(!coords
            .iter()
            .any(|c| (c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_clip_disjoint_is_none() {
        let feature = square(0.0, 0.0, 1.0);
        let bbox = BoundingBox::new(50.0, 51.0, 50.0, 51.0);
        assert!(feature.clip_to(&bbox).is_none());
    }

    #[test]
    fn test_clipped_to_uses_index() {
        let basemap = Basemap::new(
            vec![square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0), square(0.5, 0.5, 1.0)],
            Crs::wgs84(),
        );
        let bbox = BoundingBox::new(0.0, 2.0, 0.0, 2.0);
        assert_eq!(basemap.clipped_to(&bbox).len(), 2);
        assert_eq!(basemap.len(), 3);
    }

    #[test]
    fn test_set_crs() {
        let basemap = Basemap::new(vec![square(0.0, 0.0, 1.0)], Crs::Epsg(4269));
        let basemap = basemap.set_crs("EPSG:4326").unwrap();
        assert_eq!(basemap.crs(), &Crs::wgs84());

        let basemap = basemap.set_crs("+proj=utm +zone=10").unwrap();
        assert!(!basemap.crs().is_geographic());

        assert!(basemap.set_crs("not a crs").is_err());
    }
}
