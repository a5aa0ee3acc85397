//! Spatial index for fast viewport lookups.

use std::sync::Arc;

use geo::{coord, Rect};
use rstar::{Envelope, RTree, RTreeObject, AABB};
use tracing::{debug, info};

use super::BasemapFeature;
use crate::models::BoundingBox;

/// Wrapper for R-tree indexing of basemap features
#[derive(Debug, Clone)]
pub struct IndexedFeature {
    pub feature: Arc<BasemapFeature>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedFeature {
    pub fn new(feature: Arc<BasemapFeature>) -> Option<Self> {
        let rect = feature.bounding_rect()?;
        Some(Self {
            feature,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }
}

/// R-tree over feature envelopes
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    tree: RTree<IndexedFeature>,
}

impl FeatureIndex {
    pub fn build(features: &[Arc<BasemapFeature>]) -> Self {
        let indexed: Vec<IndexedFeature> = features
            .iter()
            .cloned()
            .filter_map(IndexedFeature::new)
            .collect();

        let skipped = features.len() - indexed.len();
        if skipped > 0 {
            debug!("Skipped {} features without coordinates", skipped);
        }

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} features", tree.size());
        Self { tree }
    }

    /// Features whose envelope intersects `bbox`
    pub fn intersecting<'a>(
        &'a self,
        bbox: &BoundingBox,
    ) -> impl Iterator<Item = &'a BasemapFeature> + 'a {
        self.tree
            .locate_in_envelope_intersecting(&bbox.envelope())
            .map(|indexed| indexed.feature.as_ref())
    }

    /// Envelope of everything in the index
    pub fn extent(&self) -> Option<Rect<f64>> {
        let envelope = self
            .tree
            .iter()
            .map(|indexed| indexed.envelope)
            .reduce(|a, b| a.merged(&b))?;
        let (lower, upper) = (envelope.lower(), envelope.upper());
        Some(Rect::new(
            coord! { x: lower[0], y: lower[1] },
            coord! { x: upper[0], y: upper[1] },
        ))
    }
}
