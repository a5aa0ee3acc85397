//! JSON sidecar describing a finished map.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::layout::PixelRect;
use crate::models::BoundingBox;
use crate::pipeline::MapOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSummary {
    pub output: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: u32,
    pub crs: String,
    pub bounds: BoundingBox,
    pub center: Center,
    pub overview_extent: BoundingBox,
    pub inset: PixelRect,
    pub site_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TemperatureRange>,
}

impl MapSummary {
    pub fn new(outcome: &MapOutcome, output: &Path, dpi: u32) -> Self {
        let (lat, long) = outcome.bbox.center();
        let (width_px, height_px) = outcome.dimensions;
        Self {
            output: output.to_path_buf(),
            width_px,
            height_px,
            dpi,
            crs: outcome.crs.identifier(),
            bounds: outcome.bbox,
            center: Center { lat, long },
            overview_extent: outcome.overview_extent,
            inset: outcome.inset,
            site_count: outcome.site_count,
            temperature: outcome
                .temperature_range
                .map(|(min, max)| TemperatureRange { min, max }),
        }
    }

    /// Write as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("Wrote summary to {}", path.display());
        Ok(())
    }
}
