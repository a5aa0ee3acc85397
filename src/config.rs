//! Map configuration, loaded from an optional TOML file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::layout::InsetAnchor;
use crate::models::{Crs, DEFAULT_MARGIN};
use crate::style::{ColorScale, Rgb};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Padding around the site extrema, in degrees
    pub margin: f64,
    /// CRS assigned to the basemap
    pub crs: String,
    pub inset: InsetAnchor,
    pub colors: ColorScale,
    pub output: OutputConfig,
    pub overview: OverviewConfig,
    pub style: StyleConfig,
    pub columns: ColumnsConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            crs: "EPSG:4326".to_string(),
            inset: InsetAnchor::default(),
            colors: ColorScale::default(),
            output: OutputConfig::default(),
            overview: OverviewConfig::default(),
            style: StyleConfig::default(),
            columns: ColumnsConfig::default(),
        }
    }
}

/// Largest raster side accepted, in pixels
pub const MAX_PIXELS_PER_SIDE: u32 = 20_000;

/// Physical size and resolution of the exported PNG
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width_in: 7.5,
            height_in: 5.5,
            dpi: 600,
        }
    }
}

impl OutputConfig {
    /// Raster size in pixels: inches times DPI, rounded
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Extra degrees around the study area shown in the inset
    pub margin: f64,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self { margin: 1.0 }
    }
}

/// Fills, strokes and annotations. Sizes are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background: Rgb,
    pub water: Rgb,
    pub land: Rgb,
    pub outline: Rgb,
    pub outline_width: f64,
    pub point_radius: f64,
    pub point_outline: Rgb,
    pub study_area: Rgb,
    pub study_area_width: f64,
    pub frame: Rgb,
    pub frame_width: f64,
    /// Blank space between the canvas edge and the map panel
    pub padding: f64,
    /// Graticule spacing in degrees, none when unset
    pub graticule: Option<f64>,
    pub graticule_color: Rgb,
    pub legend: bool,
    pub north_arrow: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: Rgb::WHITE,
            water: Rgb::new(0xD6, 0xEA, 0xF8),
            land: Rgb::new(0xE8, 0xE4, 0xD8),
            outline: Rgb::new(0x6E, 0x6E, 0x6E),
            outline_width: 0.5,
            point_radius: 3.0,
            point_outline: Rgb::BLACK,
            study_area: Rgb::new(0xD7, 0x19, 0x1C),
            study_area_width: 1.0,
            frame: Rgb::BLACK,
            frame_width: 0.75,
            padding: 12.0,
            graticule: None,
            graticule_color: Rgb::new(0xB0, 0xB0, 0xB0),
            legend: true,
            north_arrow: true,
        }
    }
}

/// Explicit site table headers. Unset fields fall back to common aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub id: Option<String>,
    pub lat: Option<String>,
    pub long: Option<String>,
    pub temp: Option<String>,
}

impl MapConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MapError::InputNotFound {
                what: "config file",
                path: path.to_path_buf(),
            },
            _ => MapError::Io(e),
        })?;
        let config: MapConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check everything that can be checked before touching input files.
    pub fn validate(&self) -> Result<()> {
        positive("margin", self.margin)?;
        positive("overview.margin", self.overview.margin)?;
        Crs::parse(&self.crs)?;
        self.inset.validate()?;

        positive("output.width_in", self.output.width_in)?;
        positive("output.height_in", self.output.height_in)?;
        if self.output.dpi == 0 {
            return Err(MapError::invalid_config("output.dpi", 0, "must be positive"));
        }
        let dpi = self.output.dpi as f64;
        for (name, inches) in [
            ("output.width_in", self.output.width_in),
            ("output.height_in", self.output.height_in),
        ] {
            let px = (inches * dpi).round();
            if px > MAX_PIXELS_PER_SIDE as f64 {
                return Err(MapError::invalid_config(
                    name,
                    inches,
                    format!(
                        "{} px at {} dpi exceeds the {} px limit",
                        px, self.output.dpi, MAX_PIXELS_PER_SIDE
                    ),
                ));
            }
        }
        let (w, h) = self.output.pixel_dimensions();
        if w == 0 || h == 0 {
            return Err(MapError::invalid_config(
                "output",
                format!("{}x{}", w, h),
                "output rounds to an empty raster",
            ));
        }
        // Keep the inset at least one pixel in each direction
        self.inset.place(w, h)?;

        positive("style.point_radius", self.style.point_radius)?;
        non_negative("style.outline_width", self.style.outline_width)?;
        non_negative("style.study_area_width", self.style.study_area_width)?;
        non_negative("style.frame_width", self.style.frame_width)?;
        non_negative("style.padding", self.style.padding)?;
        if let Some(step) = self.style.graticule {
            positive("style.graticule", step)?;
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MapError::invalid_config(name, value, "must be positive"));
    }
    Ok(())
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MapError::invalid_config(name, value, "must not be negative"));
    }
    Ok(())
}
