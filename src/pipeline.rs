//! End-to-end map production: load, derive, render, composite, export.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::basemap::{load_polygons, Basemap};
use crate::config::MapConfig;
use crate::error::Result;
use crate::layout::PixelRect;
use crate::models::{BoundingBox, Crs, SiteTable};
use crate::render::{render_map, Figure, Overlay, RenderContext};
use crate::sites::load_table;
use crate::summary::MapSummary;

/// Files a single map run reads and writes
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Shapefile directory or `.shp` file
    pub basemap: PathBuf,
    /// Site table (CSV, TSV, gzip or workbook)
    pub sites: PathBuf,
    /// PNG to write
    pub output: PathBuf,
    /// Optional JSON summary to write next to the map
    pub summary: Option<PathBuf>,
}

/// What was drawn, for logging and the summary sidecar
#[derive(Debug, Clone, PartialEq)]
pub struct MapOutcome {
    pub bbox: BoundingBox,
    pub overview_extent: BoundingBox,
    pub inset: PixelRect,
    pub dimensions: (u32, u32),
    pub site_count: usize,
    pub crs: Crs,
    pub temperature_range: Option<(f64, f64)>,
}

/// Render the main map and the overview inset and composite them.
///
/// The main map covers the site bounding box; the inset covers that box
/// expanded by the overview margin and outlines the study area.
pub fn compose(
    basemap: &Basemap,
    sites: &SiteTable,
    config: &MapConfig,
) -> Result<(Figure, MapOutcome)> {
    let bbox = BoundingBox::from_sites(sites.records(), config.margin)?;
    info!(
        "Study area: lat [{:.4}, {:.4}], long [{:.4}, {:.4}]",
        bbox.lat_min, bbox.lat_max, bbox.long_min, bbox.long_max
    );

    let ctx = RenderContext::new(&config.style, config.output.dpi);
    let dimensions = config.output.pixel_dimensions();

    let mut figure = render_map(
        basemap,
        &bbox,
        Overlay::Sites {
            sites,
            scale: &config.colors,
        },
        &ctx,
        dimensions,
    )?;

    let overview_extent = bbox.expand(config.overview.margin)?;
    let inset = config.inset.place(dimensions.0, dimensions.1)?;
    let overview = render_map(
        basemap,
        &overview_extent,
        Overlay::StudyArea(&bbox),
        &ctx,
        (inset.width, inset.height),
    )?;
    figure.composite(&overview, &config.inset)?;
    info!(
        "Inset placed at ({}, {}), {}x{} px",
        inset.x, inset.y, inset.width, inset.height
    );

    let outcome = MapOutcome {
        bbox,
        overview_extent,
        inset,
        dimensions,
        site_count: sites.len(),
        crs: basemap.crs().clone(),
        temperature_range: sites.temperature_range(),
    };
    Ok((figure, outcome))
}

/// Run the whole pipeline. Configuration is validated before any file is read.
pub fn run(inputs: &PipelineInputs, config: &MapConfig) -> Result<MapOutcome> {
    let start = Instant::now();
    config.validate()?;

    let basemap = load_polygons(&inputs.basemap)?.set_crs(&config.crs)?;
    let sites = load_table(&inputs.sites, &config.columns)?;
    if basemap.is_empty() {
        warn!("Basemap has no drawable features; the map will show water only");
    }
    info!(
        "Loaded {} basemap features from {} and {} sites from {}",
        basemap.len(),
        basemap.source().unwrap_or(inputs.basemap.as_path()).display(),
        sites.len(),
        sites.source().unwrap_or(inputs.sites.as_path()).display()
    );

    let (figure, outcome) = compose(&basemap, &sites, config)?;
    figure.export_png(&inputs.output, outcome.dimensions)?;

    if let Some(path) = &inputs.summary {
        MapSummary::new(&outcome, &inputs.output, config.output.dpi).write(path)?;
    }

    info!("Map finished in {:.2?}", start.elapsed());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basemap::BasemapFeature;
    use crate::error::MapError;
    use crate::models::SiteRecord;
    use geo::{polygon, MultiPolygon};
    use shapefile::{Point, Polygon, PolygonRing, ShapeWriter};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn small_config() -> MapConfig {
        let mut config = MapConfig::default();
        config.output.dpi = 40;
        config
    }

    fn sites() -> SiteTable {
        SiteTable::new(vec![
            SiteRecord::new("S1", 48.83, -125.14, 12.0),
            SiteRecord::new("S2", 48.86, -125.11, 14.0),
        ])
    }

    fn write_inputs(dir: &Path) -> PipelineInputs {
        let shp_dir = dir.join("coast");
        fs::create_dir(&shp_dir).unwrap();
        {
            let mut writer = ShapeWriter::from_path(shp_dir.join("land.shp")).unwrap();
            let ring = vec![
                Point::new(-125.3, 48.7),
                Point::new(-125.3, 48.85),
                Point::new(-125.0, 48.85),
                Point::new(-125.0, 48.7),
                Point::new(-125.3, 48.7),
            ];
            writer
                .write_shape(&Polygon::new(PolygonRing::Outer(ring)))
                .unwrap();
        }

        let table = dir.join("sites.csv");
        fs::write(
            &table,
            "site,lat,long,temp\nS1,48.83,-125.14,12\nS2,48.86,-125.11,14\n",
        )
        .unwrap();

        PipelineInputs {
            basemap: shp_dir,
            sites: table,
            output: dir.join("map.png"),
            summary: Some(dir.join("map.json")),
        }
    }

    #[test]
    fn test_compose_reference_bbox() {
        let basemap = Basemap::new(
            vec![BasemapFeature::Area(MultiPolygon::new(vec![polygon![
                (x: -125.3, y: 48.7),
                (x: -125.0, y: 48.7),
                (x: -125.0, y: 48.85),
                (x: -125.3, y: 48.85),
            ]]))],
            Crs::wgs84(),
        );
        let config = small_config();

        let (figure, outcome) = compose(&basemap, &sites(), &config).unwrap();
        assert_eq!(figure.dimensions(), (300, 220));
        assert!((outcome.bbox.lat_min - 48.78).abs() < 1e-9);
        assert!((outcome.bbox.long_max + 125.06).abs() < 1e-9);
        assert_eq!(outcome.inset.width, 150);

        let (again, _) = compose(&basemap, &sites(), &config).unwrap();
        assert_eq!(figure, again);
    }

    #[test]
    fn test_run_default_config_full_resolution() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_inputs(dir.path());
        inputs.summary = None;

        let outcome = run(&inputs, &MapConfig::default()).unwrap();
        assert_eq!(outcome.dimensions, (4500, 3300));
        assert_eq!(
            outcome.inset,
            PixelRect {
                x: 248,
                y: 1482,
                width: 2250,
                height: 990
            }
        );
        assert_eq!(image::image_dimensions(&inputs.output).unwrap(), (4500, 3300));
    }

    #[test]
    fn test_run_writes_png_and_summary() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(dir.path());

        let outcome = run(&inputs, &small_config()).unwrap();
        assert_eq!(outcome.site_count, 2);
        assert_eq!(image::image_dimensions(&inputs.output).unwrap(), (300, 220));

        let summary: MapSummary =
            serde_json::from_str(&fs::read_to_string(dir.path().join("map.json")).unwrap())
                .unwrap();
        assert_eq!(summary.site_count, 2);
        assert_eq!(summary.dpi, 40);
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let mut config = small_config();
        config.margin = -1.0;
        let inputs = PipelineInputs {
            basemap: PathBuf::from("/nonexistent/coast"),
            sites: PathBuf::from("/nonexistent/sites.csv"),
            output: PathBuf::from("/nonexistent/map.png"),
            summary: None,
        };

        let err = run(&inputs, &config).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_missing_site_table() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_inputs(dir.path());
        inputs.sites = dir.path().join("missing.csv");

        let err = run(&inputs, &small_config()).unwrap_err();
        assert!(matches!(err, MapError::InputNotFound { what: "site table", .. }));
        assert!(!inputs.output.exists());
    }
}
