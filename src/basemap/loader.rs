//! Shapefile basemap loading.

use std::fs;
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use shapefile::{PolygonRing, Shape, ShapeReader};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{Basemap, BasemapFeature};
use crate::error::{MapError, Result};
use crate::models::Crs;

/// Load every polygon and line shape from a shapefile.
///
/// `path` is either a `.shp` file or a directory holding the shapefile
/// components. A `.prj` sidecar, when present, sets the initial CRS.
pub fn load_polygons(path: &Path) -> Result<Basemap> {
    let shp = if path.is_dir() {
        find_shapefile(path)?
    } else if path.is_file() {
        path.to_path_buf()
    } else {
        return Err(MapError::InputNotFound {
            what: "shapefile",
            path: path.to_path_buf(),
        });
    };

    info!("Loading basemap from {}", shp.display());

    let mut features = Vec::new();
    let mut skipped = 0usize;
    {
        let mut reader = ShapeReader::from_path(&shp)?;
        for shape in reader.iter_shapes() {
            match shape_to_feature(shape?) {
                Some(feature) => features.push(feature),
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} point or empty shapes", skipped);
    }
    if features.is_empty() {
        warn!("Basemap {} has no polygon or line features", shp.display());
    }
    info!("Loaded {} basemap features", features.len());

    let crs = read_prj(&shp)?.unwrap_or_default();
    Ok(Basemap::new(features, crs).with_source(shp))
}

/// First `.shp` file (by name) directly inside `dir`
pub fn find_shapefile(dir: &Path) -> Result<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .find(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("shp"))
                    .unwrap_or(false)
        })
        .ok_or_else(|| MapError::InputNotFound {
            what: "shapefile (.shp) in directory",
            path: dir.to_path_buf(),
        })
}

fn read_prj(shp: &Path) -> Result<Option<Crs>> {
    let prj = shp.with_extension("prj");
    if !prj.is_file() {
        debug!("No .prj next to {}, assuming WGS84", shp.display());
        return Ok(None);
    }

    let wkt = fs::read_to_string(&prj)?;
    match Crs::parse(&wkt) {
        Ok(crs) => {
            info!("Basemap CRS from .prj: {}", crs);
            Ok(Some(crs))
        }
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", prj.display(), e);
            Ok(None)
        }
    }
}

fn shape_to_feature(shape: Shape) -> Option<BasemapFeature> {
    let feature = match shape {
        Shape::Polygon(p) => BasemapFeature::Area(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        Shape::PolygonM(p) => BasemapFeature::Area(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        Shape::PolygonZ(p) => BasemapFeature::Area(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        Shape::Polyline(l) => BasemapFeature::Line(parts_to_multilinestring(l.parts(), |pt| {
            Coord { x: pt.x, y: pt.y }
        })),
        Shape::PolylineM(l) => BasemapFeature::Line(parts_to_multilinestring(l.parts(), |pt| {
            Coord { x: pt.x, y: pt.y }
        })),
        Shape::PolylineZ(l) => BasemapFeature::Line(parts_to_multilinestring(l.parts(), |pt| {
            Coord { x: pt.x, y: pt.y }
        })),
        _ => return None,
    };

    match &feature {
        BasemapFeature::Area(mp) if mp.0.is_empty() => None,
        BasemapFeature::Line(ml) if ml.0.is_empty() => None,
        _ => Some(feature),
    }
}

/// Outer rings start a new polygon; inner rings become holes of the last one.
pub(crate) fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> Coord<f64>,
) -> MultiPolygon<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();

    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => {
                if points.len() < 3 {
                    continue;
                }
                let exterior = LineString::new(points.iter().map(&xy).collect());
                polygons.push(Polygon::new(exterior, vec![]));
            }
            PolygonRing::Inner(points) => {
                if points.len() < 3 {
                    continue;
                }
                let hole = LineString::new(points.iter().map(&xy).collect());
                match polygons.last_mut() {
                    Some(polygon) => polygon.interiors_push(hole),
                    None => debug!("Inner ring before any outer ring, dropped"),
                }
            }
        }
    }

    MultiPolygon::new(polygons)
}

pub(crate) fn parts_to_multilinestring<P>(
    parts: &[Vec<P>],
    xy: impl Fn(&P) -> Coord<f64>,
) -> MultiLineString<f64> {
    MultiLineString::new(
        parts
            .iter()
            .filter(|part| part.len() >= 2)
            .map(|part| LineString::new(part.iter().map(&xy).collect()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::Point;
    use tempfile::TempDir;

    fn ring(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn xy(p: &Point) -> Coord<f64> {
        Coord { x: p.x, y: p.y }
    }

    #[test]
    fn test_rings_with_hole() {
        let rings = vec![
            PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Inner(ring(&[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)])),
            PolygonRing::Outer(ring(&[(20.0, 0.0), (20.0, 1.0), (21.0, 1.0), (20.0, 0.0)])),
        ];

        let mp = rings_to_multipolygon(&rings, xy);
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!(mp.0[1].interiors().is_empty());
    }

    #[test]
    fn test_degenerate_rings_dropped() {
        let rings = vec![
            PolygonRing::Inner(ring(&[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 2.0)])),
            PolygonRing::Outer(ring(&[(0.0, 0.0), (1.0, 1.0)])),
        ];
        assert!(rings_to_multipolygon(&rings, xy).0.is_empty());
    }

    #[test]
    fn test_parts_to_lines() {
        let parts = vec![ring(&[(0.0, 0.0), (1.0, 1.0)]), ring(&[(5.0, 5.0)])];
        let ml = parts_to_multilinestring(&parts, xy);
        assert_eq!(ml.0.len(), 1);
    }

    #[test]
    fn test_missing_basemap() {
        let err = load_polygons(Path::new("/nonexistent/coastline")).unwrap_err();
        assert!(matches!(err, MapError::InputNotFound { what: "shapefile", .. }));
    }

    #[test]
    fn test_directory_without_shp() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("coast.dbf"), b"").unwrap();

        let err = find_shapefile(dir.path()).unwrap_err();
        assert!(matches!(err, MapError::InputNotFound { .. }));
    }

    #[test]
    fn test_find_shapefile_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b_land.shp", "a_land.SHP", "a_land.dbf"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = find_shapefile(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "a_land.SHP");
    }

    #[test]
    fn test_prj_sets_crs() {
        let dir = TempDir::new().unwrap();
        let shp = dir.path().join("land.shp");
        fs::write(
            dir.path().join("land.prj"),
            r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983"]]"#,
        )
        .unwrap();

        let crs = read_prj(&shp).unwrap().unwrap();
        assert!(crs.is_geographic());
        assert!(matches!(crs, Crs::Wkt(_)));
    }
}
