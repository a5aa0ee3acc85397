//! Coordinate Reference System tags

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// EPSG codes of common geographic (lon/lat) CRSs
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4269, 4258, 4283, 4617, 4167, 4979];

/// CRS metadata attached to a basemap. Coordinates are never transformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    Epsg(u32),
    Proj(String),
    Wkt(String),
}

impl Crs {
    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Crs::Epsg(4326)
    }

    /// Parse `EPSG:nnnn`, a bare EPSG code, a PROJ string or WKT.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(MapError::invalid_config("crs", "\"\"", "empty CRS string"));
        }

        let upper = s.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("EPSG:") {
            return code
                .trim()
                .parse()
                .map(Crs::Epsg)
                .map_err(|_| MapError::invalid_config("crs", s, "EPSG code is not a number"));
        }
        if let Ok(code) = s.parse::<u32>() {
            return Ok(Crs::Epsg(code));
        }
        if s.starts_with('+') || s.contains("+proj=") {
            return Ok(Crs::Proj(s.to_string()));
        }
        const WKT_ROOTS: &[&str] = &[
            "GEOGCS", "PROJCS", "GEOCCS", "COMPD_CS", "GEOGCRS", "PROJCRS", "GEODCRS", "COMPOUNDCRS",
        ];
        if WKT_ROOTS.iter().any(|root| upper.starts_with(root)) {
            return Ok(Crs::Wkt(s.to_string()));
        }

        Err(MapError::invalid_config(
            "crs",
            s,
            "expected EPSG:<code>, a PROJ string or WKT",
        ))
    }

    /// True when coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            Crs::Epsg(code) => GEOGRAPHIC_EPSG.contains(code),
            Crs::Proj(proj) => proj
                .split_whitespace()
                .any(|p| p == "+proj=longlat" || p == "+proj=latlong"),
            Crs::Wkt(wkt) => {
                let upper = wkt.trim_start().to_ascii_uppercase();
                upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS")
            }
        }
    }

    /// Short identifier for logs and the summary file
    pub fn identifier(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("EPSG:{}", code),
            Crs::Proj(proj) => proj.clone(),
            Crs::Wkt(wkt) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epsg() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::wgs84());
        assert_eq!(Crs::parse("epsg: 3005").unwrap(), Crs::Epsg(3005));
        assert_eq!(Crs::parse("4326").unwrap(), Crs::Epsg(4326));
        assert_eq!(Crs::wgs84().identifier(), "EPSG:4326");
    }

    #[test]
    fn test_parse_proj() {
        let crs = Crs::parse("+proj=longlat +datum=WGS84 +no_defs").unwrap();
        assert!(matches!(crs, Crs::Proj(_)));
        assert!(crs.is_geographic());

        let utm = Crs::parse("+proj=utm +zone=10 +datum=NAD83").unwrap();
        assert!(!utm.is_geographic());
    }

    #[test]
    fn test_parse_wkt() {
        let crs = Crs::parse(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#).unwrap();
        assert!(crs.is_geographic());
        let projected = Crs::parse(r#"PROJCS["NAD83 / BC Albers"]"#).unwrap();
        assert!(!projected.is_geographic());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(Crs::parse("").unwrap_err().is_config_error());
        assert!(Crs::parse("EPSG:abc").unwrap_err().is_config_error());
        assert!(Crs::parse("mercator please").unwrap_err().is_config_error());
    }

    #[test]
    fn test_geographic_epsg() {
        assert!(Crs::Epsg(4326).is_geographic());
        assert!(!Crs::Epsg(3857).is_geographic());
    }
}
