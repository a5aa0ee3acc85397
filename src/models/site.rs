//! Field site records loaded from the site table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One field site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site identifier as written in the table
    pub id: String,

    /// Latitude in degrees (WGS84)
    pub lat: f64,

    /// Longitude in degrees (WGS84)
    pub long: f64,

    /// Temperature in °C
    pub temp: f64,

    /// Any other columns, keyed by header
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl SiteRecord {
    pub fn new(id: impl Into<String>, lat: f64, long: f64, temp: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            long,
            temp,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// All sites from one table, in file order.
#[derive(Debug, Clone, Default)]
pub struct SiteTable {
    source: Option<PathBuf>,
    records: Vec<SiteRecord>,
}

impl SiteTable {
    pub fn new(records: Vec<SiteRecord>) -> Self {
        Self {
            source: None,
            records,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// File the table was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn records(&self) -> &[SiteRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Minimum and maximum temperature, `None` for an empty table
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.records.iter().map(|r| r.temp);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_range() {
        let table = SiteTable::new(vec![
            SiteRecord::new("A", 48.83, -125.14, 12.0),
            SiteRecord::new("B", 48.86, -125.11, 14.0),
            SiteRecord::new("C", 48.85, -125.12, 9.5),
        ]);
        assert_eq!(table.temperature_range(), Some((9.5, 14.0)));
    }

    #[test]
    fn test_empty_table_has_no_range() {
        let table = SiteTable::default();
        assert!(table.is_empty());
        assert_eq!(table.temperature_range(), None);
    }

    #[test]
    fn test_with_attribute() {
        let site = SiteRecord::new("A", 48.83, -125.14, 12.0).with_attribute("depth", "3");
        assert_eq!(site.attributes.get("depth").map(String::as_str), Some("3"));
    }
}
