//! Header resolution for the site table.

use std::path::Path;

use crate::config::ColumnsConfig;
use crate::error::{MapError, Result};

pub const ID_ALIASES: &[&str] = &["site", "site_id", "siteid", "id", "identifier", "name"];
pub const LAT_ALIASES: &[&str] = &["lat", "latitude", "y"];
pub const LONG_ALIASES: &[&str] = &["long", "lon", "lng", "longitude", "x"];
pub const TEMP_ALIASES: &[&str] = &["temp", "temperature", "temp_c", "temperature_c"];

/// Column indices of the required fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub id: usize,
    pub lat: usize,
    pub long: usize,
    pub temp: usize,
}

impl ColumnMap {
    /// Find the required columns in `headers`.
    ///
    /// An explicit name from `columns` must match; otherwise the first alias found wins.
    pub fn resolve(headers: &[String], columns: &ColumnsConfig, path: &Path) -> Result<Self> {
        let find = |explicit: &Option<String>, aliases: &[&str], field: &str| -> Result<usize> {
            let found = match explicit {
                Some(name) => position(headers, name),
                None => aliases.iter().find_map(|alias| position(headers, alias)),
            };
            found.ok_or_else(|| MapError::MissingColumn {
                column: explicit.clone().unwrap_or_else(|| field.to_string()),
                path: path.to_path_buf(),
            })
        };

        Ok(Self {
            id: find(&columns.id, ID_ALIASES, "site identifier")?,
            lat: find(&columns.lat, LAT_ALIASES, "latitude")?,
            long: find(&columns.long, LONG_ALIASES, "longitude")?,
            temp: find(&columns.temp, TEMP_ALIASES, "temperature")?,
        })
    }

    pub fn is_required(&self, idx: usize) -> bool {
        idx == self.id || idx == self.lat || idx == self.long || idx == self.temp
    }
}

fn position(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
}
