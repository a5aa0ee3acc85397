//! Site table loading.
//!
//! Reads CSV/TSV (optionally gzip-compressed) or spreadsheet workbooks into a
//! [`SiteTable`]. Header matching is case-insensitive; unknown columns are
//! kept as per-site attributes.

mod columns;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, Trim};
use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::config::ColumnsConfig;
use crate::error::{MapError, Result};
use crate::models::{SiteRecord, SiteTable};

pub use columns::{ColumnMap, ID_ALIASES, LAT_ALIASES, LONG_ALIASES, TEMP_ALIASES};

/// Header row plus data rows, all as text
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Delimited { delimiter: u8, gzip: bool },
    Workbook,
}

/// Load the site table at `path`.
///
/// Fails when the file is missing, a required column is absent, a value does
/// not parse, or the table has no sites.
pub fn load_table(path: &Path, columns: &ColumnsConfig) -> Result<SiteTable> {
    if !path.is_file() {
        return Err(MapError::InputNotFound {
            what: "site table",
            path: path.to_path_buf(),
        });
    }

    info!("Loading site table from {}", path.display());

    let raw = match detect_format(path)? {
        TableFormat::Delimited { delimiter, gzip } => read_delimited(path, delimiter, gzip)?,
        TableFormat::Workbook => read_workbook(path)?,
    };

    let column_map = ColumnMap::resolve(&raw.headers, columns, path)?;
    let records = parse_rows(&raw, &column_map)?;

    if records.is_empty() {
        return Err(MapError::EmptySiteTable);
    }

    info!("Loaded {} sites", records.len());
    Ok(SiteTable::new(records).with_source(path))
}

fn detect_format(path: &Path) -> Result<TableFormat> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (stem, gzip) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name.as_str(), false),
    };
    let extension = stem.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();

    match extension {
        "csv" | "txt" => Ok(TableFormat::Delimited { delimiter: b',', gzip }),
        "tsv" | "tab" => Ok(TableFormat::Delimited { delimiter: b'\t', gzip }),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" if !gzip => Ok(TableFormat::Workbook),
        _ => Err(MapError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn read_delimited(path: &Path, delimiter: u8, gzip: bool) -> Result<RawTable> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if gzip {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Reads the first worksheet of a workbook
fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(MapError::EmptySiteTable)??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect::<Vec<_>>());

    let headers = rows.next().ok_or(MapError::EmptySiteTable)?;
    Ok(RawTable {
        headers,
        rows: rows.collect(),
    })
}

fn parse_rows(raw: &RawTable, columns: &ColumnMap) -> Result<Vec<SiteRecord>> {
    let mut records = Vec::with_capacity(raw.rows.len());

    for (i, row) in raw.rows.iter().enumerate() {
        // Header is row 1
        let row_number = i + 2;

        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or_default();
        let number = |idx: usize, column: &str| parse_number(cell(idx), row_number, column);

        let id = cell(columns.id).to_string();
        if id.is_empty() {
            warn!("Row {} has an empty site identifier", row_number);
        }

        let lat = number(columns.lat, &raw.headers[columns.lat])?;
        let long = number(columns.long, &raw.headers[columns.long])?;
        let temp = number(columns.temp, &raw.headers[columns.temp])?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(out_of_range(
                row_number,
                &raw.headers[columns.lat],
                lat,
                "latitude outside [-90, 90]",
            ));
        }
        if !(-180.0..=180.0).contains(&long) {
            return Err(out_of_range(
                row_number,
                &raw.headers[columns.long],
                long,
                "longitude outside [-180, 180]",
            ));
        }

        let mut record = SiteRecord::new(id, lat, long, temp);
        for (idx, header) in raw.headers.iter().enumerate() {
            if columns.is_required(idx) || header.is_empty() {
                continue;
            }
            record = record.with_attribute(header.clone(), cell(idx));
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_number(value: &str, row: usize, column: &str) -> Result<f64> {
    let invalid = |reason| MapError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("missing value"));
    }
    let parsed: f64 = value.parse().map_err(|_| invalid("not a number"))?;
    if !parsed.is_finite() {
        return Err(invalid("not a finite number"));
    }
    Ok(parsed)
}

fn out_of_range(row: usize, column: &str, value: f64, reason: &'static str) -> MapError {
    MapError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason,
    }
}
