//! ### Convert
//! Reads the wide EIA hourly load export (one column per load zone) and
//! reshapes it into the long `(timestamp, region, load_mw)` table every
//! other module works against.

use crate::error::{Error, Result};
use crate::region::{self, RegionRegistry};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

/// Naive layouts accepted for the timestamp column, tried in order after RFC 3339.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Which clock the chosen timestamp column is labeled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAxis {
    Utc,
    Local,
}

impl TimeAxis {
    /// Axis caption for charts drawn against this clock.
    pub fn label(self) -> &'static str {
        match self {
            TimeAxis::Utc => "Time (UTC)",
            TimeAxis::Local => "Time (local)",
        }
    }
}

/// One row of the wide table. Load cells stay unparsed until `reshape`
/// picks out the registered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// CSV line number, header is line 1.
    pub line: usize,
    pub timestamp: NaiveDateTime,
    /// Parallel to `RawTable::load_columns`.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: PathBuf,
    pub time_axis: TimeAxis,
    pub timestamp_column: String,
    pub load_columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPoint {
    pub timestamp: NaiveDateTime,
    pub region: String,
    pub load_mw: f64,
}

impl LoadPoint {
    /// Calendar date of the timestamp, on whatever axis it was read from.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

pub fn read_load_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| Error::data_load(path, e.to_string()))?;
    parse_load_csv(file, path)
}

/// Parses the wide load table. `source` only labels errors and logs.
pub fn parse_load_csv(input: impl Read, source: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::data_load(source, format!("unreadable header row: {e}")))?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let (ts_idx, time_axis) = find_timestamp_column(&headers)
        .ok_or_else(|| Error::data_load(source, "no timestamp column in header row"))?;
    if time_axis == TimeAxis::Local {
        log::warn!(
            "No UTC timestamp column in {}, falling back to {:?}",
            source.display(),
            headers[ts_idx]
        );
    }

    let load_idxs: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| region::region_from_column(name).is_some())
        .map(|(idx, _)| idx)
        .collect();

    let mut records: Vec<RawRecord> = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = row.map_err(|e| Error::at_line(source, line, e))?;

        let raw_ts = row.get(ts_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts, time_axis).ok_or_else(|| {
            Error::at_line(source, line, format!("unparseable timestamp {raw_ts:?}"))
        })?;
        if let Some(prev) = records.last() {
            if timestamp <= prev.timestamp {
                return Err(Error::at_line(
                    source,
                    line,
                    format!("timestamp {timestamp} does not follow {}", prev.timestamp),
                ));
            }
        }

        let cells = load_idxs
            .iter()
            .map(|&col| row.get(col).unwrap_or_default().to_string())
            .collect();

        records.push(RawRecord {
            line,
            timestamp,
            cells,
        });
    }

    if records.is_empty() {
        return Err(Error::data_load(source, "no data rows"));
    }

    log::info!(
        "Read {} rows x {} load columns from {}",
        records.len(),
        load_idxs.len(),
        source.display()
    );

    Ok(RawTable {
        source: source.to_path_buf(),
        time_axis,
        timestamp_column: headers[ts_idx].clone(),
        load_columns: load_idxs.iter().map(|&idx| headers[idx].clone()).collect(),
        records,
    })
}

/// Prefers a UTC-labeled timestamp column, first in header order, and
/// only then any other timestamp column.
pub fn find_timestamp_column(headers: &[String]) -> Option<(usize, TimeAxis)> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    lowered
        .iter()
        .position(|h| h.contains("timestamp") && h.contains("utc"))
        .map(|idx| (idx, TimeAxis::Utc))
        .or_else(|| {
            lowered
                .iter()
                .position(|h| h.contains("timestamp"))
                .map(|idx| (idx, TimeAxis::Local))
        })
}

/// Offsets are only honoured when they're explicit in the value itself.
pub fn parse_timestamp(raw: &str, axis: TimeAxis) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(match axis {
            TimeAxis::Utc => dt.naive_utc(),
            TimeAxis::Local => dt.naive_local(),
        });
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_load(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|mw| mw.is_finite() && *mw >= 0.)
}

/// Melts the wide table into one `LoadPoint` per (timestamp, registered
/// region), timestamp-major with regions in registry order. Only registered
/// columns are validated; a blank or negative cell there is a `DataLoad`
/// error carrying its CSV line.
pub fn reshape(raw: &RawTable, registry: &RegionRegistry) -> Result<Vec<LoadPoint>> {
    let columns = registry
        .columns()
        .map(|(region, column)| {
            raw.load_columns
                .iter()
                .position(|header| *header == column)
                .map(|idx| (region, idx))
                .ok_or_else(|| Error::Schema(format!("missing load column {column:?}")))
        })
        .collect::<Result<Vec<(&str, usize)>>>()?;

    let mut points = Vec::with_capacity(raw.records.len() * columns.len());
    for record in &raw.records {
        for &(region, idx) in &columns {
            let cell = record.cells.get(idx).map(String::as_str).unwrap_or_default();
            let load_mw = parse_load(cell).ok_or_else(|| {
                Error::at_line(
                    &raw.source,
                    record.line,
                    format!("invalid load {cell:?} in column {:?}", raw.load_columns[idx]),
                )
            })?;
            points.push(LoadPoint {
                timestamp: record.timestamp,
                region: region.to_string(),
                load_mw,
            });
        }
    }
    Ok(points)
}

/// The regions present in `points` must be exactly the registered set.
pub fn check_region_set(points: &[LoadPoint], registry: &RegionRegistry) -> Result<()> {
    let present: BTreeSet<&str> = points.iter().map(|p| p.region.as_str()).collect();
    if let Some(unknown) = present.iter().find(|region| !registry.contains(region)) {
        return Err(Error::Schema(format!("unregistered region {unknown:?} in load data")));
    }
    if let Some(absent) = registry
        .names()
        .iter()
        .find(|name| !present.contains(name.as_str()))
    {
        return Err(Error::Schema(format!("registered region {absent:?} has no load data")));
    }
    Ok(())
}

pub fn write_csv<T: Serialize>(
    output: &Path,
    rows: impl IntoIterator<Item = T>,
) -> anyhow::Result<()> {
    let mut out_csv = csv::Writer::from_path(output)?;
    for row in rows {
        out_csv.serialize(row)?;
    }
    out_csv.flush()?;
    Ok(())
}
