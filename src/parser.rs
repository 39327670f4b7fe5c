//! Record parser: delimited text or pre-split rows into [`SensorReading`]s.
//!
//! Column lookup is by normalized header name, so `airQuality`, `air_quality`
//! and `Air Quality` all land on the same field. Cells that do not parse as a
//! finite number become absent values; a row is only dropped when nothing
//! usable is left in it. Every emitted reading is classified against the
//! thresholds passed in.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::SensorReading;
use crate::thresholds::MetricThresholds;

// ---

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Columns the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Date,
    Time,
    DateTime,
    Temperature,
    Humidity,
    Light,
    AirQuality,
}

impl Column {
    // ---
    fn from_header(header: &str) -> Option<Column> {
        // ---
        let key: String = header
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "date" | "day" => Some(Column::Date),
            "time" | "hour" => Some(Column::Time),
            "timestamp" | "datetime" | "ts" => Some(Column::DateTime),
            "temperature" | "temp" | "temperaturec" | "tempc" => Some(Column::Temperature),
            "humidity" | "hum" | "relativehumidity" | "rh" => Some(Column::Humidity),
            "light" | "lux" | "lightlux" | "lightlevel" => Some(Column::Light),
            "airquality" | "aqi" | "air" | "airqualityaqi" => Some(Column::AirQuality),
            _ => None,
        }
    }
}

/// Parse one CSV blob (header row first) into readings, in row order.
///
/// Short rows are tolerated; missing cells are absent values. Only a header
/// that cannot be read is an error.
pub fn parse_csv(text: &str, thresholds: &MetricThresholds) -> Result<Vec<SensorReading>, ParseError> {
    // ---
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ParseError::Header { source })?
        .clone();
    let columns = map_columns(&headers);

    if columns.is_empty() {
        warn!("No recognised columns in header: {:?}", headers);
    }

    let mut readings = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {}", row + 1, e);
                continue;
            }
        };

        let cell = |column: Column| {
            columns
                .get(&column)
                .and_then(|&idx| record.get(idx))
                .filter(|v| !v.is_empty())
        };

        match build_reading(cell, thresholds) {
            Some(reading) => readings.push(reading),
            None => debug!("Dropping empty CSV row {}", row + 1),
        }
    }

    debug!("Parsed {} readings from CSV", readings.len());
    Ok(readings)
}

/// Parse rows that were already split into `column -> cell` mappings.
///
/// When several keys name the same column, the first key in sorted order
/// with a non-empty cell wins.
pub fn parse_rows(rows: &[HashMap<String, String>], thresholds: &MetricThresholds) -> Vec<SensorReading> {
    // ---
    rows.iter()
        .filter_map(|row| {
            let mut names: Vec<&String> = row.keys().collect();
            names.sort();

            let mut cells: HashMap<Column, &str> = HashMap::new();
            for name in names {
                let value = row[name].trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(column) = Column::from_header(name) {
                    cells.entry(column).or_insert(value);
                }
            }

            build_reading(|column| cells.get(&column).copied(), thresholds)
        })
        .collect()
}

// ---

fn map_columns(headers: &StringRecord) -> HashMap<Column, usize> {
    // ---
    let mut columns = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            // First matching column wins.
            columns.entry(column).or_insert(idx);
        }
    }
    columns
}

fn build_reading<'a>(
    cell: impl Fn(Column) -> Option<&'a str>,
    thresholds: &MetricThresholds,
) -> Option<SensorReading> {
    // ---
    let timestamp = resolve_timestamp(
        cell(Column::Date),
        cell(Column::Time),
        cell(Column::DateTime),
    );

    let reading = SensorReading::new(
        timestamp,
        cell(Column::Temperature).and_then(parse_number),
        cell(Column::Humidity).and_then(parse_number),
        cell(Column::Light).and_then(parse_number),
        cell(Column::AirQuality).and_then(parse_number),
        thresholds,
    );

    (!reading.is_empty()).then_some(reading)
}

/// Combine `date` + `time` when both exist, otherwise use whichever single
/// datetime-like column is present. A lone time of day is not a timestamp.
fn resolve_timestamp(date: Option<&str>, time: Option<&str>, datetime: Option<&str>) -> Option<DateTime<Utc>> {
    // ---
    match (date, time, datetime) {
        (Some(date), Some(time), _) => parse_timestamp(&format!("{date} {time}"))
            .or_else(|| datetime.and_then(parse_timestamp)),
        (_, _, Some(datetime)) => parse_timestamp(datetime),
        (Some(date), None, None) => parse_timestamp(date),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    // ---
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
