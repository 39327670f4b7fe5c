//! Series assembler: merge readings from one or more sources into a single
//! chronologically ordered series.

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::SensorReading;

// ---

/// Readings parsed from one named source.
#[derive(Debug, Clone)]
pub struct SourceReadings {
    // ---
    pub name: String,
    pub readings: Vec<SensorReading>,
}

/// The merged, ordered series plus a display label for its origin.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledSeries {
    // ---
    pub readings: Vec<SensorReading>,
    /// Single source name, or `"N files combined"`. Display only.
    pub source_label: String,
    pub sources: Vec<String>,
}

impl AssembledSeries {
    // ---
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Source names joined for display, e.g. `"a.csv, b.csv"`.
    pub fn joined_sources(&self) -> String {
        self.sources.join(", ")
    }
}

/// Concatenate the sources in the order given, then sort by timestamp.
pub fn assemble(sources: Vec<SourceReadings>) -> AssembledSeries {
    // ---
    let source_label = match sources.as_slice() {
        [] => String::new(),
        [only] => only.name.clone(),
        many => format!("{} files combined", many.len()),
    };

    let mut names = Vec::with_capacity(sources.len());
    let mut readings = Vec::new();
    for source in sources {
        names.push(source.name);
        readings.extend(source.readings);
    }

    AssembledSeries {
        readings: sort_by_timestamp(readings),
        source_label,
        sources: names,
    }
}

/// Readings without a timestamp are incomparable with everything: the
/// comparison says `Equal` and the pair keeps its input order.
pub fn compare_timestamps(a: &SensorReading, b: &SensorReading) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Stable ascending sort under [`compare_timestamps`].
///
/// That comparison is not a total order, which `slice::sort_by` is allowed to
/// reject by panicking, so the merge is done here.
fn sort_by_timestamp(readings: Vec<SensorReading>) -> Vec<SensorReading> {
    // ---
    if readings.len() <= 1 {
        return readings;
    }

    let mut left = readings;
    let right = left.split_off(left.len() / 2);
    let left = sort_by_timestamp(left);
    let right = sort_by_timestamp(right);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare_timestamps(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }

    merged
}
