//! Upload pipeline: raw files → parsed readings → assembled series → stats.
//!
//! The insight stage is driven separately by the route layer so that the
//! session lock is never held across the collaborator round trip.

use serde::Deserialize;
use tracing::{info, warn};

use crate::assembler::{assemble, AssembledSeries, SourceReadings};
use crate::error::PipelineError;
use crate::models::StatsCollection;
use crate::parser::parse_csv;
use crate::stats::aggregate;
use crate::thresholds::MetricThresholds;

// ---

/// One uploaded source: a display name and its delimited text.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    // ---
    pub name: String,
    pub content: String,
}

/// Output of [`prepare`]: the ordered series and its statistics.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    // ---
    pub series: AssembledSeries,
    pub stats: StatsCollection,
}

/// Parse, merge and summarize the uploaded files.
///
/// Files are parsed independently and merged in the order supplied. A file
/// whose CSV cannot be read contributes no rows. Fails only when no usable
/// row survives across all files.
pub fn prepare(files: &[UploadedFile], thresholds: &MetricThresholds) -> Result<PreparedSeries, PipelineError> {
    // ---
    if files.is_empty() {
        return Err(PipelineError::NoFiles);
    }

    let sources: Vec<SourceReadings> = files
        .iter()
        .map(|file| {
            let readings = parse_csv(&file.content, thresholds).unwrap_or_else(|e| {
                warn!("Ignoring unreadable file '{}': {}", file.name, e);
                Vec::new()
            });
            info!("Parsed {} readings from '{}'", readings.len(), file.name);
            SourceReadings {
                name: file.name.clone(),
                readings,
            }
        })
        .collect();

    let series = assemble(sources);
    if series.is_empty() {
        return Err(PipelineError::NoUsableRows);
    }

    let stats = aggregate(&series.readings);
    info!(
        "Assembled {} readings from {}",
        series.len(),
        series.joined_sources()
    );

    Ok(PreparedSeries { series, stats })
}
