//! Typed errors for the ingestion, insight and session layers.

use thiserror::Error;
use uuid::Uuid;

/// A CSV blob whose structure could not be read at all.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read CSV header row: {source}")]
    Header {
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Nothing usable survived parsing; surfaced verbatim to the user.
    #[error("No valid data rows found in the uploaded file(s).")]
    NoUsableRows,
    #[error("No files were supplied.")]
    NoFiles,
}

/// Any failure on the way to a validated insight list.
///
/// None of these reach the dashboard caller; the insight builder turns each
/// into a fallback warning insight.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("no API key is configured")]
    MissingCredential,
    #[error("request to insights service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("insights service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("insights service returned no content")]
    EmptyResponse,
    #[error("insights response is not a valid insight list: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("insights service returned {0} insights, at most {max} are allowed", max = crate::insights::MAX_INSIGHTS)]
    TooMany(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("an upload is already in progress")]
    Busy,
    #[error("upload {0} is no longer current")]
    Stale(Uuid),
    #[error("cannot apply {event} while {phase}")]
    Invalid {
        phase: &'static str,
        event: &'static str,
    },
}
