//! `sensorflow-insights`: environmental sensor CSV ingestion, statistics,
//! anomaly flags and AI-generated insights.
//!
//! Data flows leaves-first through the modules below:
//! - `parser` turns CSV text into classified [`SensorReading`]s
//! - `thresholds` holds the static threshold table and the classifier
//! - `assembler` merges sources into one chronologically ordered series
//! - `stats` summarizes each metric over the series
//! - `insights` builds the collaborator request and validates its answer
//!
//! `pipeline`, `session` and `routes` wire these into the HTTP service run by
//! `main.rs`, which only talks to the `routes` gateway (EMBP).

pub mod assembler;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod routes;
pub mod sample;
pub mod session;
pub mod stats;
pub mod thresholds;

pub use collaborator::{GeminiClient, InsightCollaborator};
pub use config::Config;
pub use models::{Insight, Metric, MetricStats, SensorReading, Severity, StatsCollection};
pub use routes::AppState;
pub use thresholds::MetricThresholds;
