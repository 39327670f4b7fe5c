//! Data models for the sensor insight pipeline.
//!
//! Readings are produced once by the parser and never mutated afterwards;
//! statistics and insights are derived values that are rebuilt per upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thresholds::{classify, AnomalyFlags, MetricThresholds};

// ---

/// One of the four measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Temperature,
    Humidity,
    Light,
    AirQuality,
}

impl Metric {
    // ---
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Light,
        Metric::AirQuality,
    ];

    /// Human-readable label used in prompts and logs.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Light => "Light",
            Metric::AirQuality => "Air Quality",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Light => " lux",
            Metric::AirQuality => " AQI",
        }
    }

    /// Decimal places used when a value of this metric is rendered as text.
    pub fn precision(self) -> usize {
        match self {
            Metric::Temperature | Metric::Humidity => 1,
            Metric::Light | Metric::AirQuality => 0,
        }
    }
}

/// One timestamped observation with its anomaly flags.
///
/// Absent or unparseable source cells are `None`, never zero. The flags are
/// computed by [`SensorReading::new`] from the thresholds in force at parse
/// time, so a flag is set iff its value is present and out of range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    // ---
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub air_quality: Option<f64>,
    #[serde(flatten)]
    pub flags: AnomalyFlags,
}

impl SensorReading {
    // ---
    pub fn new(
        timestamp: Option<DateTime<Utc>>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        light: Option<f64>,
        air_quality: Option<f64>,
        thresholds: &MetricThresholds,
    ) -> Self {
        // ---
        // NaN and infinities carry no measurement; keep them absent.
        let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
        let mut reading = SensorReading {
            timestamp,
            temperature: finite(temperature),
            humidity: finite(humidity),
            light: finite(light),
            air_quality: finite(air_quality),
            flags: AnomalyFlags::default(),
        };
        reading.flags = classify(&reading, thresholds);
        reading
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Light => self.light,
            Metric::AirQuality => self.air_quality,
        }
    }

    pub fn is_anomalous(&self, metric: Metric) -> bool {
        self.flags.get(metric)
    }

    /// True when the row carried nothing usable at all.
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && Metric::ALL.iter().all(|m| self.value(*m).is_none())
    }
}

/// Summary of one metric over a whole series.
///
/// All fields are zero when the metric has no present value; only the reading
/// count tells that case apart from a genuine all-zero series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    // ---
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub change: f64,
    pub anomalies: usize,
}

/// Per-metric statistics for an assembled series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCollection {
    // ---
    pub temperature: MetricStats,
    pub humidity: MetricStats,
    pub light: MetricStats,
    pub air_quality: MetricStats,
}

impl StatsCollection {
    // ---
    pub fn get(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Light => &self.light,
            Metric::AirQuality => &self.air_quality,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut MetricStats {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::Light => &mut self.light,
            Metric::AirQuality => &mut self.air_quality,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Success,
}

/// A severity-tagged observation about the series.
///
/// Locally built fallbacks and collaborator-generated insights share this
/// shape and are interchangeable downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    // ---
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
}
