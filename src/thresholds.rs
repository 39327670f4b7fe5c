//! Static threshold table and the anomaly classifier.
//!
//! The table is built once at startup (see `config`) and only read afterwards.
//! [`classify`] is a pure function of a reading and the table.

use serde::{Deserialize, Serialize};

use crate::models::{Metric, SensorReading};

// ---

/// Allowed band for one metric. Either side may be open; air quality only
/// has an upper "good" bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    // ---
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bound {
    // ---
    pub const fn range(min: f64, max: f64) -> Self {
        Bound {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn upper(max: f64) -> Self {
        Bound {
            min: None,
            max: Some(max),
        }
    }

    /// Bounds are inclusive: a value equal to `min` or `max` is in range.
    pub fn is_outside(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }

    /// Render the band the way the insight prompt phrases it.
    pub fn describe(&self, unit: &str) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Safe range: {min}-{max}{unit}"),
            (None, Some(max)) => format!("Good range: <{max}{unit}"),
            (Some(min), None) => format!("Safe range: >{min}{unit}"),
            (None, None) => "No configured range".to_string(),
        }
    }
}

/// Threshold table, one entry per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricThresholds {
    // ---
    pub temperature: Bound,
    pub humidity: Bound,
    pub light: Bound,
    pub air_quality: Bound,
}

impl Default for MetricThresholds {
    fn default() -> Self {
        MetricThresholds {
            temperature: Bound::range(18.0, 28.0),
            humidity: Bound::range(30.0, 70.0),
            light: Bound::range(200.0, 1000.0),
            air_quality: Bound::upper(50.0),
        }
    }
}

impl MetricThresholds {
    // ---
    pub fn bound(&self, metric: Metric) -> &Bound {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Light => &self.light,
            Metric::AirQuality => &self.air_quality,
        }
    }
}

/// Per-metric anomaly flags, serialized under the dashboard's field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFlags {
    // ---
    #[serde(rename = "tempAnomaly")]
    pub temperature: bool,
    #[serde(rename = "humAnomaly")]
    pub humidity: bool,
    #[serde(rename = "lightAnomaly")]
    pub light: bool,
    #[serde(rename = "airAnomaly")]
    pub air_quality: bool,
}

impl AnomalyFlags {
    // ---
    pub fn get(&self, metric: Metric) -> bool {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Light => self.light,
            Metric::AirQuality => self.air_quality,
        }
    }

    pub fn any(&self) -> bool {
        Metric::ALL.iter().any(|m| self.get(*m))
    }
}

/// Flag every present metric value that lies outside its bound.
///
/// Absent values are never flagged.
pub fn classify(reading: &SensorReading, thresholds: &MetricThresholds) -> AnomalyFlags {
    // ---
    let flag = |metric: Metric| {
        reading
            .value(metric)
            .is_some_and(|v| thresholds.bound(metric).is_outside(v))
    };

    AnomalyFlags {
        temperature: flag(Metric::Temperature),
        humidity: flag(Metric::Humidity),
        light: flag(Metric::Light),
        air_quality: flag(Metric::AirQuality),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reading(temp: Option<f64>, hum: Option<f64>, light: Option<f64>, air: Option<f64>) -> SensorReading {
        // ---
        SensorReading {
            timestamp: None,
            temperature: temp,
            humidity: hum,
            light,
            air_quality: air,
            flags: AnomalyFlags::default(),
        }
    }

    #[test]
    fn test_all_in_range() {
        // ---
        let flags = classify(
            &reading(Some(22.5), Some(65.0), Some(450.0), Some(40.0)),
            &MetricThresholds::default(),
        );
        assert_eq!(flags, AnomalyFlags::default());
        assert!(!flags.any());
    }

    #[test]
    fn test_temperature_above_max_only_sets_its_flag() {
        // ---
        let flags = classify(
            &reading(Some(30.0), Some(65.0), Some(450.0), Some(40.0)),
            &MetricThresholds::default(),
        );
        assert!(flags.temperature);
        assert!(!flags.humidity);
        assert!(!flags.light);
        assert!(!flags.air_quality);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        // ---
        let thresholds = MetricThresholds::default();
        let at_edges = classify(
            &reading(Some(18.0), Some(70.0), Some(200.0), Some(50.0)),
            &thresholds,
        );
        assert!(!at_edges.any());

        let past_edges = classify(
            &reading(Some(17.9), Some(70.1), Some(199.0), Some(50.5)),
            &thresholds,
        );
        assert!(past_edges.temperature);
        assert!(past_edges.humidity);
        assert!(past_edges.light);
        assert!(past_edges.air_quality);
    }

    #[test]
    fn test_upper_bound_has_no_floor() {
        // ---
        let flags = classify(
            &reading(None, None, None, Some(-5.0)),
            &MetricThresholds::default(),
        );
        assert!(!flags.air_quality);
    }

    #[test]
    fn test_absent_values_are_never_flagged() {
        // ---
        let strict = MetricThresholds {
            temperature: Bound::range(100.0, 101.0),
            humidity: Bound::range(100.0, 101.0),
            light: Bound::range(100.0, 101.0),
            air_quality: Bound::upper(-1.0),
        };
        let flags = classify(&reading(None, None, None, None), &strict);
        assert!(!flags.any());
    }

    #[test]
    fn test_classify_is_deterministic() {
        // ---
        let r = reading(Some(35.0), Some(10.0), None, Some(80.0));
        let thresholds = MetricThresholds::default();
        assert_eq!(classify(&r, &thresholds), classify(&r, &thresholds));
    }

    #[test]
    fn test_bound_description() {
        // ---
        assert_eq!(Bound::range(18.0, 28.0).describe("°C"), "Safe range: 18-28°C");
        assert_eq!(Bound::upper(50.0).describe(" AQI"), "Good range: <50 AQI");
    }
}
