//! Built-in demo data set served by `POST /api/uploads/sample`.

use std::f64::consts::PI;
use std::fmt::Write;

use crate::pipeline::UploadedFile;

// ---

pub const SAMPLE_FILE_NAME: &str = "sample-data.csv";

/// One day of hourly readings with a warm afternoon, a humid night, dark
/// hours and an evening air-quality spike.
pub fn sample_csv() -> String {
    // ---
    let mut csv = String::from("date,time,temperature,humidity,light,airQuality\n");

    for hour in 0..24u32 {
        let phase = (f64::from(hour) - 9.0) * PI / 12.0;
        let temperature = 23.0 + 5.5 * phase.sin();
        let humidity = 60.0 - 12.0 * phase.sin();
        let daylight = ((f64::from(hour) - 6.0) * PI / 12.0).sin();
        let light = if (6..=18).contains(&hour) { (950.0 * daylight).max(80.0) } else { 80.0 };
        let air_quality = match hour {
            17..=19 => 70.0 + 5.0 * f64::from(hour - 17),
            _ => 30.0 + 8.0 * phase.cos().abs(),
        };

        // Writing to a String cannot fail.
        let _ = writeln!(
            csv,
            "2024-01-01,{hour:02}:00,{temperature:.1},{humidity:.1},{light:.0},{air_quality:.0}"
        );
    }

    csv
}

pub fn sample_upload() -> Vec<UploadedFile> {
    vec![UploadedFile {
        name: SAMPLE_FILE_NAME.to_string(),
        content: sample_csv(),
    }]
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Metric;
    use crate::parser::parse_csv;
    use crate::thresholds::MetricThresholds;

    #[test]
    fn test_sample_parses_fully() {
        // ---
        let readings = parse_csv(&sample_csv(), &MetricThresholds::default()).unwrap();
        assert_eq!(readings.len(), 24);
        assert!(readings.iter().all(|r| r.timestamp.is_some()));
        assert!(readings
            .iter()
            .all(|r| Metric::ALL.iter().all(|m| r.value(*m).is_some())));
    }

    #[test]
    fn test_sample_contains_anomalies() {
        // ---
        let readings = parse_csv(&sample_csv(), &MetricThresholds::default()).unwrap();
        for metric in Metric::ALL {
            assert!(
                readings.iter().any(|r| r.is_anomalous(metric)),
                "expected at least one {metric:?} anomaly"
            );
        }
    }
}
