//! Statistics aggregator over a fully assembled series.

use crate::models::{Metric, MetricStats, SensorReading, StatsCollection};

// ---

/// Summarize every metric over `series`.
///
/// Absent and non-finite values are skipped. A metric with no present value gets the
/// all-zero [`MetricStats::default`].
pub fn aggregate(series: &[SensorReading]) -> StatsCollection {
    // ---
    let mut stats = StatsCollection::default();
    for metric in Metric::ALL {
        *stats.get_mut(metric) = metric_stats(series, metric);
    }
    stats
}

fn metric_stats(series: &[SensorReading], metric: Metric) -> MetricStats {
    // ---
    let values: Vec<f64> = series
        .iter()
        .filter_map(|r| r.value(metric))
        .filter(|v| v.is_finite())
        .collect();

    let (last, rest) = match values.split_last() {
        Some(split) => split,
        None => return MetricStats::default(),
    };

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Summation rounding can land the mean an ulp outside [min, max].
    let avg = (values.iter().sum::<f64>() / values.len() as f64).clamp(min, max);
    let change = rest.last().map_or(0.0, |prev| last - prev);
    let anomalies = series.iter().filter(|r| r.is_anomalous(metric)).count();

    MetricStats {
        current: *last,
        min,
        max,
        avg,
        change,
        anomalies,
    }
}
