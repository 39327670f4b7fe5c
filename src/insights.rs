//! Insight request builder.
//!
//! Turns a series and its statistics into an [`InsightRequest`], hands it to
//! an [`InsightCollaborator`], and validates what comes back. Every failure
//! on that path is absorbed here: the caller always receives a usable list,
//! at worst a single fallback warning.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collaborator::InsightCollaborator;
use crate::error::InsightError;
use crate::models::{Insight, Metric, SensorReading, Severity, StatsCollection};
use crate::thresholds::MetricThresholds;

// ---

/// Upper bound on insights requested from, and accepted from, the collaborator.
pub const MAX_INSIGHTS: usize = 4;

/// Everything the collaborator is told about one series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    // ---
    pub reading_count: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub stats: StatsCollection,
    pub max_insights: usize,
    pub prompt: String,
}

/// Build the collaborator request for `series`.
pub fn build_request(
    series: &[SensorReading],
    stats: &StatsCollection,
    thresholds: &MetricThresholds,
) -> InsightRequest {
    // ---
    let first_timestamp = series.first().and_then(|r| r.timestamp);
    let last_timestamp = series.last().and_then(|r| r.timestamp);

    let summary: Vec<String> = Metric::ALL
        .iter()
        .map(|&metric| describe_metric(metric, stats, thresholds))
        .collect();

    let prompt = format!(
        "Analyze the following summary of environmental sensor data.\n\
         Data points: {count}\n\
         Time range: {first} to {last}\n\
         \n\
         Statistical Summary:\n\
         {summary}\n\
         \n\
         Provide up to {max} key insights. Identify significant trends, anomalies, and \
         correlations. For each insight, provide a title, a short description, a severity \
         level ('info', 'warning', 'critical', 'success'), and a concise, actionable \
         recommendation. If all readings are within optimal ranges, provide a 'success' \
         insight confirming system stability.",
        count = series.len(),
        first = format_timestamp(first_timestamp),
        last = format_timestamp(last_timestamp),
        summary = summary.join("\n"),
        max = MAX_INSIGHTS,
    );

    InsightRequest {
        reading_count: series.len(),
        first_timestamp,
        last_timestamp,
        stats: *stats,
        max_insights: MAX_INSIGHTS,
        prompt,
    }
}

/// Parse and validate the collaborator's raw answer.
///
/// Accepts a bare JSON array or one wrapped in a Markdown code fence. More
/// than [`MAX_INSIGHTS`] entries is a failure, as is any entry missing a field
/// or carrying an unknown severity.
pub fn parse_response(raw: &str) -> Result<Vec<Insight>, InsightError> {
    // ---
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(InsightError::EmptyResponse);
    }

    let insights: Vec<Insight> = serde_json::from_str(body)?;
    if insights.len() > MAX_INSIGHTS {
        return Err(InsightError::TooMany(insights.len()));
    }
    Ok(insights)
}

/// Produce the insight list for a series. Never fails.
///
/// `collaborator` is `None` when no credential is configured; that case is
/// answered locally without any network traffic. An empty series yields an
/// empty list and the collaborator is not contacted.
pub async fn generate_insights(
    series: &[SensorReading],
    stats: &StatsCollection,
    thresholds: &MetricThresholds,
    collaborator: Option<&dyn InsightCollaborator>,
) -> Vec<Insight> {
    // ---
    let Some(collaborator) = collaborator else {
        warn!("Insights API key not configured; AI insights disabled");
        return vec![fallback_insight(&InsightError::MissingCredential)];
    };

    if series.is_empty() {
        return Vec::new();
    }

    let request = build_request(series, stats, thresholds);
    debug!("Insight prompt:\n{}", request.prompt);

    let result = match collaborator.complete(&request).await {
        Ok(raw) => parse_response(&raw),
        Err(e) => Err(e),
    };

    match result {
        Ok(insights) => {
            info!("Received {} insights from collaborator", insights.len());
            insights
        }
        Err(e) => {
            warn!("Insight generation failed: {}", e);
            vec![fallback_insight(&e)]
        }
    }
}

/// Local stand-in used whenever the collaborator cannot deliver.
pub fn fallback_insight(error: &InsightError) -> Insight {
    // ---
    if matches!(error, InsightError::MissingCredential) {
        return missing_credential_insight();
    }

    Insight {
        severity: Severity::Warning,
        title: "AI Insights Unavailable".to_string(),
        description: format!("Insight generation failed: {error}."),
        recommendation: "The readings and statistics above are unaffected. Retry later or check \
                         the insights service configuration."
            .to_string(),
    }
}

fn missing_credential_insight() -> Insight {
    Insight {
        severity: Severity::Warning,
        title: "Insights API Key Not Found".to_string(),
        description: "Insight generation failed: the API key is missing, so AI-powered insights \
                      are unavailable."
            .to_string(),
        recommendation: "Set INSIGHTS_API_KEY in the environment to enable this feature."
            .to_string(),
    }
}

// ---

fn describe_metric(metric: Metric, stats: &StatsCollection, thresholds: &MetricThresholds) -> String {
    // ---
    let s = stats.get(metric);
    let p = metric.precision();
    let unit = metric.unit();

    format!(
        "- {label}: Current: {current:.p$}{unit}, Avg: {avg:.p$}{unit}, \
         Range: {min:.p$}-{max:.p$}{unit}. Anomalies detected in {anomalies} readings. {range}.",
        label = metric.label(),
        current = s.current,
        avg = s.avg,
        min = s.min,
        max = s.max,
        anomalies = s.anomalies,
        range = thresholds.bound(metric).describe(unit),
    )
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339())
}

fn strip_code_fence(text: &str) -> &str {
    // ---
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = match inner.split_once('\n') {
        // Drop an optional language tag such as `json` on the opening line.
        Some((_, rest)) => rest,
        None => inner.trim_start_matches("json"),
    };
    let inner = inner.trim_end();
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
