//! Configuration loader for the `sensorflow-insights` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The threshold table is assembled here once and is
//! read-only for the lifetime of the process.
//!
use std::env;

use anyhow::{anyhow, Result};

use crate::session::UploadPolicy;
use crate::thresholds::{Bound, MetricThresholds};

/// Parse an optional environment variable of type `$ty`, falling back to a default.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Like `parse_env!` for `f64`, but NaN and infinities are rejected.
macro_rules! parse_finite_env {
    ($var_name:expr, $default:expr) => {
        match env::var($var_name).ok() {
            Some(v) => {
                let value = v
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?;
                if !value.is_finite() {
                    return Err(anyhow!("Invalid {}: {} is not a finite number", $var_name, v.trim()));
                }
                value
            }
            None => $default,
        }
    };
}

/// Read an optional string environment variable; empty counts as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// HTTP listen port.
    pub listen_port: u16,

    /// Credential for the insights collaborator. `None` disables AI insights.
    pub insights_api_key: Option<String>,

    /// Insights collaborator base URL.
    pub insights_api_url: String,

    /// Model name passed to the collaborator.
    pub insights_model: String,

    /// Timeout for one collaborator round trip.
    pub insights_timeout_secs: u32,

    /// What to do with an upload that arrives while another is in flight.
    pub upload_policy: UploadPolicy,

    /// Anomaly thresholds per metric.
    pub thresholds: MetricThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_port: 8080,
            insights_api_key: None,
            insights_api_url: DEFAULT_API_URL.to_string(),
            insights_model: DEFAULT_MODEL.to_string(),
            insights_timeout_secs: 30,
            upload_policy: UploadPolicy::default(),
            thresholds: MetricThresholds::default(),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `INSIGHTS_API_KEY` – collaborator credential (default: unset)
/// - `INSIGHTS_API_URL` – collaborator base URL
/// - `INSIGHTS_MODEL` – model name (default: `gemini-2.5-flash`)
/// - `INSIGHTS_TIMEOUT_SECS` – request timeout (default: 30)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `UPLOAD_POLICY` – `supersede` or `reject` (default: `supersede`)
/// - `TEMP_MIN`, `TEMP_MAX`, `HUMIDITY_MIN`, `HUMIDITY_MAX`, `LIGHT_MIN`,
///   `LIGHT_MAX`, `AIR_QUALITY_MAX` – threshold overrides
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();
    let t = defaults.thresholds;

    let thresholds = MetricThresholds {
        temperature: load_range("TEMP_MIN", "TEMP_MAX", t.temperature)?,
        humidity: load_range("HUMIDITY_MIN", "HUMIDITY_MAX", t.humidity)?,
        light: load_range("LIGHT_MIN", "LIGHT_MAX", t.light)?,
        air_quality: Bound {
            min: None,
            max: Some(parse_finite_env!("AIR_QUALITY_MAX", t.air_quality.max.unwrap_or(50.0))),
        },
    };

    let upload_policy = match optional_env!("UPLOAD_POLICY") {
        Some(v) => v
            .parse::<UploadPolicy>()
            .map_err(|e| anyhow!("Invalid UPLOAD_POLICY: {}", e))?,
        None => defaults.upload_policy,
    };

    Ok(Config {
        listen_port: parse_env!("LISTEN_PORT", u16, defaults.listen_port),
        insights_api_key: optional_env!("INSIGHTS_API_KEY"),
        insights_api_url: optional_env!("INSIGHTS_API_URL").unwrap_or(defaults.insights_api_url),
        insights_model: optional_env!("INSIGHTS_MODEL").unwrap_or(defaults.insights_model),
        insights_timeout_secs: parse_env!("INSIGHTS_TIMEOUT_SECS", u32, defaults.insights_timeout_secs),
        upload_policy,
        thresholds,
    })
}

fn load_range(min_var: &str, max_var: &str, default: Bound) -> Result<Bound> {
    // ---
    let min = parse_finite_env!(min_var, default.min.unwrap_or(f64::NEG_INFINITY));
    let max = parse_finite_env!(max_var, default.max.unwrap_or(f64::INFINITY));
    if min > max {
        return Err(anyhow!("{} ({}) must not exceed {} ({})", min_var, min, max_var, max));
    }
    Ok(Bound::range(min, max))
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the collaborator credential while showing all other values.
    pub fn log_config(&self) {
        // ---
        let masked_key = match self.insights_api_key.as_deref() {
            Some(key) if key.chars().count() > 8 => {
                let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                format!("****{}", tail)
            }
            Some(_) => "****".to_string(),
            None => "(not set, AI insights disabled)".to_string(),
        };
        let t = &self.thresholds;

        tracing::info!("Configuration loaded:");
        tracing::info!("  LISTEN_PORT       : {}", self.listen_port);
        tracing::info!("  INSIGHTS_API_KEY  : {}", masked_key);
        tracing::info!("  INSIGHTS_API_URL  : {}", self.insights_api_url);
        tracing::info!("  INSIGHTS_MODEL    : {}", self.insights_model);
        tracing::info!("  INSIGHTS_TIMEOUT  : {}s", self.insights_timeout_secs);
        tracing::info!("  UPLOAD_POLICY     : {}", self.upload_policy);
        tracing::info!("  thresholds        : {:?}", t);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = Config::default();
        assert_eq!(config.listen_port, 8080);
        assert!(config.insights_api_key.is_none());
        assert_eq!(config.upload_policy, UploadPolicy::Supersede);
        assert_eq!(config.thresholds.temperature, Bound::range(18.0, 28.0));
        assert_eq!(config.thresholds.air_quality, Bound::upper(50.0));
    }

    #[test]
    fn test_load_range_rejects_inverted_band() {
        // ---
        // Variable names unique to this test so parallel tests do not collide.
        env::set_var("TEST_CFG_INVERTED_MIN", "30");
        env::set_var("TEST_CFG_INVERTED_MAX", "10");
        let result = load_range(
            "TEST_CFG_INVERTED_MIN",
            "TEST_CFG_INVERTED_MAX",
            Bound::range(0.0, 1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_range_uses_defaults_and_overrides() {
        // ---
        env::set_var("TEST_CFG_RANGE_MAX", " 35.5 ");
        let bound = load_range("TEST_CFG_RANGE_MIN", "TEST_CFG_RANGE_MAX", Bound::range(18.0, 28.0)).unwrap();
        assert_eq!(bound, Bound::range(18.0, 35.5));
    }

    #[test]
    fn test_load_range_rejects_garbage() {
        // ---
        env::set_var("TEST_CFG_GARBAGE_MIN", "cold");
        let err = load_range("TEST_CFG_GARBAGE_MIN", "TEST_CFG_GARBAGE_MAX", Bound::range(0.0, 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid TEST_CFG_GARBAGE_MIN"));
    }

    #[test]
    fn test_load_range_rejects_non_finite() {
        // ---
        env::set_var("TEST_CFG_NAN_MIN", "NaN");
        let err = load_range("TEST_CFG_NAN_MIN", "TEST_CFG_NAN_MAX", Bound::range(18.0, 28.0)).unwrap_err();
        assert!(err.to_string().contains("Invalid TEST_CFG_NAN_MIN"));

        env::set_var("TEST_CFG_INF_MAX", "inf");
        let err = load_range("TEST_CFG_INF_MIN", "TEST_CFG_INF_MAX", Bound::range(18.0, 28.0)).unwrap_err();
        assert!(err.to_string().contains("Invalid TEST_CFG_INF_MAX"));
    }

    #[test]
    fn test_air_quality_max_rejects_non_finite() {
        // ---
        // The only test touching AIR_QUALITY_MAX.
        env::set_var("AIR_QUALITY_MAX", "-inf");
        let err = load_from_env().unwrap_err();
        env::remove_var("AIR_QUALITY_MAX");
        assert!(err.to_string().contains("Invalid AIR_QUALITY_MAX"));
    }
}
