//! Retry configuration and backoff calculation.
//!
//! The portable, sync-only building blocks for the retrying transport in
//! `pilot-client` (which owns the async sleep loop):
//!
//! - [`RetryConfig`]: Retry parameters (attempt budget, backoff, jitter)
//! - [`backoff_delay`]: Exponential backoff with symmetric jitter
//! - [`parse_retry_after`]: Parse a `Retry-After` HTTP header

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum retries.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Default jitter factor (0.0–1.0).
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Configuration for the retrying transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in ms (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between retries in ms (default: 60000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor 0.0–1.0 (default: 0.2).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

/// Calculate the backoff delay for a retry attempt.
///
/// Formula: `min(max_delay, base_delay * 2^attempt) * (1 + (random*2-1) * jitter)`
///
/// `random` must be a value in `[0.0, 1.0)` from a PRNG; the jitter is
/// applied symmetrically, so a factor of 0.2 varies the delay by ±20%.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn backoff_delay(attempt: u32, config: &RetryConfig, random: f64) -> Duration {
    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(config.max_delay_ms);

    // Maps random [0,1) to [-jitter, +jitter]
    let jitter = 1.0 + (random * 2.0 - 1.0) * config.jitter_factor;
    let with_jitter = ((capped as f64) * jitter).round().max(0.0) as u64;

    Duration::from_millis(with_jitter)
}

/// Parse a `Retry-After` HTTP header value.
///
/// The value can be either a number of seconds (e.g. `"120"`) or an
/// HTTP-date (e.g. `"Thu, 01 Dec 2025 16:00:00 GMT"`). Returns `None` if
/// parsing fails; a past date parses to a zero delay.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let delay_ms = date
            .signed_duration_since(chrono::Utc::now())
            .num_milliseconds();
        let delay_ms = u64::try_from(delay_ms).unwrap_or(0);
        return Some(Duration::from_millis(delay_ms));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 60_000);
        assert!((config.jitter_factor - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_defaults() {
        let config: RetryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 1000);
    }

    #[test]
    fn config_serde_camel_case() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"maxRetries":2,"baseDelayMs":100}"#).unwrap();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay_ms, 100);
    }

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn backoff_exponential_growth() {
        let config = no_jitter();
        assert_eq!(backoff_delay(0, &config, 0.5).as_millis(), 1000);
        assert_eq!(backoff_delay(1, &config, 0.5).as_millis(), 2000);
        assert_eq!(backoff_delay(2, &config, 0.5).as_millis(), 4000);
        assert_eq!(backoff_delay(3, &config, 0.5).as_millis(), 8000);
    }

    #[test]
    fn backoff_caps_at_max() {
        let config = no_jitter();
        assert_eq!(backoff_delay(10, &config, 0.5).as_millis(), 60_000);
    }

    #[test]
    fn backoff_jitter_range() {
        let config = RetryConfig::default();
        // random = 0.0 → -20%, random ≈ 1.0 → +20%
        assert_eq!(backoff_delay(0, &config, 0.0).as_millis(), 800);
        assert_eq!(backoff_delay(0, &config, 0.5).as_millis(), 1000);
        assert_eq!(backoff_delay(0, &config, 1.0).as_millis(), 1200);
    }

    #[test]
    fn backoff_high_attempt_no_overflow() {
        let config = RetryConfig::default();
        let delay = backoff_delay(100, &config, 0.5);
        assert!(delay.as_millis() > 0);
        assert!(delay.as_millis() <= 72_000);
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_invalid() {
        assert_eq!(parse_retry_after("not-a-number"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn retry_after_future_http_date() {
        use chrono::{TimeZone, Utc};
        let future = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap().to_rfc2822();
        let delay = parse_retry_after(&future).unwrap();
        assert!(delay > Duration::ZERO);
    }

    #[test]
    fn retry_after_past_http_date_is_zero() {
        use chrono::{TimeZone, Utc};
        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().to_rfc2822();
        assert_eq!(parse_retry_after(&past), Some(Duration::ZERO));
    }
}
