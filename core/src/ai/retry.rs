use super::TranslationError;
use serde_json::Value;
use std::time::{Duration, SystemTime};

/// Longest server-provided delay that will be honored, regardless of what the
/// Retry-After header or RetryInfo detail asks for.
pub const MAX_SERVER_HINT_WINDOW: Duration = Duration::from_secs(60);

/// Policy parameters for retry decisions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay used for the first retry attempt.
    pub base_delay: Duration,
    /// Cap on the backoff delay, regardless of exponentiation or hints.
    pub max_delay: Duration,
    /// Maximum number of retry attempts allowed per leaf.
    pub max_retries: u32,
}

impl RetryPolicy {
    pub const fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60), 5)
    }
}

/// Returns how long to wait before the next attempt, or `None` when the error
/// should not be retried (or the attempt budget is spent).
///
/// * `previous_attempts` counts the retries that have already been made.
pub fn next_delay(
    error: &TranslationError,
    policy: RetryPolicy,
    previous_attempts: u32,
) -> Option<Duration> {
    if previous_attempts >= policy.max_retries || !error.is_retryable() {
        return None;
    }

    if let Some(hint) = error.retry_hint() {
        return Some(hint.min(MAX_SERVER_HINT_WINDOW).min(policy.max_delay));
    }

    Some(exponential_backoff(policy, previous_attempts))
}

fn exponential_backoff(policy: RetryPolicy, previous_attempts: u32) -> Duration {
    if policy.base_delay.is_zero() {
        return Duration::ZERO;
    }

    let base_ms = policy.base_delay.as_millis();
    let max_ms = policy.max_delay.as_millis();

    let mut multiplier: u128 = 1;
    for _ in 0..previous_attempts {
        multiplier = multiplier.saturating_mul(2);
    }

    let delay_ms = base_ms.saturating_mul(multiplier).min(max_ms);
    Duration::from_millis(delay_ms as u64)
}

/// Parses the value of an HTTP `Retry-After` header, either a delta in
/// seconds or an HTTP-date.
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(instant) = httpdate::parse_http_date(trimmed) {
        return Some(instant.duration_since(now).unwrap_or(Duration::ZERO));
    }

    None
}

/// Scans a Gemini error body for a `RetryInfo` detail and extracts its
/// `retryDelay`, which arrives either as a string such as `"3s"` or as a
/// protobuf duration object with `seconds`/`nanos` fields.
pub fn retry_hint_from_error_body(body: &str) -> Option<Duration> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    let details = value.get("error")?.get("details")?.as_array()?;

    details
        .iter()
        .filter(|detail| {
            detail
                .get("@type")
                .and_then(Value::as_str)
                .map(|type_url| type_url.ends_with("RetryInfo"))
                .unwrap_or(false)
        })
        .find_map(|detail| parse_retry_delay(detail.get("retryDelay")?))
}

fn parse_retry_delay(value: &Value) -> Option<Duration> {
    if let Some(text) = value.as_str() {
        let stripped = text.trim().strip_suffix('s')?;
        let seconds = stripped.parse::<f64>().ok()?;
        if !seconds.is_finite() || seconds.is_sign_negative() {
            return None;
        }
        return Some(Duration::from_secs_f64(seconds));
    }

    let object = value.as_object()?;
    let seconds = object.get("seconds").and_then(numeric_field).unwrap_or(0);
    let nanos = object.get("nanos").and_then(numeric_field).unwrap_or(0);
    if seconds < 0 || nanos < 0 {
        return None;
    }

    let mut duration = Duration::from_secs(seconds.try_into().ok()?);
    duration += Duration::from_nanos(u64::from(u32::try_from(nanos).ok()?));
    Some(duration)
}

fn numeric_field(value: &Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    value.as_str()?.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RetryPolicy = RetryPolicy::new(
        Duration::from_secs(5),
        Duration::from_secs(60),
        5,
    );

    fn rate_limited(retry_hint: Option<Duration>) -> TranslationError {
        TranslationError::RateLimited {
            message: "quota exceeded".into(),
            retry_hint,
        }
    }

    #[test]
    fn uses_hint_delay_when_available() {
        let delay = next_delay(&rate_limited(Some(Duration::from_secs(19))), POLICY, 0);
        assert_eq!(delay, Some(Duration::from_secs(19)));
    }

    #[test]
    fn clamps_oversized_hints() {
        let delay = next_delay(&rate_limited(Some(Duration::from_secs(600))), POLICY, 0);
        assert_eq!(delay, Some(MAX_SERVER_HINT_WINDOW));
    }

    #[test]
    fn backoff_doubles_without_hint() {
        let first = next_delay(&rate_limited(None), POLICY, 0);
        let second = next_delay(&rate_limited(None), POLICY, 1);
        let third = next_delay(&rate_limited(None), POLICY, 2);

        assert_eq!(first, Some(Duration::from_secs(5)));
        assert_eq!(second, Some(Duration::from_secs(10)));
        assert_eq!(third, Some(Duration::from_secs(20)));
    }

    #[test]
    fn backoff_respects_max_delay() {
        let delay = next_delay(&rate_limited(None), POLICY, 4);
        assert_eq!(delay, Some(Duration::from_secs(60)));
    }

    #[test]
    fn attempt_budget_is_bounded() {
        assert_eq!(next_delay(&rate_limited(None), POLICY, 5), None);
    }

    #[test]
    fn auth_errors_fail_fast() {
        let error = TranslationError::InvalidApiKey {
            message: "bad key".into(),
        };
        assert_eq!(next_delay(&error, POLICY, 0), None);
    }

    #[test]
    fn network_errors_are_retried() {
        let error = TranslationError::NetworkOrHttp {
            message: "connection reset".into(),
        };
        assert_eq!(next_delay(&error, POLICY, 0), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_retry_after_seconds_header() {
        let duration = parse_retry_after("120", SystemTime::now()).unwrap();
        assert_eq!(duration, Duration::from_secs(120));
    }

    #[test]
    fn parse_retry_after_http_date() {
        // Align `now` to a whole second: `fmt_http_date` has one-second
        // resolution, so a fractional `now` would skew the parsed delta.
        let unix_secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(unix_secs);
        let later = now + Duration::from_secs(30);
        let header = httpdate::fmt_http_date(later);
        let parsed = parse_retry_after(&header, now).unwrap();
        assert_eq!(parsed.as_secs(), 30);
    }

    #[test]
    fn retry_info_string_delay() {
        let body = r#"{
            "error": {
                "code": 429,
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "1.5s" }
                ]
            }
        }"#;
        assert_eq!(
            retry_hint_from_error_body(body),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn retry_info_object_delay() {
        let body = r#"{
            "error": {
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.RetryInfo",
                      "retryDelay": { "seconds": "3", "nanos": 500000000 } }
                ]
            }
        }"#;
        assert_eq!(
            retry_hint_from_error_body(body),
            Some(Duration::from_millis(3500))
        );
    }

    #[test]
    fn bodies_without_retry_info_yield_nothing() {
        assert_eq!(retry_hint_from_error_body("not json"), None);
        assert_eq!(
            retry_hint_from_error_body(r#"{"error":{"details":[{"@type":"QuotaFailure"}]}}"#),
            None
        );
    }
}
