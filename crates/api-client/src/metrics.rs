//! Client-side metrics
//!
//! Emitted through the `metrics` facade; the embedding application decides
//! whether a recorder is installed. Without one every call is a no-op.
//!
//! - `api_requests_total` (counter): labels `method`, `status`
//! - `api_request_duration_seconds` (histogram): label `method`
//! - `api_errors_total` (counter): label `code`
//! - `api_token_refresh_total` (counter): label `outcome`

/// Status label used when no HTTP response was received.
pub const NO_RESPONSE: &str = "none";

/// Record one transport attempt. `status` is `None` when the request never
/// got a response.
pub fn record_request(method: &str, status: Option<u16>, duration_secs: f64) {
    let status = status.map_or_else(|| NO_RESPONSE.to_string(), |s| s.to_string());
    metrics::counter!("api_requests_total", "method" => method.to_string(), "status" => status)
        .increment(1);
    metrics::histogram!("api_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

/// Record a failure envelope handed back to a caller.
pub fn record_error(code: &str) {
    metrics::counter!("api_errors_total", "code" => code.to_string()).increment(1);
}

/// Record a settled token refresh (`success`, `failure`, or `superseded`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_token_refresh_total", "outcome" => outcome).increment(1);
}
