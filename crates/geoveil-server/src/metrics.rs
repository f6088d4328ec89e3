//! Prometheus metrics for the encryption service
//!
//! Privacy-safe metrics: only outcome and stage labels, never feature ids or coordinates.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use geoveil_core::Stage;

use crate::error::{Result, ServerError};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";
pub const OUTCOME_TIMEOUT: &str = "timeout";

pub fn record_request(outcome: &str, duration: Duration) {
    counter!("geoveil_requests_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("geoveil_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_request_start() {
    gauge!("geoveil_requests_in_flight").increment(1.0);
}

pub fn record_request_end() {
    gauge!("geoveil_requests_in_flight").decrement(1.0);
}

pub fn record_features(outcome: &str, count: usize) {
    counter!("geoveil_features_total", "outcome" => outcome.to_string()).increment(count as u64);
}

pub fn record_stage_failure(stage: Stage) {
    counter!("geoveil_stage_failures_total", "stage" => stage.as_str()).increment(1);
}

pub fn outcome_for<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => OUTCOME_OK,
        Err(ServerError::Timeout(_)) => OUTCOME_TIMEOUT,
        Err(e) if e.is_client_error() => OUTCOME_CLIENT_ERROR,
        Err(_) => OUTCOME_SERVER_ERROR,
    }
}

/// Install the global recorder; call once per process
pub fn init_prometheus_recorder() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install Prometheus recorder: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_for(&Ok::<_, ServerError>(())), OUTCOME_OK);
        assert_eq!(
            outcome_for::<()>(&Err(ServerError::InvalidRequest("bad".into()))),
            OUTCOME_CLIENT_ERROR
        );
        assert_eq!(
            outcome_for::<()>(&Err(ServerError::Timeout(Duration::from_secs(1)))),
            OUTCOME_TIMEOUT
        );
        assert_eq!(
            outcome_for::<()>(&Err(ServerError::Internal("boom".into()))),
            OUTCOME_SERVER_ERROR
        );
    }
}
