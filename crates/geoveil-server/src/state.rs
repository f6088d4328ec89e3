//! Shared request state

use std::sync::Arc;
use std::time::Duration;

use geoveil_core::Pipeline;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::JwtVerifier;
use crate::config::ServerConfig;
use crate::error::Result;

/// Everything a handler needs; read-only after startup, so no lock
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub auth: Option<Arc<JwtVerifier>>,
    pub request_timeout: Duration,
    pub cors: bool,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, config: &ServerConfig) -> Result<Self> {
        let auth = match &config.auth.secret {
            Some(secret) => Some(Arc::new(JwtVerifier::new(secret, &config.auth.audience)?)),
            None => None,
        };
        Ok(Self {
            pipeline,
            auth,
            request_timeout: config.request_timeout,
            cors: config.cors,
            prometheus: None,
        })
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth.is_some()
    }
}
