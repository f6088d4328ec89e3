//! Server configuration: bind address, deadline, CORS and bearer-token auth

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::DEFAULT_AUDIENCE;

/// Bearer-token settings; `secret: None` disables authentication
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub secret: Option<Vec<u8>>,
    pub audience: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("audience", &self.audience)
            .finish()
    }
}

impl AuthConfig {
    pub fn jwt(secret: impl Into<Vec<u8>>, audience: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            audience: audience.into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            secret: None,
            audience: DEFAULT_AUDIENCE.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub addr: SocketAddr,
    /// Deadline for one whole request, all features included
    pub request_timeout: Duration,
    /// Allow any origin, method and header
    pub cors: bool,
    pub auth: AuthConfig,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8000).into(),
            request_timeout: Duration::from_secs(30),
            cors: true,
            auth: AuthConfig::disabled(),
            metrics: false,
        }
    }
}
