//! Broker client configuration.

use std::time::Duration;

/// Configuration for talking to service brokers.
#[derive(Debug, Clone)]
pub struct OsbConfig {
    /// Namespace holding brokers, offerings and plans.
    pub control_plane_namespace: String,
    /// Verify broker TLS certificates (default: true).
    pub verify_tls: bool,
    /// Whole-request timeout in seconds (default: 60).
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Value of the `X-Broker-API-Version` header.
    pub api_version: String,
    pub user_agent: String,
}

impl OsbConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for OsbConfig {
    fn default() -> Self {
        Self {
            control_plane_namespace: "cf".into(),
            verify_tls: true,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            api_version: "2.17".into(),
            user_agent: concat!("svcplane-osb/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}
