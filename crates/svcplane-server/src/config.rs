//! Process configuration assembled from `SVCPLANE_*` environment
//! variables. Unset variables keep the library defaults.

use std::str::FromStr;

use svcplane_access::AccessConfig;
use svcplane_db::DbConfig;
use svcplane_osb::OsbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub osb: OsbConfig,
    pub access: AccessConfig,
}

impl ServerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        set_string(&lookup, "SVCPLANE_DB_URL", &mut config.db.url);
        set_string(&lookup, "SVCPLANE_DB_NAMESPACE", &mut config.db.namespace);
        set_string(&lookup, "SVCPLANE_DB_DATABASE", &mut config.db.database);
        set_string(&lookup, "SVCPLANE_DB_USERNAME", &mut config.db.username);
        set_string(&lookup, "SVCPLANE_DB_PASSWORD", &mut config.db.password);

        if let Some(namespace) = lookup("SVCPLANE_CONTROL_PLANE_NAMESPACE") {
            config.osb.control_plane_namespace = namespace.clone();
            config.access.control_plane_namespace = namespace;
        }

        set_parsed(&lookup, "SVCPLANE_BROKER_VERIFY_TLS", &mut config.osb.verify_tls)?;
        set_parsed(
            &lookup,
            "SVCPLANE_BROKER_REQUEST_TIMEOUT_SECS",
            &mut config.osb.request_timeout_secs,
        )?;
        set_parsed(
            &lookup,
            "SVCPLANE_BROKER_CONNECT_TIMEOUT_SECS",
            &mut config.osb.connect_timeout_secs,
        )?;
        set_string(&lookup, "SVCPLANE_BROKER_API_VERSION", &mut config.osb.api_version);
        set_parsed(
            &lookup,
            "SVCPLANE_MAX_PATCH_ATTEMPTS",
            &mut config.access.max_patch_attempts,
        )?;
        set_parsed(
            &lookup,
            "SVCPLANE_MAX_CONCURRENT_NAMESPACE_QUERIES",
            &mut config.access.max_concurrent_namespace_queries,
        )?;

        Ok(config)
    }
}

fn set_string<F>(lookup: &F, key: &'static str, target: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *target = value;
    }
}

fn set_parsed<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value })?;
    }
    Ok(())
}
