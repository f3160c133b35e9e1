//! SurrealDB repository implementations.

mod binding;
mod broker;
mod instance;
mod offering;
mod organization;
mod plan;
mod process;
mod role_binding;
mod secret;

pub use binding::SurrealServiceBindingRepository;
pub use broker::SurrealServiceBrokerRepository;
pub use instance::SurrealServiceInstanceRepository;
pub use offering::SurrealServiceOfferingRepository;
pub use organization::SurrealOrganizationRepository;
pub use plan::SurrealServicePlanRepository;
pub use process::SurrealProcessRepository;
pub use role_binding::SurrealRoleBindingRepository;
pub use secret::SurrealSecretRepository;

use std::collections::BTreeMap;

use surrealdb_types::SurrealValue;

use crate::error::{DbError, from_json};

/// Row struct for conditional writes that only need the new version.
#[derive(Debug, SurrealValue)]
pub(crate) struct VersionRow {
    pub resource_version: u64,
}

/// Decode a stored label/annotation object. `NONE` or `null` is empty.
pub(crate) fn string_map(
    value: serde_json::Value,
    field: &str,
) -> Result<BTreeMap<String, String>, DbError> {
    if value.is_null() {
        return Ok(BTreeMap::new());
    }
    from_json(value, field)
}
