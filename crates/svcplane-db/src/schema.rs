//! Schema definitions and migration runner for SurrealDB.
//!
//! Every resource table carries a `namespace` column (the plane's
//! partition). Tables that are patched optimistically carry a
//! `resource_version` bumped on every write. UUIDs are stored as strings.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "process_schema",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1 — service catalog, instances, bindings, access
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (global scope)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Role bindings (namespace access)
-- =======================================================================
DEFINE TABLE role_binding SCHEMAFULL;
DEFINE FIELD namespace ON TABLE role_binding TYPE string;
DEFINE FIELD user ON TABLE role_binding TYPE string;
DEFINE FIELD role ON TABLE role_binding TYPE string \
    ASSERT $value IN ['Admin', 'Developer', 'Auditor'];
DEFINE INDEX idx_role_binding_unique ON TABLE role_binding \
    COLUMNS namespace, user, role UNIQUE;
DEFINE INDEX idx_role_binding_user ON TABLE role_binding COLUMNS user;

-- =======================================================================
-- Secrets (any namespace)
-- =======================================================================
DEFINE TABLE secret SCHEMAFULL;
DEFINE FIELD namespace ON TABLE secret TYPE string;
DEFINE FIELD name ON TABLE secret TYPE string;
DEFINE FIELD data ON TABLE secret TYPE object FLEXIBLE DEFAULT {};
DEFINE INDEX idx_secret_ns_name ON TABLE secret \
    COLUMNS namespace, name UNIQUE;

-- =======================================================================
-- Service brokers (control-plane namespace)
-- =======================================================================
DEFINE TABLE service_broker SCHEMAFULL;
DEFINE FIELD namespace ON TABLE service_broker TYPE string;
DEFINE FIELD name ON TABLE service_broker TYPE string;
DEFINE FIELD url ON TABLE service_broker TYPE string;
DEFINE FIELD credentials_secret ON TABLE service_broker TYPE string;
DEFINE FIELD created_at ON TABLE service_broker TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_broker TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_broker_ns_name ON TABLE service_broker \
    COLUMNS namespace, name UNIQUE;

-- =======================================================================
-- Service offerings (control-plane namespace)
-- =======================================================================
DEFINE TABLE service_offering SCHEMAFULL;
DEFINE FIELD namespace ON TABLE service_offering TYPE string;
DEFINE FIELD name ON TABLE service_offering TYPE string;
DEFINE FIELD description ON TABLE service_offering TYPE string;
DEFINE FIELD broker_catalog_id ON TABLE service_offering TYPE string;
DEFINE FIELD broker_id ON TABLE service_offering TYPE string;
DEFINE FIELD created_at ON TABLE service_offering TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_offering TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_offering_ns ON TABLE service_offering \
    COLUMNS namespace;

-- =======================================================================
-- Service plans (control-plane namespace)
-- =======================================================================
DEFINE TABLE service_plan SCHEMAFULL;
DEFINE FIELD namespace ON TABLE service_plan TYPE string;
DEFINE FIELD name ON TABLE service_plan TYPE string;
DEFINE FIELD description ON TABLE service_plan TYPE string;
DEFINE FIELD free ON TABLE service_plan TYPE bool DEFAULT false;
DEFINE FIELD broker_catalog ON TABLE service_plan TYPE object FLEXIBLE;
DEFINE FIELD schemas ON TABLE service_plan TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD maintenance_version ON TABLE service_plan TYPE string \
    DEFAULT '';
DEFINE FIELD visibility_type ON TABLE service_plan TYPE string \
    ASSERT $value IN ['public', 'admin', 'organization'];
DEFINE FIELD visibility_organizations ON TABLE service_plan \
    TYPE array<string> DEFAULT [];
DEFINE FIELD offering_id ON TABLE service_plan TYPE option<string>;
DEFINE FIELD offering_name ON TABLE service_plan TYPE option<string>;
DEFINE FIELD broker_id ON TABLE service_plan TYPE option<string>;
DEFINE FIELD broker_name ON TABLE service_plan TYPE option<string>;
DEFINE FIELD labels ON TABLE service_plan TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD annotations ON TABLE service_plan TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD resource_version ON TABLE service_plan TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE service_plan TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_plan TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_plan_ns ON TABLE service_plan COLUMNS namespace;

-- =======================================================================
-- Service instances (tenant namespaces)
-- =======================================================================
DEFINE TABLE service_instance SCHEMAFULL;
DEFINE FIELD namespace ON TABLE service_instance TYPE string;
DEFINE FIELD name ON TABLE service_instance TYPE string;
DEFINE FIELD plan_id ON TABLE service_instance TYPE string;
DEFINE FIELD parameters ON TABLE service_instance TYPE option<string>;
DEFINE FIELD created_at ON TABLE service_instance TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_instance TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_instance_ns ON TABLE service_instance \
    COLUMNS namespace;

-- =======================================================================
-- Service bindings (tenant namespaces)
-- =======================================================================
DEFINE TABLE service_binding SCHEMAFULL;
DEFINE FIELD namespace ON TABLE service_binding TYPE string;
DEFINE FIELD name ON TABLE service_binding TYPE option<string>;
DEFINE FIELD instance_id ON TABLE service_binding TYPE string;
DEFINE FIELD app_id ON TABLE service_binding TYPE option<string>;
DEFINE FIELD created_at ON TABLE service_binding TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service_binding TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_binding_ns ON TABLE service_binding \
    COLUMNS namespace;
";

// -----------------------------------------------------------------------
// Schema v2 — app processes
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE process SCHEMAFULL;
DEFINE FIELD namespace ON TABLE process TYPE string;
DEFINE FIELD app_id ON TABLE process TYPE string;
DEFINE FIELD process_type ON TABLE process TYPE string;
DEFINE FIELD command ON TABLE process TYPE string DEFAULT '';
DEFINE FIELD detected_command ON TABLE process TYPE string DEFAULT '';
DEFINE FIELD desired_instances ON TABLE process TYPE option<int>;
DEFINE FIELD memory_mb ON TABLE process TYPE int;
DEFINE FIELD disk_quota_mb ON TABLE process TYPE int;
DEFINE FIELD health_check ON TABLE process TYPE object FLEXIBLE;
DEFINE FIELD labels ON TABLE process TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD annotations ON TABLE process TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD resource_version ON TABLE process TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE process TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE process TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_process_ns ON TABLE process COLUMNS namespace;
DEFINE INDEX idx_process_app ON TABLE process COLUMNS app_id;
";

/// Run all pending migrations.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}
