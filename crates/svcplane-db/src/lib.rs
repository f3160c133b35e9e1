//! svcplane store — opening a migrated SurrealDB store, schema migrations
//! and the namespaced repository implementations of the `svcplane-core`
//! traits.
//!
//! Every resource row carries the plane namespace it belongs to. User
//! callers are checked against `role_binding` rows before any read or
//! write; the controller identity bypasses those checks.

mod access;
mod connection;
mod error;
mod schema;

pub mod repository;

pub use connection::{DbConfig, PlaneStore, Repositories};
pub use error::DbError;
pub use schema::run_migrations;
