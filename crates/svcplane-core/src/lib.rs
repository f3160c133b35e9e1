//! svcplane core — domain models, repository traits and the shared
//! primitives (errors, request context, predicates, optimistic writes)
//! used by every other crate in the workspace.

pub mod auth;
pub mod context;
pub mod error;
pub mod models;
pub mod predicate;
pub mod repository;
pub mod store;
pub mod visibility;

pub use auth::AuthInfo;
pub use context::RequestContext;
pub use error::{PlaneError, PlaneResult};
