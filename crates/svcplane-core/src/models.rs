//! Domain models for the service plane.
//!
//! Brokers, offerings and plans live in the control-plane namespace;
//! instances, bindings and processes live in tenant namespaces.

pub mod binding;
pub mod broker;
pub mod instance;
pub mod offering;
pub mod organization;
pub mod plan;
pub mod process;
pub mod role_binding;
pub mod secret;
