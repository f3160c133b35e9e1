//! svcplane OSB — drives external service brokers over the Open Service
//! Broker API.
//!
//! This crate provides:
//! - Reference resolution from bindings and instances to the broker that
//!   serves them ([`ReferenceResolver`])
//! - A single-request executor with Basic auth and OSB headers
//!   ([`RequestExecutor`])
//! - The broker operations themselves ([`ServiceBrokerClient`],
//!   [`OsbClient`])

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod requester;
pub mod resolver;

pub use catalog::{BindingResponse, Catalog, LastOperation};
pub use client::{OsbClient, ServiceBrokerClient};
pub use config::OsbConfig;
pub use error::RequestError;
pub use requester::{BrokerRequest, BrokerResponse, RequestExecutor};
pub use resolver::{BrokerCredentials, ReferenceResolver, ResolverStores};
