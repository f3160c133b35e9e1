//! svcplane access — read and visibility operations over the namespaced
//! store on behalf of a caller.
//!
//! This crate provides:
//! - The authorized scatter-gather lister ([`ScatterGatherLister`])
//! - Process listing, lookup and scaling ([`ProcessService`])
//! - Plan listing and the plan visibility operations ([`PlanService`])

pub mod config;
pub mod lister;
pub mod plan;
pub mod process;

pub use config::AccessConfig;
pub use lister::ScatterGatherLister;
pub use plan::{ListPlansMessage, PlanRecord, PlanService, PlanVisibilityMessage};
pub use process::{ListProcessesMessage, ProcessRecord, ProcessService, ScaleProcessMessage};
