//! skylift-core — shared domain types for the skylift provisioning crates.
//!
//! Holds the vocabulary the other crates speak: instance roles and
//! resource shapes (`types`), the single validated `ClusterConfig` passed
//! down from the orchestrator to every lifecycle (`config`), and unique
//! name generation for applications and worker instances (`names`).

pub mod config;
pub mod names;
pub mod types;

pub use config::ClusterConfig;
pub use types::{PortMapping, Protocol, Resources, RestartPolicy, Role};
