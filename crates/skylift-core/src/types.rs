//! Shared types used across skylift crates.

use serde::{Deserialize, Serialize};

/// Name of the provider-level application owning a cluster's instances.
pub type AppName = String;

/// Name of a compute instance, unique within its application.
pub type InstanceName = String;

/// Identifier handed back by `add_worker` — the worker's instance name.
pub type WorkerId = String;

/// Which process an instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The single control-plane process clients and workers connect to.
    Scheduler,
    /// A compute process that joins the scheduler.
    Worker,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Scheduler => "scheduler",
            Role::Worker => "worker",
        }
    }
}

/// Per-instance compute resources requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Number of (shared) CPUs.
    pub cpus: u32,
    /// Memory in megabytes.
    pub memory_mb: u32,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            cpus: 1,
            memory_mb: 1024,
        }
    }
}

/// Transport protocol for a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// One published port on an instance.
///
/// `port` is the externally visible port, `internal_port` the one the
/// remote process listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub port: u16,
    pub internal_port: u16,
    pub protocol: Protocol,
    /// Provider-side connection handlers (e.g. "http", "tls").
    #[serde(default)]
    pub handlers: Vec<String>,
}

impl PortMapping {
    /// A plain TCP mapping with matching external and internal port.
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            internal_port: port,
            protocol: Protocol::Tcp,
            handlers: Vec::new(),
        }
    }
}

/// Restart behavior requested for the remote process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Never restart — the orchestrator owns the instance lifecycle.
    #[default]
    No,
    OnFailure,
    Always,
}
