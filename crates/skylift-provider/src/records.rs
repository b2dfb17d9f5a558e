//! Wire records exchanged with a provider.
//!
//! These mirror what create/get calls carry over the provider API. They
//! are deliberately thin: the lifecycle state machines in
//! `skylift-provision` own the interesting state, the provider only
//! reports what it has allocated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use skylift_core::types::{PortMapping, Resources, RestartPolicy};

/// Provider-reported application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// Accepted, still materializing.
    Pending,
    /// Instances may be created inside it.
    Ready,
    /// Creation failed provider-side.
    Failed,
}

/// An application as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    /// Provider-assigned (or accepted) globally unique name.
    pub name: String,
    pub status: AppPhase,
}

/// Provider-reported instance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    /// Create accepted, nothing scheduled yet.
    Pending,
    /// Booting; network identity may not exist yet.
    Starting,
    /// Process launched.
    Running,
    /// Reachable at its advertised addresses.
    Ready,
    /// Stopped or being reaped.
    Stopped,
}

impl InstancePhase {
    /// Whether the provider considers the instance up.
    pub fn is_up(&self) -> bool {
        matches!(self, InstancePhase::Running | InstancePhase::Ready)
    }
}

/// An instance as the provider reports it.
///
/// Address fields stay `None` until the provider has allocated a network
/// identity; both are plain `host:port` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    pub status: InstancePhase,
    /// Address on the provider's private network.
    pub internal_address: Option<String>,
    /// Publicly reachable address.
    pub external_address: Option<String>,
}

/// Declarative create request for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub image: String,
    /// The remote process invocation, argv-style.
    pub command: Vec<String>,
    pub region: String,
    pub resources: Resources,
    pub env: HashMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub restart: RestartPolicy,
}
