//! Cluster configuration.
//!
//! One explicit, validated struct passed down from the orchestrator to the
//! application and instance lifecycles at construction time. There are no
//! fallback lookups at call time — if a value matters, it is a field here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::types::{PortMapping, Protocol, Resources, RestartPolicy};

/// Default control-plane listener port (scheduler ↔ worker/client traffic).
pub const DEFAULT_CONTROL_PORT: u16 = 8786;

/// Default dashboard listener port.
pub const DEFAULT_DASHBOARD_PORT: u16 = 8787;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Provider API credential.
    pub api_token: String,
    /// Provider region to place all instances in.
    pub region: String,
    /// Container image every instance boots.
    pub image: String,
    /// Restart behavior requested from the provider.
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    /// Interval between readiness polls, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Overall limit on any single create-and-resolve sequence, in seconds.
    #[serde(default = "default_provision_timeout_secs")]
    pub provision_timeout_secs: u64,
    /// Resources for the scheduler instance.
    #[serde(default)]
    pub scheduler_resources: Resources,
    /// Resources for each worker instance.
    #[serde(default)]
    pub worker_resources: Resources,
    /// Control-plane listener mapping.
    #[serde(default = "default_control_port")]
    pub control_port: PortMapping,
    /// Optional dashboard listener mapping.
    #[serde(default)]
    pub dashboard_port: Option<PortMapping>,
    /// Extra environment variables injected into every remote process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_control_port() -> PortMapping {
    PortMapping {
        port: DEFAULT_CONTROL_PORT,
        internal_port: DEFAULT_CONTROL_PORT,
        protocol: Protocol::Tcp,
        handlers: vec!["http".to_string(), "tls".to_string()],
    }
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_provision_timeout_secs() -> u64 {
    300
}

impl ClusterConfig {
    /// A config with defaults for everything but the provider essentials.
    pub fn new(api_token: &str, region: &str, image: &str) -> Self {
        Self {
            api_token: api_token.to_string(),
            region: region.to_string(),
            image: image.to_string(),
            scheduler_resources: Resources::default(),
            worker_resources: Resources::default(),
            control_port: default_control_port(),
            dashboard_port: Some(PortMapping::tcp(DEFAULT_DASHBOARD_PORT)),
            env: HashMap::new(),
            restart_policy: RestartPolicy::No,
            poll_interval_secs: default_poll_interval_secs(),
            provision_timeout_secs: default_provision_timeout_secs(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClusterConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!("api_token must not be empty");
        }
        if self.region.is_empty() {
            anyhow::bail!("region must not be empty");
        }
        if self.image.is_empty() {
            anyhow::bail!("image must not be empty");
        }
        for (label, res) in [
            ("scheduler", &self.scheduler_resources),
            ("worker", &self.worker_resources),
        ] {
            if res.cpus == 0 {
                anyhow::bail!("{label} resources request zero CPUs");
            }
            if res.memory_mb == 0 {
                anyhow::bail!("{label} resources request zero memory");
            }
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn provision_timeout(&self) -> Duration {
        Duration::from_secs(self.provision_timeout_secs)
    }

    /// All listener mappings to publish on an instance.
    pub fn port_mappings(&self) -> Vec<PortMapping> {
        let mut ports = vec![self.control_port.clone()];
        if let Some(dashboard) = &self.dashboard_port {
            ports.push(dashboard.clone());
        }
        ports
    }
}
