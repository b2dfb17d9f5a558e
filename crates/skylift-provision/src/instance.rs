//! Instance lifecycle — one remote compute unit.
//!
//! Drives create → resolve-address → destroy for a single instance
//! against the `CloudApi`. Each lifecycle is exclusively owned by the
//! task driving it; there is no shared mutable state between instances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use skylift_core::ClusterConfig;
use skylift_core::types::{AppName, InstanceName, PortMapping, Resources, RestartPolicy, Role};
use skylift_provider::{CloudApi, CreateInstanceRequest, ProviderError};

use crate::error::{ProvisionError, ProvisionResult};
use crate::probe::tcp_probe;
use crate::wait::poll_until;

/// How readiness is observed for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessStrategy {
    /// Poll get-by-name until the provider reports the instance up with
    /// both addresses assigned.
    #[default]
    StatusPoll,
    /// Once a network identity exists, attempt raw TCP connections to the
    /// internal address until one succeeds. For providers whose
    /// DNS/network propagation lags instance creation.
    ReachabilityProbe,
}

/// Lifecycle status of an instance, as this process tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// In-memory only; no provider call issued yet.
    Unrequested,
    /// The create call has been issued.
    Requested,
    /// The provider reported the process launched.
    Running,
    /// Addresses resolved; the instance is reachable.
    Ready,
    /// A delete call is in flight or failed.
    Destroying,
    Destroyed,
    /// The create call was rejected.
    Failed,
}

/// Drives one instance from create to destroy.
pub struct InstanceLifecycle {
    api: Arc<dyn CloudApi>,
    app: AppName,
    name: InstanceName,
    role: Role,
    command: Vec<String>,
    region: String,
    resources: Resources,
    env: HashMap<String, String>,
    ports: Vec<PortMapping>,
    restart: RestartPolicy,
    readiness: ReadinessStrategy,
    image: String,
    status: InstanceStatus,
    internal_address: Option<String>,
    external_address: Option<String>,
}

impl InstanceLifecycle {
    /// Build a lifecycle from the cluster config, picking resources by
    /// role. The command must be finalized before [`create`](Self::create)
    /// — for workers that means the scheduler address is already known.
    pub fn new(
        api: Arc<dyn CloudApi>,
        app: AppName,
        name: InstanceName,
        role: Role,
        command: Vec<String>,
        config: &ClusterConfig,
    ) -> Self {
        let resources = match role {
            Role::Scheduler => config.scheduler_resources,
            Role::Worker => config.worker_resources,
        };
        Self {
            api,
            app,
            name,
            role,
            command,
            region: config.region.clone(),
            resources,
            env: config.env.clone(),
            ports: config.port_mappings(),
            restart: config.restart_policy,
            readiness: ReadinessStrategy::default(),
            image: config.image.clone(),
            status: InstanceStatus::Unrequested,
            internal_address: None,
            external_address: None,
        }
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessStrategy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Issue the create call.
    ///
    /// Not retried on failure: a rejected create may leave
    /// partially-initialized provider state, which teardown reaps.
    pub async fn create(&mut self) -> ProvisionResult<()> {
        if self.status != InstanceStatus::Unrequested {
            return Err(ProvisionError::Precondition(format!(
                "instance {} already requested (status {:?})",
                self.name, self.status
            )));
        }
        if self.command.is_empty() {
            return Err(ProvisionError::Precondition(format!(
                "command not finalized for instance {}",
                self.name
            )));
        }

        let request = CreateInstanceRequest {
            name: self.name.clone(),
            image: self.image.clone(),
            command: self.command.clone(),
            region: self.region.clone(),
            resources: self.resources,
            env: self.env.clone(),
            ports: self.ports.clone(),
            restart: self.restart,
        };

        info!(
            instance = %self.name,
            role = self.role.label(),
            region = %self.region,
            cpus = self.resources.cpus,
            memory_mb = self.resources.memory_mb,
            "creating instance"
        );

        // Requested from the moment the call is issued, so teardown can
        // reap the instance even if this task is abandoned mid-call.
        self.status = InstanceStatus::Requested;
        match self.api.create_instance(&self.app, request).await {
            Ok(record) => {
                // Some providers hand out addresses at create time
                // already; keep them, resolution confirms readiness.
                self.internal_address = record.internal_address;
                self.external_address = record.external_address;
                if record.status.is_up() {
                    self.status = InstanceStatus::Running;
                }
                info!(instance = %self.name, "instance create accepted");
                Ok(())
            }
            Err(e) => {
                self.status = InstanceStatus::Failed;
                Err(ProvisionError::provisioning(
                    &format!("{} instance {}", self.role.label(), self.name),
                    e,
                ))
            }
        }
    }

    /// Resolve the instance's addresses, waiting for readiness.
    ///
    /// Polls on a fixed `poll_interval`, bounded by `timeout`. Returns
    /// both addresses or fails; never a partial pair.
    pub async fn resolve_address(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
    ) -> ProvisionResult<(String, String)> {
        match self.status {
            InstanceStatus::Ready => {
                // Already resolved.
                if let (Some(internal), Some(external)) =
                    (&self.internal_address, &self.external_address)
                {
                    return Ok((internal.clone(), external.clone()));
                }
            }
            InstanceStatus::Requested | InstanceStatus::Running => {}
            _ => {
                return Err(ProvisionError::Precondition(format!(
                    "cannot resolve address of instance {} in status {:?}",
                    self.name, self.status
                )));
            }
        }

        let what = format!("{} instance {}", self.role.label(), self.name);
        debug!(instance = %self.name, strategy = ?self.readiness, "resolving address");

        let readiness = self.readiness;
        let api = self.api.clone();
        let app = self.app.clone();
        let name = self.name.clone();
        let outcome = poll_until(poll_interval, timeout, move || {
            let api = api.clone();
            let app = app.clone();
            let name = name.clone();
            async move { poll_addresses(&*api, &app, &name, readiness, poll_interval).await }
        })
        .await;

        match outcome {
            Ok((internal, external)) => {
                self.status = InstanceStatus::Ready;
                self.internal_address = Some(internal.clone());
                self.external_address = Some(external.clone());
                info!(
                    instance = %self.name,
                    internal = %internal,
                    external = %external,
                    "instance ready"
                );
                Ok((internal, external))
            }
            Err(expired) => Err(ProvisionError::timeout(&what, expired.waited)),
        }
    }

    /// Destroy the instance.
    ///
    /// Idempotent: a no-op when never created or already destroyed, and
    /// a provider NotFound counts as success. Other delete failures leave
    /// the status at Destroying and surface a Teardown error the caller
    /// is expected to log, not propagate.
    pub async fn destroy(&mut self, force: bool) -> ProvisionResult<()> {
        match self.status {
            InstanceStatus::Unrequested => {
                debug!(instance = %self.name, "never created, nothing to destroy");
                return Ok(());
            }
            InstanceStatus::Destroyed => {
                debug!(instance = %self.name, "already destroyed");
                return Ok(());
            }
            _ => {}
        }

        self.status = InstanceStatus::Destroying;
        match self.api.delete_instance(&self.app, &self.name, force).await {
            Ok(()) => {
                info!(instance = %self.name, "instance deleted");
                self.status = InstanceStatus::Destroyed;
                Ok(())
            }
            Err(ProviderError::NotFound) => {
                debug!(instance = %self.name, "instance already gone provider-side");
                self.status = InstanceStatus::Destroyed;
                Ok(())
            }
            Err(e) => {
                let err = ProvisionError::teardown(
                    &format!("{} instance {}", self.role.label(), self.name),
                    e,
                );
                warn!(instance = %self.name, error = %err, "instance delete failed");
                Err(err)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Both addresses, once resolved.
    pub fn addresses(&self) -> Option<(String, String)> {
        match (&self.internal_address, &self.external_address) {
            (Some(internal), Some(external)) => Some((internal.clone(), external.clone())),
            _ => None,
        }
    }

    /// Whether a create call was ever issued (and teardown should reap
    /// provider-side state).
    pub fn was_requested(&self) -> bool {
        !matches!(self.status, InstanceStatus::Unrequested)
    }
}

/// One readiness poll attempt; `Some` only with a complete address pair.
async fn poll_addresses(
    api: &dyn CloudApi,
    app: &str,
    name: &str,
    readiness: ReadinessStrategy,
    probe_timeout: Duration,
) -> Option<(String, String)> {
    let record = match api.get_instance(app, name).await {
        Ok(record) => record,
        Err(ProviderError::NotFound) => {
            // Visibility can lag the create call.
            debug!(instance = %name, "instance not visible yet");
            return None;
        }
        Err(e) => {
            debug!(instance = %name, error = %e, "status poll failed");
            return None;
        }
    };

    match readiness {
        ReadinessStrategy::StatusPoll => {
            if !record.status.is_up() {
                return None;
            }
            match (record.internal_address, record.external_address) {
                (Some(internal), Some(external)) => Some((internal, external)),
                _ => None,
            }
        }
        ReadinessStrategy::ReachabilityProbe => {
            let internal = record.internal_address?;
            let external = record.external_address?;
            if tcp_probe(&internal, probe_timeout).await {
                Some((internal, external))
            } else {
                None
            }
        }
    }
}
