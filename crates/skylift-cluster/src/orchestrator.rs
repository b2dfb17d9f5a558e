//! Cluster orchestrator — drives the cluster provisioning state machine.
//!
//! The orchestrator owns the application lifecycle, the scheduler slot,
//! and the worker registry. Creation flows top-down (orchestrator →
//! application → instance → provider) and teardown runs in reverse order
//! so the namespace is never deleted while instances still reference it.
//!
//! Instances are registered before their create call is issued: even if
//! the task driving a creation is abandoned, `close` still reaps whatever
//! the provider actually allocated.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use skylift_core::names;
use skylift_core::types::{Resources, Role, WorkerId};
use skylift_core::ClusterConfig;
use skylift_provider::CloudApi;
use skylift_provision::command;
use skylift_provision::{
    ApplicationLifecycle, InstanceLifecycle, ProvisionError, ProvisionResult, ReadinessStrategy,
};

/// Where the cluster is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    /// Nothing provisioned.
    Idle,
    /// Application create in progress.
    ApplicationPending,
    /// Scheduler create/resolve in progress.
    SchedulerPending,
    /// Scheduler address resolved; workers may vary.
    SchedulerReady,
    /// Teardown in progress.
    TearingDown,
    /// Terminal.
    Closed,
}

/// Per-worker options for `add_worker`.
#[derive(Debug, Clone, Default)]
pub struct WorkerSpec {
    /// Override the config's worker resources.
    pub resources: Option<Resources>,
    /// Extra arguments appended to the worker command.
    pub extra_args: Vec<String>,
}

type InstanceHandle = Arc<Mutex<InstanceLifecycle>>;

/// Coordinates application + scheduler + workers for one cluster.
pub struct ClusterOrchestrator {
    api: Arc<dyn CloudApi>,
    config: ClusterConfig,
    readiness: ReadinessStrategy,
    app: ApplicationLifecycle,
    state: RwLock<ClusterState>,
    scheduler: Mutex<Option<InstanceHandle>>,
    /// Internal/external scheduler addresses once resolved. Read-only
    /// input to worker command construction.
    scheduler_address: RwLock<Option<(String, String)>>,
    /// Workers in creation order.
    workers: Mutex<Vec<(WorkerId, InstanceHandle)>>,
}

impl std::fmt::Debug for ClusterOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClusterOrchestrator {
    /// Create an orchestrator over a validated config.
    pub fn new(api: Arc<dyn CloudApi>, config: ClusterConfig) -> ProvisionResult<Self> {
        config
            .validate()
            .map_err(|e| ProvisionError::Precondition(e.to_string()))?;
        let app = ApplicationLifecycle::new(api.clone(), "skylift");
        Ok(Self {
            api,
            config,
            readiness: ReadinessStrategy::default(),
            app,
            state: RwLock::new(ClusterState::Idle),
            scheduler: Mutex::new(None),
            scheduler_address: RwLock::new(None),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Use a different readiness strategy than status polling.
    pub fn with_readiness(mut self, readiness: ReadinessStrategy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Bring up the application and the scheduler instance.
    ///
    /// On any failure the partially created instance/application is
    /// destroyed best-effort before the error propagates, and the
    /// orchestrator returns to Idle so the caller may retry.
    pub async fn start_scheduler(&self) -> ProvisionResult<(String, String)> {
        {
            let mut state = self.state.write().await;
            if *state != ClusterState::Idle {
                return Err(ProvisionError::Precondition(format!(
                    "start_scheduler is only valid from Idle (state {:?})",
                    *state
                )));
            }
            *state = ClusterState::ApplicationPending;
        }

        match self.bring_up_scheduler().await {
            Ok(addresses) => {
                *self.state.write().await = ClusterState::SchedulerReady;
                Ok(addresses)
            }
            Err(e) => {
                warn!(error = %e, "cluster start failed, cleaning up partial state");
                self.abort_start().await;
                Err(e)
            }
        }
    }

    /// Add one worker. Valid only once the scheduler is ready — the
    /// worker command embeds the scheduler's resolved internal address
    /// and cannot be constructed earlier.
    ///
    /// A failing worker is an isolated failure domain: the error is
    /// returned, the scheduler and other workers are untouched, and the
    /// partial instance stays registered for teardown to reap.
    pub async fn add_worker(&self, spec: WorkerSpec) -> ProvisionResult<WorkerId> {
        {
            let state = self.state.read().await;
            if *state != ClusterState::SchedulerReady {
                return Err(ProvisionError::Precondition(format!(
                    "add_worker requires a ready scheduler (state {:?})",
                    *state
                )));
            }
        }
        let (scheduler_internal, _) =
            self.scheduler_address.read().await.clone().ok_or_else(|| {
                ProvisionError::Precondition("scheduler address not resolved".to_string())
            })?;
        let app_name = self.app.name().await.ok_or_else(|| {
            ProvisionError::Precondition("application not created".to_string())
        })?;

        let name = names::worker_name(&app_name);
        let cmd = command::worker_command(&scheduler_internal, &spec.extra_args);
        let mut lifecycle = InstanceLifecycle::new(
            self.api.clone(),
            app_name,
            name.clone(),
            Role::Worker,
            cmd,
            &self.config,
        )
        .with_readiness(self.readiness);
        if let Some(resources) = spec.resources {
            lifecycle = lifecycle.with_resources(resources);
        }

        let handle = Arc::new(Mutex::new(lifecycle));
        // Registered before the provider call: an abandoned creation is
        // still visible to close().
        self.workers.lock().await.push((name.clone(), handle.clone()));

        let mut instance = handle.lock().await;
        instance.create().await?;
        instance
            .resolve_address(self.config.poll_interval(), self.config.provision_timeout())
            .await?;

        info!(worker = %name, "worker ready");
        Ok(name)
    }

    /// Reconcile the worker count to `target`.
    ///
    /// Scale-up stops at the first failing worker; already-added workers
    /// stay. Scale-down removes the most recently added workers first.
    pub async fn scale(&self, target: usize) -> ProvisionResult<()> {
        {
            let state = self.state.read().await;
            if *state != ClusterState::SchedulerReady {
                return Err(ProvisionError::Precondition(format!(
                    "scale requires a ready scheduler (state {:?})",
                    *state
                )));
            }
        }
        let current = self.workers.lock().await.len();

        if target > current {
            for _ in current..target {
                self.add_worker(WorkerSpec::default()).await?;
            }
            info!(from = current, to = target, "scaled up");
        } else if target < current {
            let removed: Vec<_> = {
                let mut workers = self.workers.lock().await;
                workers.split_off(target)
            };
            for (id, handle) in removed.into_iter().rev() {
                self.destroy_instance(&id, &handle).await;
            }
            info!(from = current, to = target, "scaled down");
        } else {
            debug!(target, "already at target, no scaling needed");
        }
        Ok(())
    }

    /// Destroy one worker, best-effort. Unknown ids are a no-op.
    pub async fn remove_worker(&self, worker_id: &str) {
        let handle = {
            let mut workers = self.workers.lock().await;
            workers
                .iter()
                .position(|(id, _)| id == worker_id)
                .map(|idx| workers.remove(idx).1)
        };
        match handle {
            Some(handle) => self.destroy_instance(worker_id, &handle).await,
            None => warn!(worker = %worker_id, "unknown worker, nothing to remove"),
        }
    }

    /// Tear the cluster down: workers, then the scheduler, then the
    /// application. Every step is best-effort; failures are logged and
    /// never stop the remaining steps. Idempotent — a second call issues
    /// no provider calls.
    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if *state == ClusterState::Closed {
                debug!("cluster already closed");
                return;
            }
            *state = ClusterState::TearingDown;
        }
        info!("closing cluster");

        let workers: Vec<_> = {
            let mut workers = self.workers.lock().await;
            let mut drained: Vec<_> = workers.drain(..).collect();
            drained.reverse();
            drained
        };
        for (id, handle) in workers {
            self.destroy_instance(&id, &handle).await;
        }

        if let Some(handle) = self.scheduler.lock().await.take() {
            let name = handle.lock().await.name().to_string();
            self.destroy_instance(&name, &handle).await;
        }

        self.app.destroy().await;
        *self.scheduler_address.write().await = None;
        *self.state.write().await = ClusterState::Closed;
        info!("cluster closed");
    }

    pub async fn state(&self) -> ClusterState {
        *self.state.read().await
    }

    /// The scheduler's (internal, external) addresses once resolved.
    pub async fn scheduler_address(&self) -> Option<(String, String)> {
        self.scheduler_address.read().await.clone()
    }

    /// Registered worker ids, in creation order.
    pub async fn worker_ids(&self) -> Vec<WorkerId> {
        let workers = self.workers.lock().await;
        workers.iter().map(|(id, _)| id.clone()).collect()
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn bring_up_scheduler(&self) -> ProvisionResult<(String, String)> {
        let app_name = self.app.ensure_created().await?;
        *self.state.write().await = ClusterState::SchedulerPending;

        let name = names::scheduler_name(&app_name);
        let cmd =
            command::scheduler_command(self.config.control_port.internal_port, &[]);
        let lifecycle = InstanceLifecycle::new(
            self.api.clone(),
            app_name,
            name,
            Role::Scheduler,
            cmd,
            &self.config,
        )
        .with_readiness(self.readiness);
        let handle = Arc::new(Mutex::new(lifecycle));
        *self.scheduler.lock().await = Some(handle.clone());

        let mut instance = handle.lock().await;
        instance.create().await?;
        let (internal, external) = instance
            .resolve_address(self.config.poll_interval(), self.config.provision_timeout())
            .await?;
        drop(instance);

        *self.scheduler_address.write().await = Some((internal.clone(), external.clone()));
        info!(internal = %internal, external = %external, "scheduler ready");
        Ok((internal, external))
    }

    /// Undo a failed start: destroy the partial scheduler instance and
    /// the application, then return to Idle.
    async fn abort_start(&self) {
        if let Some(handle) = self.scheduler.lock().await.take() {
            let name = handle.lock().await.name().to_string();
            self.destroy_instance(&name, &handle).await;
        }
        self.app.destroy().await;
        *self.scheduler_address.write().await = None;
        *self.state.write().await = ClusterState::Idle;
    }

    /// Best-effort destroy; teardown failures are logged, never raised.
    async fn destroy_instance(&self, id: &str, handle: &InstanceHandle) {
        let mut instance = handle.lock().await;
        if let Err(e) = instance.destroy(true).await {
            warn!(instance = %id, error = %e, "instance teardown failed");
        }
    }
}
