//! Application lifecycle — the provider-level namespace owning a cluster.
//!
//! Created lazily on the first scheduler start, destroyed exactly once on
//! cluster close. Creation is at-most-once even under concurrent callers:
//! every caller serializes on the lifecycle's state mutex, so a second
//! caller awaits the outstanding create instead of re-triggering it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use skylift_core::names;
use skylift_core::types::AppName;
use skylift_provider::{CloudApi, ProviderError};

use crate::error::{ProvisionError, ProvisionResult};
use crate::wait::poll_until;

/// Observable status of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Absent,
    Creating,
    Ready,
    Failed,
}

#[derive(Debug)]
enum AppState {
    Absent,
    Creating { name: AppName },
    Ready { name: AppName },
    Failed { name: AppName, reason: String },
}

impl AppState {
    fn status(&self) -> AppStatus {
        match self {
            AppState::Absent => AppStatus::Absent,
            AppState::Creating { .. } => AppStatus::Creating,
            AppState::Ready { .. } => AppStatus::Ready,
            AppState::Failed { .. } => AppStatus::Failed,
        }
    }
}

/// Owns the provider-level application a cluster's instances live in.
pub struct ApplicationLifecycle {
    api: Arc<dyn CloudApi>,
    /// Prefix for generated application names.
    prefix: String,
    state: Mutex<AppState>,
}

impl ApplicationLifecycle {
    pub fn new(api: Arc<dyn CloudApi>, prefix: &str) -> Self {
        Self {
            api,
            prefix: prefix.to_string(),
            state: Mutex::new(AppState::Absent),
        }
    }

    /// Ensure the application exists, creating it on first call.
    ///
    /// Idempotent: once Ready, returns the stored name without a provider
    /// call. A creation failure is sticky — every subsequent call
    /// propagates it rather than retrying, since the provider may hold
    /// partially-initialized state under the attempted name. `destroy`
    /// resets the lifecycle for an explicit retry.
    pub async fn ensure_created(&self) -> ProvisionResult<AppName> {
        let mut state = self.state.lock().await;
        match &*state {
            AppState::Ready { name } => return Ok(name.clone()),
            AppState::Failed { name, reason } => {
                return Err(ProvisionError::Provisioning {
                    what: format!("application {name}"),
                    reason: reason.clone(),
                });
            }
            AppState::Absent | AppState::Creating { .. } => {}
        }

        let name = names::app_name(&self.prefix);
        *state = AppState::Creating { name: name.clone() };
        info!(app = %name, "creating application");

        match self.api.create_app(&name).await {
            Ok(record) => {
                info!(app = %record.name, "application created");
                *state = AppState::Ready {
                    name: record.name.clone(),
                };
                Ok(record.name)
            }
            Err(e) => {
                error!(app = %name, error = %e, "application create failed");
                *state = AppState::Failed {
                    name,
                    reason: e.to_string(),
                };
                Err(ProvisionError::provisioning("application", e))
            }
        }
    }

    /// Suspend until the application is Ready or `timeout` elapses.
    ///
    /// A Failed application fails fast instead of polling out the clock.
    pub async fn wait_until_ready(
        &self,
        poll_interval: std::time::Duration,
        timeout: std::time::Duration,
    ) -> ProvisionResult<()> {
        let outcome = poll_until(poll_interval, timeout, || {
            let state = &self.state;
            async move {
                match state.lock().await.status() {
                    AppStatus::Ready => Some(Ok(())),
                    AppStatus::Failed => Some(Err(ProvisionError::Provisioning {
                        what: "application".to_string(),
                        reason: "creation previously failed".to_string(),
                    })),
                    AppStatus::Absent | AppStatus::Creating => None,
                }
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(expired) => Err(ProvisionError::timeout("application", expired.waited)),
        }
    }

    /// Destroy the application. Idempotent; delete failures are logged
    /// and swallowed so teardown can proceed past them.
    pub async fn destroy(&self) {
        let mut state = self.state.lock().await;
        let name = match std::mem::replace(&mut *state, AppState::Absent) {
            AppState::Absent => {
                debug!("application already absent, nothing to destroy");
                return;
            }
            AppState::Creating { name }
            | AppState::Ready { name }
            | AppState::Failed { name, .. } => name,
        };

        match self.api.delete_app(&name).await {
            Ok(()) => info!(app = %name, "application deleted"),
            Err(ProviderError::NotFound) => {
                debug!(app = %name, "application already gone provider-side");
            }
            Err(e) => {
                let err = ProvisionError::teardown("application", e);
                warn!(app = %name, error = %err, "application delete failed");
            }
        }
    }

    /// The assigned application name, if created.
    pub async fn name(&self) -> Option<AppName> {
        match &*self.state.lock().await {
            AppState::Ready { name } => Some(name.clone()),
            _ => None,
        }
    }

    pub async fn status(&self) -> AppStatus {
        self.state.lock().await.status()
    }
}
