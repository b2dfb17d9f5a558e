//! Scripted in-memory provider.
//!
//! `FakeCloud` implements [`CloudApi`] entirely in memory so lifecycle and
//! orchestrator tests can script provider behavior: how many readiness
//! polls an instance needs before it reports ready, injected create
//! failures, and withheld addresses. Every call is counted and every
//! delete is recorded in issue order.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::api::CloudApi;
use crate::error::{ProviderError, ProviderResult};
use crate::records::{AppPhase, AppRecord, CreateInstanceRequest, InstancePhase, InstanceRecord};

#[derive(Debug)]
struct FakeInstance {
    internal_address: String,
    external_address: String,
    /// get_instance calls left before the instance reports ready.
    polls_left: u32,
}

#[derive(Debug, Default)]
struct Inner {
    apps: HashMap<String, AppRecord>,
    /// Keyed by `app/name`.
    instances: HashMap<String, FakeInstance>,
    /// Polls a freshly created instance needs before reporting ready.
    ready_after: u32,
    /// Withhold the external address even when ready.
    omit_external: bool,
    fail_create_app: bool,
    fail_create_instance: bool,
    create_app_calls: usize,
    /// Internal addresses to hand out before falling back to 10.0.0.N.
    address_overrides: VecDeque<String>,
    next_host: u32,
    /// Every delete call, in issue order: `instance:<name>` / `app:<name>`.
    deletions: Vec<String>,
    /// Every accepted create_instance request, in issue order.
    requests: Vec<CreateInstanceRequest>,
}

pub struct FakeCloud {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Instances report not-ready for the first `polls` get_instance calls.
    pub fn with_ready_after(self, polls: u32) -> Self {
        self.inner.lock().unwrap().ready_after = polls;
        self
    }

    /// Never populate the external address, even once ready.
    pub fn with_partial_addresses(self) -> Self {
        self.inner.lock().unwrap().omit_external = true;
        self
    }

    /// Queue an internal address to assign to the next created instance.
    pub fn with_internal_address(self, address: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .address_overrides
            .push_back(address.to_string());
        self
    }

    pub fn set_fail_create_app(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create_app = fail;
    }

    pub fn set_fail_create_instance(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create_instance = fail;
    }

    /// Change how many polls newly created instances need before ready.
    pub fn set_ready_after(&self, polls: u32) {
        self.inner.lock().unwrap().ready_after = polls;
    }

    /// Total calls across every `CloudApi` operation.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn create_app_calls(&self) -> usize {
        self.inner.lock().unwrap().create_app_calls
    }

    /// Delete calls in issue order (`instance:<name>` / `app:<name>`).
    pub fn deletions(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletions.clone()
    }

    /// Accepted create_instance requests, in issue order.
    pub fn create_requests(&self) -> Vec<CreateInstanceRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Names of instances currently alive provider-side.
    pub fn live_instances(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<String> = inner
            .instances
            .keys()
            .map(|k| k.split_once('/').map(|(_, n)| n.to_string()).unwrap_or_default())
            .collect();
        names.sort();
        names
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn create_app(&self, name: &str) -> ProviderResult<AppRecord> {
        self.count();
        let mut inner = self.inner.lock().unwrap();
        inner.create_app_calls += 1;
        if inner.fail_create_app {
            return Err(ProviderError::QuotaExceeded(
                "fake: application quota reached".to_string(),
            ));
        }
        let record = AppRecord {
            name: name.to_string(),
            status: AppPhase::Ready,
        };
        inner.apps.insert(name.to_string(), record.clone());
        Ok(record)
    }

    async fn get_app(&self, name: &str) -> ProviderResult<AppRecord> {
        self.count();
        let inner = self.inner.lock().unwrap();
        inner.apps.get(name).cloned().ok_or(ProviderError::NotFound)
    }

    async fn delete_app(&self, name: &str) -> ProviderResult<()> {
        self.count();
        let mut inner = self.inner.lock().unwrap();
        inner.deletions.push(format!("app:{name}"));
        if inner.apps.remove(name).is_none() {
            return Err(ProviderError::NotFound);
        }
        Ok(())
    }

    async fn create_instance(
        &self,
        app: &str,
        request: CreateInstanceRequest,
    ) -> ProviderResult<InstanceRecord> {
        self.count();
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_create_instance {
            return Err(ProviderError::InvalidRequest(
                "fake: instance create rejected".to_string(),
            ));
        }
        if !inner.apps.contains_key(app) {
            return Err(ProviderError::NotFound);
        }
        let internal_address = match inner.address_overrides.pop_front() {
            Some(address) => address,
            None => {
                inner.next_host += 1;
                format!("10.0.0.{}:{}", inner.next_host, control_port(&request))
            }
        };
        let external_address = format!("{}.{app}.fake-cloud.test:443", request.name);
        let polls_left = inner.ready_after;
        inner.instances.insert(
            format!("{app}/{}", request.name),
            FakeInstance {
                internal_address,
                external_address,
                polls_left,
            },
        );
        let name = request.name.clone();
        inner.requests.push(request);
        Ok(InstanceRecord {
            name,
            status: InstancePhase::Pending,
            internal_address: None,
            external_address: None,
        })
    }

    async fn get_instance(&self, app: &str, name: &str) -> ProviderResult<InstanceRecord> {
        self.count();
        let mut inner = self.inner.lock().unwrap();
        let omit_external = inner.omit_external;
        let instance = inner
            .instances
            .get_mut(&format!("{app}/{name}"))
            .ok_or(ProviderError::NotFound)?;
        if instance.polls_left > 0 {
            instance.polls_left -= 1;
            return Ok(InstanceRecord {
                name: name.to_string(),
                status: InstancePhase::Starting,
                internal_address: None,
                external_address: None,
            });
        }
        Ok(InstanceRecord {
            name: name.to_string(),
            status: InstancePhase::Ready,
            internal_address: Some(instance.internal_address.clone()),
            external_address: if omit_external {
                None
            } else {
                Some(instance.external_address.clone())
            },
        })
    }

    async fn delete_instance(&self, app: &str, name: &str, _force: bool) -> ProviderResult<()> {
        self.count();
        let mut inner = self.inner.lock().unwrap();
        inner.deletions.push(format!("instance:{name}"));
        if inner.instances.remove(&format!("{app}/{name}")).is_none() {
            return Err(ProviderError::NotFound);
        }
        Ok(())
    }
}

/// External port of the first published mapping, for address rendering.
fn control_port(request: &CreateInstanceRequest) -> u16 {
    request.ports.first().map(|p| p.internal_port).unwrap_or(8786)
}
