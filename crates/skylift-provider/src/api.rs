//! The `CloudApi` capability.

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::records::{AppRecord, CreateInstanceRequest, InstanceRecord};

/// Authenticated client for one cloud provider.
///
/// Implementations wrap the provider's HTTP/SDK client and translate its
/// failures into [`ProviderError`](crate::ProviderError). All operations
/// are expected to be safe to call concurrently.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Create the application namespace that will own a cluster's instances.
    async fn create_app(&self, name: &str) -> ProviderResult<AppRecord>;

    /// Fetch an application by name. `NotFound` if it does not exist.
    async fn get_app(&self, name: &str) -> ProviderResult<AppRecord>;

    /// Delete an application. Instances should be deleted first.
    async fn delete_app(&self, name: &str) -> ProviderResult<()>;

    /// Create one compute instance inside an application.
    async fn create_instance(
        &self,
        app: &str,
        request: CreateInstanceRequest,
    ) -> ProviderResult<InstanceRecord>;

    /// Fetch an instance by name. `NotFound` if it does not exist.
    async fn get_instance(&self, app: &str, name: &str) -> ProviderResult<InstanceRecord>;

    /// Delete an instance. `force` skips graceful shutdown of the remote
    /// process.
    async fn delete_instance(&self, app: &str, name: &str, force: bool) -> ProviderResult<()>;
}
