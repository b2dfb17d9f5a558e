//! skylift-provider — the cloud provider boundary.
//!
//! Everything skylift knows about a provider passes through the
//! [`CloudApi`] trait: create/get/delete for the application namespace and
//! for individual compute instances. Provider SDK failures never cross
//! this boundary — implementations map them into [`ProviderError`] so the
//! orchestration crates stay provider-agnostic.
//!
//! [`FakeCloud`] is a scripted in-memory implementation used by the test
//! suites of the downstream crates.

pub mod api;
pub mod error;
pub mod fake;
pub mod records;

pub use api::CloudApi;
pub use error::{ProviderError, ProviderResult};
pub use fake::FakeCloud;
pub use records::{AppPhase, AppRecord, CreateInstanceRequest, InstancePhase, InstanceRecord};
