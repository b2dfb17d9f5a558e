//! skylift-cluster — cluster-level orchestration.
//!
//! Coordinates one application lifecycle, one scheduler instance, and N
//! worker instances into the start/scale/stop surface the generic
//! cluster framework consumes.
//!
//! # Architecture
//!
//! ```text
//! ClusterOrchestrator
//!   ├── ApplicationLifecycle (provider namespace, at-most-once create)
//!   ├── scheduler slot (InstanceLifecycle, deterministic name)
//!   └── worker registry (InstanceLifecycle per worker, unique names)
//! ```

pub mod orchestrator;

pub use orchestrator::{ClusterOrchestrator, ClusterState, WorkerSpec};
