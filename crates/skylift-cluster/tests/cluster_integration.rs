//! Cluster integration tests.
//!
//! Exercises the full orchestrator surface against the in-memory
//! `FakeCloud` provider: scheduler bring-up, worker fan-out, failure
//! isolation, cancellation cleanup, and teardown ordering. Timeout
//! scenarios run on tokio's paused clock, so no test sleeps for real.

use std::sync::Arc;

use skylift_cluster::{ClusterOrchestrator, ClusterState, WorkerSpec};
use skylift_core::types::Resources;
use skylift_core::ClusterConfig;
use skylift_provider::{CloudApi, FakeCloud};
use skylift_provision::ProvisionError;

fn test_config() -> ClusterConfig {
    let mut config = ClusterConfig::new("tok-123", "ewr", "ghcr.io/example/compute:latest");
    config.poll_interval_secs = 1;
    config.provision_timeout_secs = 5;
    config
}

fn cluster(cloud: &Arc<FakeCloud>) -> ClusterOrchestrator {
    ClusterOrchestrator::new(cloud.clone() as Arc<dyn CloudApi>, test_config()).unwrap()
}

// ── Scheduler bring-up ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn scheduler_ready_after_two_polls() {
    let cloud = Arc::new(FakeCloud::new().with_ready_after(2));
    let cluster = cluster(&cloud);

    let (internal, external) = cluster.start_scheduler().await.unwrap();

    assert!(internal.starts_with("10.0.0.1"), "internal was {internal}");
    assert!(external.contains("fake-cloud.test"));
    assert_eq!(cluster.state().await, ClusterState::SchedulerReady);
    assert_eq!(
        cluster.scheduler_address().await,
        Some((internal, external))
    );
}

#[tokio::test]
async fn start_creates_app_before_instance() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();

    assert_eq!(cloud.create_app_calls(), 1);
    let requests = cloud.create_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].name.ends_with("-scheduler"));
    assert_eq!(requests[0].region, "ewr");
}

#[tokio::test]
async fn failed_app_create_aborts_startup_cleanly() {
    let cloud = Arc::new(FakeCloud::new());
    cloud.set_fail_create_app(true);
    let cluster = cluster(&cloud);

    let err = cluster.start_scheduler().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Provisioning { .. }));
    assert_eq!(cluster.state().await, ClusterState::Idle);
    assert!(cloud.live_instances().is_empty());
}

#[tokio::test]
async fn failed_scheduler_create_destroys_partial_application() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cloud.set_fail_create_instance(true);
    let err = cluster.start_scheduler().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Provisioning { .. }));
    assert_eq!(cluster.state().await, ClusterState::Idle);

    // The application created before the instance failure was reaped.
    let deletions = cloud.deletions();
    assert!(deletions.iter().any(|d| d.starts_with("app:")));
}

#[tokio::test(start_paused = true)]
async fn scheduler_resolve_timeout_reaps_instance_and_app() {
    let cloud = Arc::new(FakeCloud::new().with_ready_after(u32::MAX));
    let cluster = cluster(&cloud);

    let err = cluster.start_scheduler().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Timeout { .. }));
    assert_eq!(cluster.state().await, ClusterState::Idle);

    let deletions = cloud.deletions();
    assert!(deletions.iter().any(|d| d.starts_with("instance:")));
    assert!(deletions.iter().any(|d| d.starts_with("app:")));
    assert!(cloud.live_instances().is_empty());
}

// ── Workers ────────────────────────────────────────────────────

#[tokio::test]
async fn worker_commands_embed_scheduler_address() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    let (internal, _) = cluster.start_scheduler().await.unwrap();
    for _ in 0..3 {
        cluster.add_worker(WorkerSpec::default()).await.unwrap();
    }

    let requests = cloud.create_requests();
    let worker_requests: Vec<_> = requests
        .iter()
        .filter(|r| r.name.contains("-worker-"))
        .collect();
    assert_eq!(worker_requests.len(), 3);
    for request in worker_requests {
        assert!(
            request.command.contains(&internal),
            "worker command {:?} missing scheduler address {internal}",
            request.command
        );
    }
}

#[tokio::test]
async fn add_worker_before_start_is_a_precondition_error() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    let err = cluster.add_worker(WorkerSpec::default()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Precondition(_)));
    assert_eq!(cloud.call_count(), 0);
}

#[tokio::test]
async fn worker_failure_leaves_cluster_usable() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    let survivor = cluster.add_worker(WorkerSpec::default()).await.unwrap();

    cloud.set_fail_create_instance(true);
    let err = cluster.add_worker(WorkerSpec::default()).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Provisioning { .. }));

    // Scheduler and the existing worker are untouched.
    assert_eq!(cluster.state().await, ClusterState::SchedulerReady);
    assert!(cluster.scheduler_address().await.is_some());
    assert!(cluster.worker_ids().await.contains(&survivor));

    // And the cluster keeps working once the provider recovers.
    cloud.set_fail_create_instance(false);
    cluster.add_worker(WorkerSpec::default()).await.unwrap();
}

#[tokio::test]
async fn workers_can_be_added_concurrently() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = Arc::new(cluster(&cloud));

    cluster.start_scheduler().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cluster = cluster.clone();
        handles.push(tokio::spawn(async move {
            cluster.add_worker(WorkerSpec::default()).await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(cluster.worker_count().await, 4);
}

#[tokio::test]
async fn worker_spec_resources_override_config() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    let resources = Resources {
        cpus: 8,
        memory_mb: 16384,
    };
    cluster
        .add_worker(WorkerSpec {
            resources: Some(resources),
            extra_args: vec!["--nthreads".to_string(), "8".to_string()],
        })
        .await
        .unwrap();

    let request = cloud
        .create_requests()
        .into_iter()
        .find(|r| r.name.contains("-worker-"))
        .unwrap();
    assert_eq!(request.resources, resources);
    assert!(request.command.contains(&"--nthreads".to_string()));
}

#[tokio::test]
async fn scale_converges_worker_count() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();

    cluster.scale(3).await.unwrap();
    assert_eq!(cluster.worker_count().await, 3);

    cluster.scale(1).await.unwrap();
    assert_eq!(cluster.worker_count().await, 1);
    // Two worker instances were deleted provider-side.
    let instance_deletes = cloud
        .deletions()
        .iter()
        .filter(|d| d.starts_with("instance:"))
        .count();
    assert_eq!(instance_deletes, 2);

    cluster.scale(1).await.unwrap();
    assert_eq!(cluster.worker_count().await, 1);
}

#[tokio::test]
async fn remove_worker_deletes_instance() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    let id = cluster.add_worker(WorkerSpec::default()).await.unwrap();

    cluster.remove_worker(&id).await;
    assert!(cluster.worker_ids().await.is_empty());
    assert!(cloud.deletions().contains(&format!("instance:{id}")));
}

// ── Teardown ───────────────────────────────────────────────────

#[tokio::test]
async fn close_deletes_workers_then_scheduler_then_app() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    cluster.add_worker(WorkerSpec::default()).await.unwrap();
    cluster.add_worker(WorkerSpec::default()).await.unwrap();

    cluster.close().await;
    assert_eq!(cluster.state().await, ClusterState::Closed);

    let deletions = cloud.deletions();
    assert_eq!(deletions.len(), 4); // 2 workers + scheduler + app.

    // The application delete comes only after every instance delete.
    assert!(deletions.last().unwrap().starts_with("app:"));
    assert!(deletions[..3].iter().all(|d| d.starts_with("instance:")));
    // Scheduler goes after the workers.
    assert!(deletions[2].contains("-scheduler"));
    assert!(cloud.live_instances().is_empty());
}

#[tokio::test]
async fn second_close_issues_no_calls() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    cluster.add_worker(WorkerSpec::default()).await.unwrap();

    cluster.close().await;
    let calls = cloud.call_count();

    cluster.close().await;
    assert_eq!(cloud.call_count(), calls);
    assert_eq!(cluster.state().await, ClusterState::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_reaps_worker_whose_resolve_never_completed() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = Arc::new(cluster(&cloud));

    cluster.start_scheduler().await.unwrap();

    // Further instances never report ready; the add_worker task will hang
    // in resolve_address until we abandon it.
    cloud.set_ready_after(u32::MAX);
    let pending = {
        let cluster = cluster.clone();
        tokio::spawn(async move { cluster.add_worker(WorkerSpec::default()).await })
    };
    // Let the task reach its create call, then abandon it mid-resolve.
    while cloud.create_requests().len() < 2 {
        tokio::task::yield_now().await;
    }
    pending.abort();
    let _ = pending.await;

    cluster.close().await;

    // The abandoned worker's instance was still deleted.
    let worker_name = cloud
        .create_requests()
        .into_iter()
        .find(|r| r.name.contains("-worker-"))
        .unwrap()
        .name;
    assert!(
        cloud
            .deletions()
            .contains(&format!("instance:{worker_name}")),
        "abandoned worker {worker_name} was not reaped: {:?}",
        cloud.deletions()
    );
    assert!(cloud.live_instances().is_empty());
}

#[tokio::test]
async fn close_covers_worker_with_failed_create() {
    let cloud = Arc::new(FakeCloud::new());
    let cluster = cluster(&cloud);

    cluster.start_scheduler().await.unwrap();
    cloud.set_fail_create_instance(true);
    let _ = cluster.add_worker(WorkerSpec::default()).await;
    cloud.set_fail_create_instance(false);

    cluster.close().await;

    // The failed worker gets a delete attempt too; the provider answers
    // NotFound and teardown proceeds.
    let instance_deletes = cloud
        .deletions()
        .iter()
        .filter(|d| d.starts_with("instance:"))
        .count();
    assert_eq!(instance_deletes, 2); // failed worker + scheduler.
    assert_eq!(cluster.state().await, ClusterState::Closed);
}
