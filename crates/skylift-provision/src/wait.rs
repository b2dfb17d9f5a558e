//! Bounded polling primitive.
//!
//! Every polling loop in this crate goes through [`poll_until`]: a fixed
//! interval between attempts, an overall deadline, and a guaranteed
//! terminal outcome — either the polled value or [`WaitExpired`]. There is
//! no unbounded retry anywhere; instance boot time is the dominant latency
//! here, so a fixed interval beats adaptive backoff.

use std::future::Future;
use std::time::Duration;

/// The overall deadline elapsed before the condition held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitExpired {
    /// How long the caller waited.
    pub waited: Duration,
}

/// Poll `op` every `interval` until it yields `Some`, or fail once
/// `deadline` has elapsed.
///
/// The first attempt runs immediately. The op is free to perform its own
/// I/O; the deadline bounds the whole sequence, not a single attempt.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    deadline: Duration,
    mut op: F,
) -> Result<T, WaitExpired>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempt_loop = async {
        loop {
            if let Some(value) = op().await {
                return value;
            }
            tokio::time::sleep(interval).await;
        }
    };

    tokio::time::timeout(deadline, attempt_loop)
        .await
        .map_err(|_| WaitExpired { waited: deadline })
}
