//! TCP reachability probe.
//!
//! Some providers report instance readiness directly; others allocate a
//! network identity whose DNS/routing propagation lags instance creation,
//! so the only trustworthy readiness signal is a raw connect to the
//! expected port. This probe is that signal.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Attempt one TCP connection to `address` (`host:port`).
///
/// Returns `true` if the connection was established within `timeout`.
pub async fn tcp_probe(address: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!(%address, error = %e, "reachability probe refused");
            false
        }
        Err(_) => {
            debug!(%address, "reachability probe timed out");
            false
        }
    }
}
