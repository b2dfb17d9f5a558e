//! Provisioning error taxonomy.

use std::time::Duration;

use thiserror::Error;

use skylift_provider::ProviderError;

/// Errors that can occur while provisioning or tearing down a cluster.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The provider rejected a create call. Fatal for the affected
    /// application/instance; never retried automatically.
    #[error("provisioning {what} failed: {reason}")]
    Provisioning { what: String, reason: String },

    /// Readiness was not observed within the allotted window.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// An operation was invoked out of order. Always a usage error.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A delete call failed. Logged and swallowed by teardown paths,
    /// never allowed to stop subsequent teardown steps.
    #[error("teardown of {what} failed: {reason}")]
    Teardown { what: String, reason: String },
}

impl ProvisionError {
    /// Map a provider failure on the creation path.
    pub fn provisioning(what: &str, source: ProviderError) -> Self {
        ProvisionError::Provisioning {
            what: what.to_string(),
            reason: source.to_string(),
        }
    }

    /// Map a provider failure on the teardown path.
    pub fn teardown(what: &str, source: ProviderError) -> Self {
        ProvisionError::Teardown {
            what: what.to_string(),
            reason: source.to_string(),
        }
    }

    pub fn timeout(what: &str, waited: Duration) -> Self {
        ProvisionError::Timeout {
            what: what.to_string(),
            waited,
        }
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
