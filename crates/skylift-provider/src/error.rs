//! Provider error types.
//!
//! Every provider-specific failure is mapped into one of these variants
//! at the `CloudApi` boundary; nothing above this crate matches on
//! provider SDK error types.

use thiserror::Error;

/// Errors a `CloudApi` implementation can return.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The named application or instance does not exist.
    #[error("not found")]
    NotFound,

    /// The credential was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The account is out of quota for the requested resource.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The provider rejected the request as malformed or unsatisfiable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other provider-side failure (transport, 5xx, ...).
    #[error("provider api error: {0}")]
    Api(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
