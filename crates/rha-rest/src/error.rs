//! Error taxonomy for the discovery REST client.

use thiserror::Error;

/// Errors surfaced by the discovery sequence.
///
/// Each variant maps to one inline form error code in the configuration
/// flow; none escalate past the wizard boundary.
#[derive(Debug, Error)]
pub enum RestApiError {
    /// The remote rejected the access token. Fatal for the attempt, no
    /// fallback is tried.
    #[error("invalid authentication")]
    InvalidAuth,

    /// The remote was unreachable or a generic endpoint failed at the
    /// transport level.
    #[error("cannot connect: {0}")]
    CannotConnect(String),

    /// A generic endpoint answered with an unexpected status.
    #[error("API problem: {0}")]
    ApiProblem(String),

    /// A response had an unexpected shape.
    #[error("bad response: {0}")]
    BadResponse(String),

    /// The remote runs a version this integration cannot talk to.
    #[error("unsupported remote version: {0}")]
    UnsupportedVersion(String),

    /// A required endpoint does not exist on the remote.
    #[error("endpoint missing on remote instance")]
    EndpointMissing,
}

pub type RestApiResult<T> = Result<T, RestApiError>;
