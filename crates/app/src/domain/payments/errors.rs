//! Payment gateway errors.

use thiserror::Error;

/// Errors from the external payment gateway boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport or serialization failure talking to the gateway.
    #[error("gateway http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned a non-2xx response or an unexpected body.
    #[error("unexpected response from gateway: {0}")]
    UnexpectedResponse(String),

    /// The callback signature did not verify against the stored intent.
    #[error("payment signature verification failed")]
    VerificationFailed,
}
