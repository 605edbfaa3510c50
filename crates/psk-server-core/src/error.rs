//! Error types for the server transport.

use psk_proto::RejectReason;
use thiserror::Error;

/// Errors that can occur in the server transport.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("endpoint bind failed: {0}")]
    Bind(String),

    #[error("endpoint closed")]
    Closed,

    #[error("connection accept failed: {0}")]
    Accept(#[from] quinn::ConnectionError),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("failed to extract peer key: {0}")]
    PeerIdentity(String),

    #[error("peer rejected: {0}")]
    Rejected(#[from] RejectReason),
}

pub type Result<T> = std::result::Result<T, ServerError>;
