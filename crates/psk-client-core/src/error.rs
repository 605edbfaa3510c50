//! Error types for the client transport.

use psk_proto::{PskError, RejectReason};
use thiserror::Error;

/// Errors that can occur in the client transport.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("endpoint creation failed: {0}")]
    Endpoint(String),

    #[error("connection failed: {0}")]
    Connection(#[from] quinn::ConnectionError),

    #[error("connect error: {0}")]
    Connect(#[from] quinn::ConnectError),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("failed to extract peer key: {0}")]
    PeerIdentity(String),

    #[error("peer rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("invalid peer {input:?}: {reason}")]
    InvalidPeer { input: String, reason: String },

    #[error("could not resolve {0}")]
    Resolve(String),

    #[error(transparent)]
    Key(#[from] PskError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
