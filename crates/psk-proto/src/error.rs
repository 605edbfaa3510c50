//! Error types for the PSK trust layer.
//!
//! [`PskError`] covers configuration-time failures (bad key material, key
//! files, certificate forging, rustls builder errors). [`RejectReason`] covers
//! handshake-time outcomes of pinned peer verification; those never escape as
//! panics, they are handed to the transport as "reject this peer".

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which kind of key a codec operation was handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Private => f.write_str("private"),
            KeyKind::Public => f.write_str("public"),
        }
    }
}

/// Errors that can occur within the `psk-proto` crate.
#[derive(Debug, Error)]
pub enum PskError {
    // --- Keys ---
    #[error("malformed {kind} key: {reason}")]
    MalformedKey { kind: KeyKind, reason: String },

    #[error("failed to export key material: {0}")]
    KeyExport(String),

    #[error("key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no key available from {0}")]
    MissingKey(String),

    // --- Certificates ---
    #[error("failed to forge certificate: {0}")]
    CertForge(String),

    // --- TLS ---
    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),
}

impl PskError {
    pub(crate) fn malformed(kind: KeyKind, reason: impl fmt::Display) -> Self {
        PskError::MalformedKey {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`PskError`].
pub type Result<T> = std::result::Result<T, PskError>;

/// Why a presented peer certificate chain was refused.
///
/// Reasons are ordered the same way the verifier checks them: the first
/// failing check determines the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("expected exactly one certificate, peer presented {presented}")]
    UnexpectedChainShape { presented: usize },

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("unsupported public key algorithm {0}")]
    UnsupportedKeyAlgorithm(String),

    #[error("unsupported signature algorithm {0}")]
    UnsupportedSignatureAlgorithm(String),

    #[error("certificate public key does not match the pinned peer key")]
    PeerKeyMismatch,

    #[error("certificate is not validly self-signed: {0}")]
    SelfSignatureInvalid(String),

    #[error("certificate not valid at {now} (valid {not_before}..{not_after})")]
    CertificateExpired {
        not_before: i64,
        not_after: i64,
        now: i64,
    },
}
