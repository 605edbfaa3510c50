//! TLS layer for pinned-key channels.
//!
//! - Certificate inspection (P-256 public key from X.509 DER)
//! - Pinned peer verifiers for rustls
//! - Server and client config builders

pub mod cert_inspect;
pub mod config;
pub mod verifier;
