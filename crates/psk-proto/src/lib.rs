//! Pre-shared key trust layer.
//!
//! Mutually authenticated TLS between two peers that know each other's
//! long-lived P-256 public key, without a certificate authority:
//!
//! - Key text codec (SEC1 DER / uncompressed points, base64url)
//! - Self-signed certificate forging from a private key
//! - Pinned peer verification: the peer's self-signed certificate must embed
//!   exactly the expected public key
//! - rustls server and client configuration builders
//! - Key files and key source resolution

pub mod codec;
pub mod error;
pub mod identity;
pub mod keyfile;
pub mod tls;

pub use codec::KeyCodec;
pub use error::{KeyKind, PskError, RejectReason, Result};
pub use identity::{ForgedCertificate, KeyPair, Role};
pub use p256::PublicKey;
pub use tls::cert_inspect::extract_p256_public_key;
pub use tls::config::{
    build_client_config, build_server_config, ChannelParams, ClientChannel, ExpiryPolicy,
    MinProtocolVersion, PskConfig, ServerChannel,
};
pub use tls::verifier::PinnedTrustVerifier;
