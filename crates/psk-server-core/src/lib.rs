//! Server-side transport for pinned-key channels.
//!
//! Accepts QUIC connections (via quinn) whose TLS handshake is governed by a
//! [`psk_proto::ServerChannel`]: the client must present a self-signed
//! certificate carrying the pinned public key.

pub mod connection;
pub mod endpoint;
pub mod error;

pub use connection::PinnedConnection;
pub use endpoint::PskServer;
pub use error::ServerError;
