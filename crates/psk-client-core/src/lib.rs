//! Client-side transport for pinned-key channels.
//!
//! Dials QUIC connections (via quinn) whose TLS handshake is governed by a
//! [`psk_proto::ClientChannel`]: the server must present a self-signed
//! certificate carrying the pinned public key.
//!
//! - [`PskClient`]: QUIC dialer
//! - [`PinnedConnection`]: connection with the verified peer key
//! - [`PeerSpec`]: `host:port[/public-key]` peer addresses

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod peer;

pub use connection::PinnedConnection;
pub use endpoint::PskClient;
pub use error::ClientError;
pub use peer::PeerSpec;
