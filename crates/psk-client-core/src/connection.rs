//! Verified QUIC connection wrapper (client-side).
//!
//! After the handshake succeeds, `PinnedConnection` wraps the raw
//! `quinn::Connection` and caches the server's public key as re-read from
//! the certificate it presented.

use std::any::Any;
use std::net::SocketAddr;

use psk_proto::identity::fingerprint;
use psk_proto::tls::cert_inspect::peer_key_from_identity;
use psk_proto::PublicKey;

use crate::error::{ClientError, Result};

/// A dialed QUIC connection whose server proved possession of the pinned key.
#[derive(Debug, Clone)]
pub struct PinnedConnection {
    inner: quinn::Connection,
    peer_key: PublicKey,
}

impl PinnedConnection {
    /// Wrap a raw quinn connection, extracting the peer's public key.
    pub fn from_quinn(conn: quinn::Connection) -> Result<Self> {
        let peer_key = extract_peer_key(conn.peer_identity())?;
        Ok(Self {
            inner: conn,
            peer_key,
        })
    }

    /// The public key the server authenticated with.
    pub fn peer_key(&self) -> &PublicKey {
        &self.peer_key
    }

    pub fn peer_fingerprint(&self) -> String {
        fingerprint(&self.peer_key)
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.inner.remote_address()
    }

    /// Access the underlying quinn connection.
    pub fn inner(&self) -> &quinn::Connection {
        &self.inner
    }
}

fn extract_peer_key(identity: Option<Box<dyn Any>>) -> Result<PublicKey> {
    let identity =
        identity.ok_or_else(|| ClientError::PeerIdentity("no peer identity available".into()))?;
    Ok(peer_key_from_identity(identity)?)
}
