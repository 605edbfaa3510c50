//! Verified QUIC connection wrapper (server-side).
//!
//! After the handshake succeeds, `PinnedConnection` wraps the raw
//! `quinn::Connection` and caches the client's public key as re-read from
//! the certificate it presented.

use std::any::Any;
use std::net::SocketAddr;

use psk_proto::identity::fingerprint;
use psk_proto::tls::cert_inspect::peer_key_from_identity;
use psk_proto::PublicKey;

use crate::error::{Result, ServerError};

/// An accepted QUIC connection whose peer proved possession of the pinned key.
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

    /// The public key the peer authenticated with.
    pub fn peer_key(&self) -> &PublicKey {
        &self.peer_key
    }

    /// Short hex fingerprint of [`peer_key`](Self::peer_key), for logs.
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
        identity.ok_or_else(|| ServerError::PeerIdentity("no peer identity available".into()))?;
    Ok(peer_key_from_identity(identity)?)
}

#[cfg(test)]
mod tests {
    use psk_proto::{ForgedCertificate, KeyPair, RejectReason, Role};

    use super::*;

    /// A presented chain holding one forged certificate per key, leaf first.
    fn presented(keys: &[&KeyPair]) -> Box<dyn Any> {
        let chain: Vec<_> = keys
            .iter()
            .flat_map(|key| {
                let cert = ForgedCertificate::forge(key, "client.local", Role::Client).unwrap();
                cert.to_rustls().0
            })
            .collect();
        Box::new(chain)
    }

    #[test]
    fn extracts_key_from_single_certificate() {
        let key = KeyPair::generate();
        assert_eq!(extract_peer_key(Some(presented(&[&key]))).unwrap(), key.public_key());
    }

    #[test]
    fn longer_chain_is_rejected() {
        let key = KeyPair::generate();
        let result = extract_peer_key(Some(presented(&[&key, &key])));
        assert!(
            matches!(
                result,
                Err(ServerError::Rejected(RejectReason::UnexpectedChainShape { presented: 2 }))
            ),
            "got {result:?}"
        );
    }

    #[test]
    fn missing_identity_is_reported() {
        assert!(matches!(extract_peer_key(None), Err(ServerError::PeerIdentity(_))));
    }
}
