//! QUIC client endpoint.
//!
//! `PskClient` wraps a quinn client endpoint and dials servers whose key is
//! pinned in its [`ClientChannel`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use psk_proto::ClientChannel;
use tracing::{info, warn};

use crate::connection::PinnedConnection;
use crate::error::{ClientError, Result};
use crate::peer::PeerSpec;

/// A QUIC client endpoint that connects to pinned servers.
pub struct PskClient {
    endpoint: quinn::Endpoint,
    channel: ClientChannel,
}

impl PskClient {
    /// Create a new client endpoint bound to an ephemeral IPv4 port.
    pub fn new(channel: &ClientChannel) -> Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)), channel)
    }

    /// Create a new client endpoint bound to `local`.
    pub fn bind(local: SocketAddr, channel: &ClientChannel) -> Result<Self> {
        let quic_client_config =
            quinn::crypto::rustls::QuicClientConfig::try_from(channel.tls_config())
                .map_err(|e| ClientError::TlsConfig(format!("rustls→quinn: {e}")))?;

        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let mut endpoint =
            quinn::Endpoint::client(local).map_err(|e| ClientError::Endpoint(e.to_string()))?;
        endpoint.set_default_client_config(client_config);

        Ok(Self {
            endpoint,
            channel: channel.clone(),
        })
    }

    /// Connect to a server at the given address.
    ///
    /// Returns once the TLS handshake has completed and the server's
    /// certificate matched the pinned key.
    pub async fn connect(&self, server_addr: SocketAddr) -> Result<PinnedConnection> {
        let connecting = self.endpoint.connect(server_addr, self.channel.sni())?;

        let quinn_conn = connecting.await.inspect_err(|e| {
            warn!(%server_addr, error = %e, "handshake failed");
        })?;

        let conn = PinnedConnection::from_quinn(quinn_conn)?;

        info!(%server_addr, peer = %conn.peer_fingerprint(), "connected to server");

        Ok(conn)
    }

    /// Resolve `peer` and connect to its first address.
    ///
    /// A key carried by `peer` must equal the pinned key of this client's
    /// channel; per-peer keys need a dedicated channel.
    pub async fn connect_peer(&self, peer: &PeerSpec) -> Result<PinnedConnection> {
        if let Some(key) = peer.key() {
            if key != self.channel.peer_key() {
                return Err(ClientError::InvalidPeer {
                    input: peer.to_string(),
                    reason: "peer key differs from the channel's pinned key".into(),
                });
            }
        }
        let addr = peer.resolve().await?;
        self.connect(addr).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.endpoint
            .local_addr()
            .map_err(|e| ClientError::Endpoint(e.to_string()))
    }

    /// Gracefully shut down the endpoint.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }
}
