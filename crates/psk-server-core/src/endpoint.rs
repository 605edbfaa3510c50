//! QUIC server endpoint.
//!
//! `PskServer` wraps a quinn server endpoint, binding to a local address and
//! accepting connections from the one client whose key is pinned in its
//! [`ServerChannel`].

use std::net::SocketAddr;
use std::sync::Arc;

use psk_proto::ServerChannel;
use tracing::{info, warn};

use crate::connection::PinnedConnection;
use crate::error::{Result, ServerError};

/// A QUIC server endpoint that accepts pinned peers.
pub struct PskServer {
    endpoint: quinn::Endpoint,
}

impl PskServer {
    /// Bind a QUIC server to the given address.
    ///
    /// The channel's TLS configuration is shared by every handshake this
    /// endpoint performs.
    pub fn bind(addr: SocketAddr, channel: &ServerChannel) -> Result<Self> {
        let quic_server_config =
            quinn::crypto::rustls::QuicServerConfig::try_from(channel.tls_config())
                .map_err(|e| ServerError::TlsConfig(format!("rustls→quinn: {e}")))?;

        let server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_server_config));

        let endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!(%addr, identity = channel.certificate().identity(), "server endpoint bound");

        Ok(Self { endpoint })
    }

    /// Accept the next incoming connection.
    ///
    /// Returns once the TLS handshake has completed and the client's
    /// certificate matched the pinned key. A client that fails verification
    /// surfaces as [`ServerError::Accept`].
    pub async fn accept(&self) -> Result<PinnedConnection> {
        let incoming = self.endpoint.accept().await.ok_or(ServerError::Closed)?;
        let remote = incoming.remote_address();

        let quinn_conn = incoming.await.inspect_err(|e| {
            warn!(%remote, error = %e, "handshake failed");
        })?;

        let conn = PinnedConnection::from_quinn(quinn_conn)?;

        info!(%remote, peer = %conn.peer_fingerprint(), "accepted connection");

        Ok(conn)
    }

    /// Returns the local address this endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))
    }

    /// Gracefully shut down the endpoint.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"shutdown");
    }

    /// Wait until all connections on this endpoint are cleanly shut down.
    pub async fn wait_idle(&self) {
        self.endpoint.wait_idle().await;
    }
}
