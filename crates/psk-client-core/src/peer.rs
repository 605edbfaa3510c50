//! Peer addresses of the form `host:port[/public-key]`.
//!
//! The optional suffix is an encoded public key, which lets one argument name
//! both where a peer lives and which key it must present. The base64url
//! alphabet has no `/`, so the first slash always starts the key.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use psk_proto::codec::{decode_public, encode_public};
use psk_proto::PublicKey;
use tracing::debug;

use crate::error::{ClientError, Result};

/// A peer's network location and, optionally, its expected public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    host: String,
    port: u16,
    key: Option<PublicKey>,
}

impl PeerSpec {
    pub fn new(host: impl Into<String>, port: u16, key: Option<PublicKey>) -> Self {
        Self {
            host: host.into(),
            port,
            key,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Key given in the peer string, if any.
    pub fn key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    /// Resolve the host to its first socket address.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let target = format!("{}:{}", self.host, self.port);
        let addr = tokio::net::lookup_host(&target)
            .await
            .map_err(|e| ClientError::Resolve(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| ClientError::Resolve(format!("{target}: no addresses")))?;
        debug!(%target, %addr, "resolved peer");
        Ok(addr)
    }
}

impl FromStr for PeerSpec {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ClientError::InvalidPeer {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (address, key) = match s.split_once('/') {
            Some((address, key)) => (address, Some(key)),
            None => (s, None),
        };

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;

        let key = match key {
            Some(text) if text.is_empty() => return Err(invalid("empty public key")),
            Some(text) => Some(decode_public(text)?),
            None => None,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            key,
        })
    }
}

impl fmt::Display for PeerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(key) = &self.key {
            write!(f, "/{}", encode_public(key))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use psk_proto::KeyPair;

    use super::*;

    #[test]
    fn parses_host_and_port() {
        let peer: PeerSpec = "backend.local:8443".parse().unwrap();
        assert_eq!(peer.host(), "backend.local");
        assert_eq!(peer.port(), 8443);
        assert!(peer.key().is_none());
    }

    #[test]
    fn parses_key_suffix() {
        let pk = KeyPair::generate().public_key();
        let input = format!("10.0.0.7:443/{}", encode_public(&pk));
        let peer: PeerSpec = input.parse().unwrap();
        assert_eq!(peer.host(), "10.0.0.7");
        assert_eq!(peer.key(), Some(&pk));
        assert_eq!(peer.to_string(), input);
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let peer: PeerSpec = "[::1]:9000".parse().unwrap();
        assert_eq!(peer.host(), "[::1]");
        assert_eq!(peer.port(), 9000);
    }

    #[test]
    fn rejects_malformed_peers() {
        for input in ["", "no-port", ":80", "host:", "host:99999", "host:80/"] {
            assert!(
                matches!(input.parse::<PeerSpec>(), Err(ClientError::InvalidPeer { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_key_suffix() {
        let err = "host:80/not-a-key".parse::<PeerSpec>().unwrap_err();
        assert!(matches!(err, ClientError::Key(_)));
    }

    #[tokio::test]
    async fn resolves_loopback() {
        let peer: PeerSpec = "127.0.0.1:4433".parse().unwrap();
        let addr = peer.resolve().await.unwrap();
        assert_eq!(addr, "127.0.0.1:4433".parse::<SocketAddr>().unwrap());
    }
}
