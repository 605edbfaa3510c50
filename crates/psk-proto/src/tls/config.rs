//! TLS configuration builders for pinned-key server and client channels.
//!
//! Constructs `rustls::ServerConfig` and `rustls::ClientConfig` that carry a
//! freshly forged certificate for the local key and a verifier pinned to the
//! peer key.
//!
//! Both builders enforce:
//! - Ring crypto provider restricted to a curated cipher suite list
//! - A minimum protocol version (TLS 1.2 unless raised)
//! - Conventional chain verification replaced by [`PinnedTrustVerifier`]
//! - Mandatory client certificates on the server side
//!
//! Building never performs network I/O.

use std::sync::Arc;

use p256::PublicKey;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls::server::danger::ClientCertVerifier;
use rustls::{SupportedCipherSuite, SupportedProtocolVersion};
use rustls_pki_types::ServerName;
use tracing::{debug, info};

use crate::error::{PskError, Result};
use crate::identity::{fingerprint, ForgedCertificate, KeyPair, Role};
pub use crate::tls::verifier::ExpiryPolicy;
use crate::tls::verifier::{PinnedClientCertVerifier, PinnedServerCertVerifier, PinnedTrustVerifier};

/// ALPN protocol identifier offered by default.
pub const ALPN_PSK: &[u8] = b"psk";

/// SNI used when the identity is not a valid DNS name. Names are advisory
/// only, so any syntactically valid value will do.
pub const FALLBACK_SERVER_NAME: &str = "psk.invalid";

/// Cipher suites enabled on every channel: AEAD only, ECDHE with ECDSA
/// authentication for TLS 1.2.
pub static CURATED_CIPHER_SUITES: &[SupportedCipherSuite] = &[
    rustls::crypto::ring::cipher_suite::TLS13_AES_256_GCM_SHA384,
    rustls::crypto::ring::cipher_suite::TLS13_AES_128_GCM_SHA256,
    rustls::crypto::ring::cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
    rustls::crypto::ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    rustls::crypto::ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    rustls::crypto::ring::cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
];

static TLS12_AND_UP: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Lowest protocol version a channel will negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinProtocolVersion {
    #[default]
    Tls12,
    Tls13,
}

impl MinProtocolVersion {
    fn versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            MinProtocolVersion::Tls12 => TLS12_AND_UP,
            MinProtocolVersion::Tls13 => TLS13_ONLY,
        }
    }
}

/// Fixed protocol parameters shared by server and client channels.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    pub cipher_suites: Vec<SupportedCipherSuite>,
    pub min_version: MinProtocolVersion,
    pub expiry: ExpiryPolicy,
    pub alpn_protocols: Vec<Vec<u8>>,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            cipher_suites: CURATED_CIPHER_SUITES.to_vec(),
            min_version: MinProtocolVersion::default(),
            expiry: ExpiryPolicy::default(),
            alpn_protocols: vec![ALPN_PSK.to_vec()],
        }
    }
}

impl ChannelParams {
    fn provider(&self) -> Arc<CryptoProvider> {
        Arc::new(CryptoProvider {
            cipher_suites: self.cipher_suites.clone(),
            ..rustls::crypto::ring::default_provider()
        })
    }

    fn verifier(&self, peer_key: &PublicKey) -> PinnedTrustVerifier {
        PinnedTrustVerifier::new(*peer_key).with_expiry_policy(self.expiry)
    }
}

/// Server-side channel configuration: immutable, cheap to clone and safe to
/// share across concurrent handshakes.
#[derive(Debug, Clone)]
pub struct ServerChannel {
    tls: Arc<rustls::ServerConfig>,
    certificate: Arc<ForgedCertificate>,
    peer_key: PublicKey,
}

impl ServerChannel {
    pub fn tls_config(&self) -> Arc<rustls::ServerConfig> {
        Arc::clone(&self.tls)
    }

    pub fn certificate(&self) -> &ForgedCertificate {
        &self.certificate
    }

    pub fn peer_key(&self) -> &PublicKey {
        &self.peer_key
    }
}

/// Client-side channel configuration: immutable, cheap to clone and safe to
/// share across concurrent handshakes.
#[derive(Debug, Clone)]
pub struct ClientChannel {
    tls: Arc<rustls::ClientConfig>,
    certificate: Arc<ForgedCertificate>,
    peer_key: PublicKey,
    server_name: ServerName<'static>,
    sni: String,
}

impl ClientChannel {
    pub fn tls_config(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.tls)
    }

    pub fn certificate(&self) -> &ForgedCertificate {
        &self.certificate
    }

    pub fn peer_key(&self) -> &PublicKey {
        &self.peer_key
    }

    /// Name sent as SNI when connecting. Advisory only.
    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }

    /// [`server_name`](Self::server_name) as text, for transports that
    /// take the name as a string.
    pub fn sni(&self) -> &str {
        &self.sni
    }
}

/// Build the server side of a pinned channel.
///
/// Forges a server-role certificate for `key`, requires a client certificate
/// and accepts only one carrying `peer_key`.
pub fn build_server_config(
    identity: &str,
    key: &KeyPair,
    peer_key: &PublicKey,
    params: &ChannelParams,
) -> Result<ServerChannel> {
    let certificate = ForgedCertificate::forge(key, identity, Role::Server)?;
    let verifier: Arc<dyn ClientCertVerifier> =
        Arc::new(PinnedClientCertVerifier::new(params.verifier(peer_key)));
    let (cert_chain, private_key) = certificate.to_rustls();

    let mut config = rustls::ServerConfig::builder_with_provider(params.provider())
        .with_protocol_versions(params.min_version.versions())
        .map_err(|e| PskError::TlsConfiguration(format!("TLS version config: {e}")))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| PskError::TlsConfiguration(format!("server cert config: {e}")))?;
    config.alpn_protocols = params.alpn_protocols.clone();

    info!(
        identity,
        local = %fingerprint(&key.public_key()),
        peer = %fingerprint(peer_key),
        "built pinned server config"
    );

    Ok(ServerChannel {
        tls: Arc::new(config),
        certificate: Arc::new(certificate),
        peer_key: *peer_key,
    })
}

/// Build the client side of a pinned channel.
///
/// Forges a client-role certificate for `key` and accepts only a server
/// presenting `peer_key`. `identity` is also the SNI value sent to the
/// server when it is a valid DNS name.
pub fn build_client_config(
    identity: &str,
    key: &KeyPair,
    peer_key: &PublicKey,
    params: &ChannelParams,
) -> Result<ClientChannel> {
    let certificate = ForgedCertificate::forge(key, identity, Role::Client)?;
    let verifier: Arc<dyn ServerCertVerifier> =
        Arc::new(PinnedServerCertVerifier::new(params.verifier(peer_key)));
    let (cert_chain, private_key) = certificate.to_rustls();

    let mut config = rustls::ClientConfig::builder_with_provider(params.provider())
        .with_protocol_versions(params.min_version.versions())
        .map_err(|e| PskError::TlsConfiguration(format!("TLS version config: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(cert_chain, private_key)
        .map_err(|e| PskError::TlsConfiguration(format!("client cert config: {e}")))?;
    config.alpn_protocols = params.alpn_protocols.clone();

    let (server_name, sni) = server_name_for(identity)?;

    info!(
        identity,
        local = %fingerprint(&key.public_key()),
        peer = %fingerprint(peer_key),
        "built pinned client config"
    );

    Ok(ClientChannel {
        tls: Arc::new(config),
        certificate: Arc::new(certificate),
        peer_key: *peer_key,
        server_name,
        sni,
    })
}

fn server_name_for(identity: &str) -> Result<(ServerName<'static>, String)> {
    if let Ok(name) = ServerName::try_from(identity.to_string()) {
        return Ok((name, identity.to_string()));
    }
    debug!(identity, "identity is not a DNS name, using fallback SNI");
    let name = ServerName::try_from(FALLBACK_SERVER_NAME)
        .map_err(|e| PskError::TlsConfiguration(format!("fallback server name: {e}")))?;
    Ok((name, FALLBACK_SERVER_NAME.to_string()))
}

/// Everything one side needs to build its channel configuration.
#[derive(Debug, Clone)]
pub struct PskConfig {
    /// Advisory name embedded in the forged certificate.
    pub identity: String,
    pub key: KeyPair,
    pub peer_key: PublicKey,
    pub params: ChannelParams,
}

impl PskConfig {
    pub fn new(identity: impl Into<String>, key: KeyPair, peer_key: PublicKey) -> Self {
        Self {
            identity: identity.into(),
            key,
            peer_key,
            params: ChannelParams::default(),
        }
    }

    pub fn with_params(mut self, params: ChannelParams) -> Self {
        self.params = params;
        self
    }

    pub fn server_config(&self) -> Result<ServerChannel> {
        build_server_config(&self.identity, &self.key, &self.peer_key, &self.params)
    }

    pub fn client_config(&self) -> Result<ClientChannel> {
        build_client_config(&self.identity, &self.key, &self.peer_key, &self.params)
    }
}
