//! Pinned peer verification.
//!
//! Trust is established by exact key equality, not by delegation: a peer is
//! accepted only if it presents a single self-signed elliptic-curve
//! certificate whose embedded public key is the pinned key.
//! [`PinnedTrustVerifier`] is the pure predicate; `PinnedServerCertVerifier`
//! (client-side) and `PinnedClientCertVerifier` (server-side) adapt it to the
//! rustls callbacks.
//!
//! Handshake signature verification is delegated to the rustls ring crypto
//! provider. Only certificate validation is customized.
//!
//! Design references:
//! - libp2p-tls: custom `ClientCertVerifier` for P2P self-signed certs
//! - iroh: self-signed certs + custom verifiers over quinn

use std::sync::{Arc, LazyLock};

use p256::PublicKey;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{
    CertificateError, DigitallySignedStruct, Error as TlsError, OtherError, SignatureScheme,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tracing::{debug, warn};

use crate::error::RejectReason;
use crate::identity::fingerprint;
use crate::tls::cert_inspect::{
    check_key_algorithm, check_signature_algorithm, embedded_key, parse_certificate,
};

/// Whether the certificate validity window is checked during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Reject certificates outside `notBefore..=notAfter` at handshake time.
    #[default]
    Enforce,
    /// Accept any validity window; the pinned key alone decides.
    Skip,
}

/// Handshake signature schemes accepted from the peer.
const ACCEPTED_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
];

/// Verifies peer certificate chains against one pinned public key.
///
/// Stateless across attempts and immutable once built, so one instance can
/// be shared by any number of concurrent handshakes.
#[derive(Debug, Clone)]
pub struct PinnedTrustVerifier {
    pinned: PublicKey,
    expiry: ExpiryPolicy,
}

impl PinnedTrustVerifier {
    pub fn new(pinned: PublicKey) -> Self {
        Self {
            pinned,
            expiry: ExpiryPolicy::default(),
        }
    }

    pub fn with_expiry_policy(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    /// Decide whether `chain` (leaf first) authenticates the pinned peer.
    pub fn verify_chain(
        &self,
        chain: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), RejectReason> {
        match chain {
            [only] => self.verify_certificate(only, now),
            _ => Err(RejectReason::UnexpectedChainShape {
                presented: chain.len(),
            }),
        }
    }

    /// Same as [`verify_chain`](Self::verify_chain), for the split shape
    /// rustls hands to verifier callbacks.
    pub fn verify_presented(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), RejectReason> {
        if !intermediates.is_empty() {
            return Err(RejectReason::UnexpectedChainShape {
                presented: 1 + intermediates.len(),
            });
        }
        self.verify_certificate(end_entity, now)
    }

    fn verify_certificate(
        &self,
        cert_der: &CertificateDer<'_>,
        now: UnixTime,
    ) -> Result<(), RejectReason> {
        let cert = parse_certificate(cert_der)?;
        check_key_algorithm(&cert)?;
        check_signature_algorithm(&cert)?;

        if !embedded_key(&cert).matches(&self.pinned) {
            return Err(RejectReason::PeerKeyMismatch);
        }

        cert.verify_signature(None)
            .map_err(|e| RejectReason::SelfSignatureInvalid(e.to_string()))?;

        if self.expiry == ExpiryPolicy::Enforce {
            let not_before = cert.validity().not_before.timestamp();
            let not_after = cert.validity().not_after.timestamp();
            let now = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);
            if now < not_before || now > not_after {
                return Err(RejectReason::CertificateExpired {
                    not_before,
                    not_after,
                    now,
                });
            }
        }

        Ok(())
    }

    /// Run the predicate and convert a rejection into the rustls error that
    /// aborts the handshake.
    fn check(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), TlsError> {
        match self.verify_presented(end_entity, intermediates, now) {
            Ok(()) => {
                debug!(peer = %fingerprint(&self.pinned), "pinned peer accepted");
                Ok(())
            }
            Err(reason) => {
                let presented = presented_fingerprint(end_entity);
                warn!(
                    pinned = %fingerprint(&self.pinned),
                    presented = presented.as_deref().unwrap_or("unavailable"),
                    %reason,
                    "rejecting peer certificate"
                );
                Err(reason_to_tls_error(reason))
            }
        }
    }
}

/// Fingerprint of the P-256 key a rejected certificate carries, if it
/// parses and carries one.
fn presented_fingerprint(cert_der: &[u8]) -> Option<String> {
    let cert = parse_certificate(cert_der).ok()?;
    embedded_key(&cert).point.as_ref().map(fingerprint)
}

/// Wrap a [`RejectReason`] so callers can downcast it out of the rustls error.
pub fn reason_to_tls_error(reason: RejectReason) -> TlsError {
    TlsError::InvalidCertificate(CertificateError::Other(OtherError(Arc::new(reason))))
}

/// Recover the [`RejectReason`] from a rustls error produced by this module.
pub fn reason_from_tls_error(err: &TlsError) -> Option<&RejectReason> {
    match err {
        TlsError::InvalidCertificate(CertificateError::Other(OtherError(inner))) => {
            inner.downcast_ref::<RejectReason>()
        }
        _ => None,
    }
}

/// Get the ring provider's supported signature verification algorithms.
fn ring_signature_algorithms() -> &'static rustls::crypto::WebPkiSupportedAlgorithms {
    static ALGORITHMS: LazyLock<rustls::crypto::WebPkiSupportedAlgorithms> = LazyLock::new(|| {
        rustls::crypto::ring::default_provider().signature_verification_algorithms
    });
    &ALGORITHMS
}

fn accepted_schemes() -> Vec<SignatureScheme> {
    ring_signature_algorithms()
        .supported_schemes()
        .into_iter()
        .filter(|scheme| ACCEPTED_SCHEMES.contains(scheme))
        .collect()
}

// ---------------------------------------------------------------------------
// Client-side: verifies the server's certificate
// ---------------------------------------------------------------------------

/// Server certificate verifier pinned to the expected server key.
///
/// Used by the client during the TLS handshake. The server name is ignored:
/// names are advisory and never a trust signal.
#[derive(Debug)]
pub struct PinnedServerCertVerifier {
    inner: PinnedTrustVerifier,
}

impl PinnedServerCertVerifier {
    pub fn new(inner: PinnedTrustVerifier) -> Self {
        Self { inner }
    }
}

impl ServerCertVerifier for PinnedServerCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        self.inner.check(end_entity, intermediates, now)?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        accepted_schemes()
    }
}

// ---------------------------------------------------------------------------
// Server-side: verifies the client's certificate
// ---------------------------------------------------------------------------

/// Client certificate verifier pinned to the expected client key.
///
/// Used by the server during the mTLS handshake. A client certificate is
/// mandatory.
#[derive(Debug)]
pub struct PinnedClientCertVerifier {
    inner: PinnedTrustVerifier,
}

impl PinnedClientCertVerifier {
    pub fn new(inner: PinnedTrustVerifier) -> Self {
        Self { inner }
    }
}

impl ClientCertVerifier for PinnedClientCertVerifier {
    fn root_hint_subjects(&self) -> &[rustls::DistinguishedName] {
        // No CA roots, self-signed certificates only.
        &[]
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, TlsError> {
        self.inner.check(end_entity, intermediates, now)?;
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        accepted_schemes()
    }
}
