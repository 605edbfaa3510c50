//! Inspect peer X.509 DER certificates.
//!
//! Parses a presented certificate, checks that its key and signature
//! algorithms belong to the elliptic-curve family, and pulls out the
//! embedded P-256 public key for comparison with the pinned key.
//!
//! Reference: `x509-parser` crate (rusticata, MIT/Apache-2.0)

use std::any::Any;

use p256::PublicKey;
use rustls_pki_types::CertificateDer;
use x509_parser::oid_registry::{
    Oid, OID_EC_P256, OID_KEY_TYPE_EC_PUBLIC_KEY, OID_SIG_ECDSA_WITH_SHA256,
    OID_SIG_ECDSA_WITH_SHA384, OID_SIG_ECDSA_WITH_SHA512,
};
use x509_parser::prelude::*;

use crate::error::RejectReason;

/// Parse exactly one DER certificate. Trailing bytes are rejected.
pub fn parse_certificate(cert_der: &[u8]) -> Result<X509Certificate<'_>, RejectReason> {
    let (rest, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| RejectReason::MalformedCertificate(format!("X.509 parse error: {e}")))?;
    if !rest.is_empty() {
        return Err(RejectReason::MalformedCertificate(format!(
            "{} trailing bytes after certificate",
            rest.len()
        )));
    }
    Ok(cert)
}

/// The subject public key must be an elliptic-curve key (id-ecPublicKey).
pub fn check_key_algorithm(cert: &X509Certificate<'_>) -> Result<(), RejectReason> {
    let algorithm = &cert.public_key().algorithm.algorithm;
    if *algorithm != OID_KEY_TYPE_EC_PUBLIC_KEY {
        return Err(RejectReason::UnsupportedKeyAlgorithm(algorithm.to_id_string()));
    }
    Ok(())
}

/// The certificate signature must be ECDSA with SHA-256, SHA-384 or SHA-512.
pub fn check_signature_algorithm(cert: &X509Certificate<'_>) -> Result<(), RejectReason> {
    let algorithm = &cert.signature_algorithm.algorithm;
    let approved: [&Oid<'static>; 3] = [
        &OID_SIG_ECDSA_WITH_SHA256,
        &OID_SIG_ECDSA_WITH_SHA384,
        &OID_SIG_ECDSA_WITH_SHA512,
    ];
    if !approved.iter().any(|oid| *oid == algorithm) {
        return Err(RejectReason::UnsupportedSignatureAlgorithm(
            algorithm.to_id_string(),
        ));
    }
    Ok(())
}

/// The key embedded in an elliptic-curve certificate, split into the parts
/// compared against the pinned key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedKey {
    /// Whether the named curve parameter is P-256.
    pub curve_is_p256: bool,
    /// The embedded point, if it decodes as a valid P-256 point.
    pub point: Option<PublicKey>,
}

impl EmbeddedKey {
    /// Field-for-field comparison with `pinned`. Both comparisons are always
    /// evaluated before combining.
    pub fn matches(&self, pinned: &PublicKey) -> bool {
        let curve_eq = self.curve_is_p256;
        let point_eq = self.point.as_ref() == Some(pinned);
        curve_eq & point_eq
    }
}

/// Pull out the curve identifier and point of an elliptic-curve certificate.
///
/// Call after [`check_key_algorithm`]; a non-EC key simply yields a
/// non-matching [`EmbeddedKey`].
pub fn embedded_key(cert: &X509Certificate<'_>) -> EmbeddedKey {
    let spki = cert.public_key();
    let curve_is_p256 = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.as_oid().ok())
        .is_some_and(|curve| curve == OID_EC_P256);

    // Decoding a point of another curve as P-256 is meaningless, but it is
    // still attempted so both halves of the comparison always run.
    let point = PublicKey::from_sec1_bytes(spki.subject_public_key.as_ref()).ok();

    EmbeddedKey {
        curve_is_p256,
        point,
    }
}

/// Extract the P-256 public key from a DER-encoded certificate.
///
/// Used after a handshake to report which key the peer authenticated with.
pub fn extract_p256_public_key(cert_der: &[u8]) -> Result<PublicKey, RejectReason> {
    let cert = parse_certificate(cert_der)?;
    check_key_algorithm(&cert)?;
    let embedded = embedded_key(&cert);
    match (embedded.curve_is_p256, embedded.point) {
        (true, Some(key)) => Ok(key),
        _ => Err(RejectReason::MalformedCertificate(
            "certificate does not carry a P-256 public key".into(),
        )),
    }
}

/// Extract the peer's P-256 key from the opaque identity a finished session
/// reports, as returned by `quinn::Connection::peer_identity`.
///
/// The identity is expected to be the presented chain, leaf first.
pub fn peer_key_from_identity(identity: Box<dyn Any>) -> Result<PublicKey, RejectReason> {
    let chain = identity
        .downcast::<Vec<CertificateDer<'static>>>()
        .map_err(|_| RejectReason::MalformedCertificate("unexpected peer identity type".into()))?;
    match chain.as_slice() {
        [leaf] => extract_p256_public_key(leaf),
        _ => Err(RejectReason::UnexpectedChainShape {
            presented: chain.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ForgedCertificate, KeyPair, Role};

    /// Reference epoch: 2025-01-01 00:00:00 UTC.
    const JAN_1_2025: i64 = 1735689600;

    fn forge(kp: &KeyPair) -> ForgedCertificate {
        ForgedCertificate::forge_at(kp, "x", Role::Server, JAN_1_2025).expect("forge")
    }

    #[test]
    fn extract_key_matches_original() {
        let kp = KeyPair::generate();
        let cert = forge(&kp);
        let extracted = extract_p256_public_key(cert.der()).expect("key extraction should succeed");
        assert_eq!(extracted, kp.public_key());
    }

    #[test]
    fn forged_certificate_passes_algorithm_checks() {
        let cert = forge(&KeyPair::generate());
        let parsed = parse_certificate(cert.der()).unwrap();
        assert!(check_key_algorithm(&parsed).is_ok());
        assert!(check_signature_algorithm(&parsed).is_ok());
    }

    #[test]
    fn embedded_key_compares_curve_and_point() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let cert = forge(&kp);
        let parsed = parse_certificate(cert.der()).unwrap();
        let embedded = embedded_key(&parsed);

        assert!(embedded.curve_is_p256);
        assert!(embedded.matches(&kp.public_key()));
        assert!(!embedded.matches(&other.public_key()));

        let wrong_curve = EmbeddedKey {
            curve_is_p256: false,
            ..embedded
        };
        assert!(!wrong_curve.matches(&kp.public_key()));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let cert = forge(&KeyPair::generate());
        let mut der = cert.der().to_vec();
        der.push(0);
        assert!(matches!(
            parse_certificate(&der),
            Err(RejectReason::MalformedCertificate(_))
        ));
    }

    #[test]
    fn rejects_garbage_input() {
        let result = extract_p256_public_key(b"not a certificate");
        assert!(matches!(result, Err(RejectReason::MalformedCertificate(_))));
    }

    #[test]
    fn peer_identity_yields_leaf_key() {
        let kp = KeyPair::generate();
        let cert = forge(&kp);
        let identity: Box<dyn Any> = Box::new(vec![CertificateDer::from(cert.der().to_vec())]);
        assert_eq!(peer_key_from_identity(identity).unwrap(), kp.public_key());

        let empty: Box<dyn Any> = Box::new(Vec::<CertificateDer<'static>>::new());
        assert_eq!(
            peer_key_from_identity(empty),
            Err(RejectReason::UnexpectedChainShape { presented: 0 })
        );

        let wrong_type: Box<dyn Any> = Box::new("not a chain");
        assert!(peer_key_from_identity(wrong_type).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(extract_p256_public_key(b"").is_err());
    }
}
