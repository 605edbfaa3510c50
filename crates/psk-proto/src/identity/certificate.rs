//! Self-signed X.509 certificate forging.
//!
//! A conventional TLS stack wants a certificate even when nobody validates a
//! chain. Each configuration build wraps the long-lived P-256 key in a fresh
//! self-signed certificate, so no certificate state is ever persisted and the
//! certificate's key is always exactly the key the operator manages.
//! Peers verify the embedded key, not the certificate's names or chain.
//!
//! Reference: `rcgen` crate (rustls team, MIT/Apache-2.0)
//! <https://github.com/rustls/rcgen>

use std::fmt;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, KeyPair as RcgenKeyPair, KeyUsagePurpose, SerialNumber,
    PKCS_ECDSA_P256_SHA256,
};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use time::OffsetDateTime;

use crate::error::{PskError, Result};
use crate::identity::keypair::KeyPair;

/// How far in the past the certificate becomes valid, to absorb clock drift.
pub const CLOCK_SKEW_ALLOWANCE_SECS: i64 = 3600;

/// Certificate lifetime measured from the forging time (five 365-day years).
pub const VALIDITY_SECS: i64 = 5 * 365 * 86400;

/// Serial number of every forged certificate. There is no chain and no
/// revocation, so uniqueness is irrelevant.
const SERIAL_NUMBER: u8 = 1;

/// Which side of the handshake a certificate is forged for. Selects the
/// extended key usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => f.write_str("server"),
            Role::Client => f.write_str("client"),
        }
    }
}

/// A self-signed X.509 certificate bound to exactly one [`KeyPair`].
///
/// Minted once per configuration build and held for the lifetime of that
/// configuration. To rotate, build a new configuration.
pub struct ForgedCertificate {
    cert_der: CertificateDer<'static>,
    cert_pem: String,
    key_pkcs8: Vec<u8>,
    identity: String,
    role: Role,
    /// When this certificate becomes valid (seconds since Unix epoch).
    not_before_epoch: i64,
    /// When this certificate expires (seconds since Unix epoch).
    not_after_epoch: i64,
}

impl ForgedCertificate {
    /// Forge a certificate for `key` valid from one hour ago until five years
    /// from now.
    pub fn forge(key: &KeyPair, identity: &str, role: Role) -> Result<Self> {
        Self::forge_at(key, identity, role, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Forge a certificate using `now_epoch_secs` (seconds since Unix epoch)
    /// as the current time.
    ///
    /// `identity` becomes the issuer and subject common name. It is debugging
    /// metadata only and plays no part in verification.
    pub fn forge_at(
        key: &KeyPair,
        identity: &str,
        role: Role,
        now_epoch_secs: i64,
    ) -> Result<Self> {
        // Export the long-lived key as PKCS#8 DER for rcgen.
        let key_pkcs8 = key
            .to_pkcs8_der()
            .map_err(|e| PskError::CertForge(e.to_string()))?;
        let pkcs8_typed = PrivatePkcs8KeyDer::from(key_pkcs8.as_slice());
        let rcgen_keypair =
            RcgenKeyPair::from_pkcs8_der_and_sign_algo(&pkcs8_typed, &PKCS_ECDSA_P256_SHA256)
                .map_err(|e| PskError::CertForge(e.to_string()))?;

        let not_before_epoch = now_epoch_secs - CLOCK_SKEW_ALLOWANCE_SECS;
        let not_after_epoch = now_epoch_secs + VALIDITY_SECS;

        let not_before = OffsetDateTime::from_unix_timestamp(not_before_epoch)
            .map_err(|e| PskError::CertForge(format!("invalid not_before: {e}")))?;
        let not_after = OffsetDateTime::from_unix_timestamp(not_after_epoch)
            .map_err(|e| PskError::CertForge(format!("invalid not_after: {e}")))?;

        // Self-signed, so issuer == subject.
        let mut name = DistinguishedName::new();
        name.push(DnType::CommonName, DnValue::Utf8String(identity.to_string()));

        let mut params = CertificateParams::default();
        params.serial_number = Some(SerialNumber::from_slice(&[SERIAL_NUMBER]));
        params.distinguished_name = name;
        params.not_before = not_before;
        params.not_after = not_after;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
            KeyUsagePurpose::KeyAgreement,
            KeyUsagePurpose::KeyCertSign,
        ];
        params.extended_key_usages = vec![match role {
            Role::Server => ExtendedKeyUsagePurpose::ServerAuth,
            Role::Client => ExtendedKeyUsagePurpose::ClientAuth,
        }];
        // Lets X.509 libraries validate the certificate against itself.
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let cert = params
            .self_signed(&rcgen_keypair)
            .map_err(|e| PskError::CertForge(e.to_string()))?;

        tracing::debug!(
            identity,
            %role,
            not_before = not_before_epoch,
            not_after = not_after_epoch,
            "forged self-signed certificate"
        );

        Ok(Self {
            cert_der: cert.der().clone(),
            cert_pem: cert.pem(),
            key_pkcs8,
            identity: identity.to_string(),
            role,
            not_before_epoch,
            not_after_epoch,
        })
    }

    /// Returns the DER-encoded certificate bytes.
    pub fn der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Returns the PEM-encoded certificate string.
    pub fn pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the start of the validity window as seconds since Unix epoch.
    pub fn not_before_epoch(&self) -> i64 {
        self.not_before_epoch
    }

    /// Returns the expiration time as seconds since Unix epoch.
    pub fn not_after_epoch(&self) -> i64 {
        self.not_after_epoch
    }

    /// Package as rustls credentials: a one-certificate chain and the
    /// matching PKCS#8 private key.
    pub fn to_rustls(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        let chain = vec![self.cert_der.clone()];
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_pkcs8.clone()));
        (chain, key)
    }
}

impl fmt::Debug for ForgedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgedCertificate")
            .field("identity", &self.identity)
            .field("role", &self.role)
            .field("not_before_epoch", &self.not_before_epoch)
            .field("not_after_epoch", &self.not_after_epoch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use x509_parser::prelude::*;

    use super::*;

    /// Reference epoch: 2025-01-01 00:00:00 UTC.
    const JAN_1_2025: i64 = 1735689600;

    fn forge_server() -> (KeyPair, ForgedCertificate) {
        let kp = KeyPair::generate();
        let cert = ForgedCertificate::forge_at(&kp, "host.example", Role::Server, JAN_1_2025)
            .expect("forging should succeed");
        (kp, cert)
    }

    #[test]
    fn forge_produces_nonempty_der_and_pem() {
        let (_kp, cert) = forge_server();
        assert!(!cert.der().is_empty());
        assert!(cert.pem().starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn validity_window_covers_skew_and_five_years() {
        let (_kp, cert) = forge_server();
        assert_eq!(cert.not_before_epoch(), JAN_1_2025 - 3600);
        assert_eq!(cert.not_after_epoch(), JAN_1_2025 + 5 * 365 * 86400);

        let (_, parsed) = X509Certificate::from_der(cert.der()).expect("parse");
        assert_eq!(parsed.validity().not_before.timestamp(), cert.not_before_epoch());
        assert_eq!(parsed.validity().not_after.timestamp(), cert.not_after_epoch());
    }

    #[test]
    fn fields_match_template() {
        let (_kp, cert) = forge_server();
        let (_, parsed) = X509Certificate::from_der(cert.der()).expect("parse");

        assert_eq!(parsed.version(), X509Version::V3);
        assert_eq!(parsed.raw_serial(), &[1u8]);

        let subject_cn = parsed
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok());
        let issuer_cn = parsed
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok());
        assert_eq!(subject_cn, Some("host.example"));
        assert_eq!(issuer_cn, Some("host.example"));

        let constraints = parsed
            .basic_constraints()
            .expect("basic constraints parse")
            .expect("basic constraints present");
        assert!(constraints.value.ca);

        let usage = parsed
            .key_usage()
            .expect("key usage parse")
            .expect("key usage present");
        assert!(usage.value.digital_signature());
        assert!(usage.value.key_encipherment());
        assert!(usage.value.key_agreement());
        assert!(usage.value.key_cert_sign());
    }

    #[test]
    fn role_selects_extended_key_usage() {
        let kp = KeyPair::generate();
        let server = ForgedCertificate::forge_at(&kp, "x", Role::Server, JAN_1_2025).unwrap();
        let client = ForgedCertificate::forge_at(&kp, "x", Role::Client, JAN_1_2025).unwrap();

        let (_, server) = X509Certificate::from_der(server.der()).unwrap();
        let eku = server.extended_key_usage().unwrap().unwrap();
        assert!(eku.value.server_auth);
        assert!(!eku.value.client_auth);

        let (_, client) = X509Certificate::from_der(client.der()).unwrap();
        let eku = client.extended_key_usage().unwrap().unwrap();
        assert!(eku.value.client_auth);
        assert!(!eku.value.server_auth);
    }

    #[test]
    fn certificate_is_self_signed() {
        let (_kp, cert) = forge_server();
        let (_, parsed) = X509Certificate::from_der(cert.der()).unwrap();
        assert!(parsed.verify_signature(None).is_ok());
    }

    #[test]
    fn wall_clock_forge_is_currently_valid() {
        let kp = KeyPair::generate();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let cert = ForgedCertificate::forge(&kp, "host.example", Role::Server).unwrap();
        assert!(cert.not_before_epoch() < now);
        assert!(now < cert.not_after_epoch());
        assert_eq!(
            cert.not_after_epoch() - cert.not_before_epoch(),
            VALIDITY_SECS + CLOCK_SKEW_ALLOWANCE_SECS
        );
    }

    #[test]
    fn rustls_credentials_hold_one_certificate() {
        let (_kp, cert) = forge_server();
        let (chain, key) = cert.to_rustls();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].as_ref(), cert.der());
        assert!(matches!(key, PrivateKeyDer::Pkcs8(_)));
    }
}
