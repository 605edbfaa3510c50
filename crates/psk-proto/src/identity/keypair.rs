//! P-256 keypair generation and management.
//!
//! Reference implementation: `p256` (RustCrypto, MIT/Apache-2.0)
//! <https://github.com/RustCrypto/elliptic-curves>
//!
//! All cryptographic operations are delegated to `p256`. This module is a
//! thin wrapper providing the interface needed by the rest of `psk-proto`.

use std::fmt;

use data_encoding::HEXLOWER;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::EncodePrivateKey;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{PskError, Result};

/// Length of the uncompressed SEC1 point encoding for P-256 (`04 || X || Y`).
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Number of digest bytes shown by [`fingerprint`].
const FINGERPRINT_BYTES: usize = 8;

/// A long-lived P-256 keypair: the only trust anchor a peer has.
///
/// The keypair is supplied by the operator and never serialized except
/// through [`KeyCodec`](crate::codec::KeyCodec). The inner [`SecretKey`] is
/// zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: SecretKey,
}

impl KeyPair {
    /// Generate a new random P-256 keypair using the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Wrap an existing secret key.
    pub fn from_secret_key(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Returns the underlying secret key.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Returns the public half of the keypair.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Returns the SEC1 `ECPrivateKey` DER encoding (RFC 5915).
    pub fn to_sec1_der(&self) -> Result<Vec<u8>> {
        let der = self
            .secret
            .to_sec1_der()
            .map_err(|e| PskError::KeyExport(e.to_string()))?;
        Ok(der.to_vec())
    }

    /// Returns the PKCS#8 DER encoding of the keypair.
    ///
    /// This format is required by [`rcgen`] for certificate generation and by
    /// rustls for the handshake signing key.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = self
            .secret
            .to_pkcs8_der()
            .map_err(|e| PskError::KeyExport(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair(public: {})", fingerprint(&self.public_key()))
    }
}

/// Uncompressed SEC1 encoding of a public key.
pub fn public_key_bytes(key: &PublicKey) -> [u8; UNCOMPRESSED_POINT_LEN] {
    let point = key.to_encoded_point(false);
    let mut out = [0u8; UNCOMPRESSED_POINT_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Short hex fingerprint of a public key for logs: the first 8 bytes of
/// SHA-256 over the uncompressed point.
pub fn fingerprint(key: &PublicKey) -> String {
    let digest = Sha256::digest(public_key_bytes(key));
    HEXLOWER.encode(&digest[..FINGERPRINT_BYTES])
}
