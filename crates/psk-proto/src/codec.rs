//! Text encoding of P-256 key material.
//!
//! Keys travel through files, environment variables and command-line
//! arguments, so they are base64 encoded. `/` is used as a delimiter
//! elsewhere (`host:port/key` peer specs), which is why the URL-safe alphabet
//! is used.
//!
//! - Private keys: SEC1 `ECPrivateKey` DER (RFC 5915), then base64url.
//! - Public keys: uncompressed ANSI X9.62 point (`04 || X || Y`), then
//!   base64url.
//!
//! Decoding never panics on hostile input; every failure is a
//! [`PskError::MalformedKey`].

use data_encoding::{Encoding, BASE64URL};
use p256::{PublicKey, SecretKey};

use crate::error::{KeyKind, PskError, Result};
use crate::identity::keypair::{public_key_bytes, KeyPair, UNCOMPRESSED_POINT_LEN};

/// SEC1 tag for an uncompressed curve point.
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Converts keys to and from their transportable text form.
///
/// The byte-to-text encoding is an explicit value rather than process-wide
/// state. [`KeyCodec::default`] uses padded base64url with canonical
/// trailing bits enforced on decode.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    encoding: Encoding,
}

impl KeyCodec {
    /// Create a codec using a custom byte-to-text encoding.
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encode_private(&self, key: &KeyPair) -> Result<String> {
        let der = key.to_sec1_der()?;
        Ok(self.encoding.encode(&der))
    }

    /// Decode a private key. Fails on bad base64, bad DER, or a key whose
    /// parameters name a curve other than P-256.
    pub fn decode_private(&self, s: &str) -> Result<KeyPair> {
        let der = self
            .encoding
            .decode(s.as_bytes())
            .map_err(|e| PskError::malformed(KeyKind::Private, format!("base64: {e}")))?;
        let secret = SecretKey::from_sec1_der(&der)
            .map_err(|e| PskError::malformed(KeyKind::Private, format!("SEC1 DER: {e}")))?;
        Ok(KeyPair::from_secret_key(secret))
    }

    pub fn encode_public(&self, key: &PublicKey) -> String {
        self.encoding.encode(&public_key_bytes(key))
    }

    /// Decode a public key. Only the uncompressed form is accepted and the
    /// point must lie on P-256.
    pub fn decode_public(&self, s: &str) -> Result<PublicKey> {
        let bytes = self
            .encoding
            .decode(s.as_bytes())
            .map_err(|e| PskError::malformed(KeyKind::Public, format!("base64: {e}")))?;
        if bytes.len() != UNCOMPRESSED_POINT_LEN {
            return Err(PskError::malformed(
                KeyKind::Public,
                format!(
                    "expected {UNCOMPRESSED_POINT_LEN}-byte uncompressed point, got {} bytes",
                    bytes.len()
                ),
            ));
        }
        if bytes[0] != UNCOMPRESSED_TAG {
            return Err(PskError::malformed(
                KeyKind::Public,
                format!("expected uncompressed point tag 0x04, got {:#04x}", bytes[0]),
            ));
        }
        PublicKey::from_sec1_bytes(&bytes)
            .map_err(|_| PskError::malformed(KeyKind::Public, "point is not on the P-256 curve"))
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::with_encoding(BASE64URL)
    }
}

/// Encode a private key with the default codec.
pub fn encode_private(key: &KeyPair) -> Result<String> {
    KeyCodec::default().encode_private(key)
}

/// Decode a private key with the default codec.
pub fn decode_private(s: &str) -> Result<KeyPair> {
    KeyCodec::default().decode_private(s)
}

/// Encode a public key with the default codec.
pub fn encode_public(key: &PublicKey) -> String {
    KeyCodec::default().encode_public(key)
}

/// Decode a public key with the default codec.
pub fn decode_public(s: &str) -> Result<PublicKey> {
    KeyCodec::default().decode_public(s)
}

#[cfg(test)]
mod tests {
    use data_encoding::BASE64URL_NOPAD;

    use super::*;

    /// SEC1 `ECPrivateKey` on secp384r1, generated with
    /// `openssl ecparam -name secp384r1 -genkey -noout -outform DER`.
    const P384_SEC1_DER: &[u8] = &[
        0x30, 0x81, 0xa4, 0x02, 0x01, 0x01, 0x04, 0x30, 0xf9, 0xa3, 0x93, 0x06,
        0xe1, 0x02, 0x76, 0x72, 0x7a, 0x1e, 0xb3, 0xc2, 0xb2, 0x60, 0x9e, 0xc4,
        0xf7, 0x4b, 0x63, 0xa8, 0x91, 0x59, 0x70, 0xc0, 0x8f, 0xce, 0xf1, 0x60,
        0xe8, 0xb5, 0xd3, 0x52, 0xc7, 0xcd, 0xca, 0x8b, 0xc6, 0x8f, 0xae, 0x64,
        0xa7, 0x0f, 0xe7, 0xbd, 0x7a, 0x15, 0xc7, 0x10, 0xa0, 0x07, 0x06, 0x05,
        0x2b, 0x81, 0x04, 0x00, 0x22, 0xa1, 0x64, 0x03, 0x62, 0x00, 0x04, 0xf9,
        0x26, 0x3c, 0xbd, 0x94, 0x5f, 0x5a, 0x80, 0x51, 0x7b, 0xd8, 0x1a, 0x54,
        0x9b, 0x65, 0x83, 0x30, 0xd7, 0x79, 0x07, 0x2f, 0x76, 0x69, 0x94, 0x36,
        0x11, 0x73, 0x44, 0xe0, 0x03, 0x79, 0x83, 0x50, 0x3f, 0x8a, 0xc1, 0x54,
        0x1e, 0x1e, 0x83, 0x2f, 0xee, 0x0e, 0x59, 0x42, 0xbe, 0x91, 0xad, 0x30,
        0xe2, 0x0b, 0x3e, 0x0c, 0xa3, 0x48, 0x9e, 0x2e, 0xc4, 0xdc, 0xc8, 0xbe,
        0x9d, 0x29, 0x88, 0x41, 0x2b, 0x99, 0xa1, 0x80, 0xdf, 0xed, 0x4d, 0x6a,
        0x17, 0xa2, 0x09, 0xd6, 0x27, 0x59, 0x70, 0xba, 0x05, 0x76, 0x04, 0x63,
        0x77, 0xfa, 0x9d, 0xee, 0x4b, 0xf1, 0xd2, 0xca, 0x78, 0xa1, 0xac,
    ];

    fn is_malformed(result: &Result<impl std::fmt::Debug>, expected: KeyKind) -> bool {
        matches!(result, Err(PskError::MalformedKey { kind, .. }) if *kind == expected)
    }

    #[test]
    fn private_roundtrip() {
        for _ in 0..16 {
            let kp = KeyPair::generate();
            let encoded = encode_private(&kp).unwrap();
            assert_eq!(decode_private(&encoded).unwrap(), kp);
        }
    }

    #[test]
    fn public_roundtrip() {
        for _ in 0..16 {
            let pk = KeyPair::generate().public_key();
            let encoded = encode_public(&pk);
            assert_eq!(decode_public(&encoded).unwrap(), pk);
        }
    }

    #[test]
    fn encoding_is_url_safe() {
        for _ in 0..16 {
            let kp = KeyPair::generate();
            let private = encode_private(&kp).unwrap();
            let public = encode_public(&kp.public_key());
            for s in [&private, &public] {
                assert!(!s.contains('/'), "{s}");
                assert!(!s.contains('+'), "{s}");
            }
        }
    }

    #[test]
    fn public_encoding_is_deterministic() {
        let pk = KeyPair::generate().public_key();
        assert_eq!(encode_public(&pk), encode_public(&pk));
    }

    #[test]
    fn private_string_is_not_a_public_key() {
        let kp = KeyPair::generate();
        let encoded = encode_private(&kp).unwrap();
        assert!(is_malformed(&decode_public(&encoded), KeyKind::Public));
    }

    #[test]
    fn public_string_is_not_a_private_key() {
        let kp = KeyPair::generate();
        let encoded = encode_public(&kp.public_key());
        assert!(is_malformed(&decode_private(&encoded), KeyKind::Private));
    }

    #[test]
    fn rejects_private_key_on_other_curve() {
        let encoded = BASE64URL.encode(P384_SEC1_DER);
        let result = decode_private(&encoded);
        assert!(is_malformed(&result, KeyKind::Private), "got {result:?}");
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(is_malformed(&decode_private("not base64!!"), KeyKind::Private));
        assert!(is_malformed(&decode_public("not base64!!"), KeyKind::Public));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(is_malformed(&decode_private(""), KeyKind::Private));
        assert!(is_malformed(&decode_public(""), KeyKind::Public));
    }

    #[test]
    fn rejects_compressed_point() {
        let pk = KeyPair::generate().public_key();
        let mut compressed = public_key_bytes(&pk)[..33].to_vec();
        compressed[0] = 0x02;
        let encoded = BASE64URL.encode(&compressed);
        assert!(is_malformed(&decode_public(&encoded), KeyKind::Public));
    }

    #[test]
    fn rejects_wrong_point_tag() {
        let pk = KeyPair::generate().public_key();
        let mut bytes = public_key_bytes(&pk);
        bytes[0] = 0x05;
        let encoded = BASE64URL.encode(&bytes);
        assert!(is_malformed(&decode_public(&encoded), KeyKind::Public));
    }

    #[test]
    fn rejects_point_off_curve() {
        let mut bytes = [0u8; UNCOMPRESSED_POINT_LEN];
        bytes[0] = UNCOMPRESSED_TAG;
        bytes[1] = 1;
        bytes[33] = 1;
        let encoded = BASE64URL.encode(&bytes);
        assert!(is_malformed(&decode_public(&encoded), KeyKind::Public));
    }

    #[test]
    fn rejects_unpadded_input_with_default_codec() {
        let pk = KeyPair::generate().public_key();
        let unpadded = BASE64URL_NOPAD.encode(&public_key_bytes(&pk));
        assert!(decode_public(&unpadded).is_err());
    }

    #[test]
    fn custom_encoding_is_honoured() {
        let codec = KeyCodec::with_encoding(BASE64URL_NOPAD);
        let kp = KeyPair::generate();
        let encoded = codec.encode_public(&kp.public_key());
        assert!(!encoded.ends_with('='));
        assert_eq!(codec.decode_public(&encoded).unwrap(), kp.public_key());

        let encoded = codec.encode_private(&kp).unwrap();
        assert_eq!(codec.decode_private(&encoded).unwrap(), kp);
    }
}
