//! Local key material and the certificates forged from it.
//!
//! Every peer owns one long-lived P-256 keypair, exchanged out-of-band as an
//! encoded public key. Certificates are synthesized from that keypair on
//! demand and never stored.

pub mod certificate;
pub mod keypair;

pub use certificate::{ForgedCertificate, Role};
pub use keypair::{fingerprint, public_key_bytes, KeyPair};
