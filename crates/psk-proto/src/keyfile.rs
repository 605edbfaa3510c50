//! Key files and key sources.
//!
//! A key file holds exactly one encoded key, optionally followed by
//! whitespace. Processes usually get their own private key and their peer's
//! public key from one of several places (a file, an environment variable, a
//! literal flag value); [`KeySource`] names one such place and the
//! `resolve_*` functions pick the first one that is present.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use p256::PublicKey;
use tracing::warn;

use crate::codec::{decode_private, decode_public, encode_private, encode_public};
use crate::error::{PskError, Result};
use crate::identity::KeyPair;

/// Environment variable holding this process's encoded private key.
pub const PRIVATE_KEY_ENV: &str = "PSK_KEY";

/// Environment variable holding the peer's encoded public key.
pub const PEER_KEY_ENV: &str = "PSK_PEER_KEY";

/// Read a private key file, trimming surrounding whitespace.
pub fn read_private_key_file(path: impl AsRef<Path>) -> Result<KeyPair> {
    decode_private(read_trimmed(path.as_ref())?.as_str())
}

/// Read a public key file, trimming surrounding whitespace.
pub fn read_public_key_file(path: impl AsRef<Path>) -> Result<PublicKey> {
    decode_public(read_trimmed(path.as_ref())?.as_str())
}

/// Write an encoded private key followed by a newline.
///
/// On Unix the file is created with mode `0600`.
pub fn write_private_key_file(path: impl AsRef<Path>, key: &KeyPair) -> Result<()> {
    let path = path.as_ref();
    let encoded = encode_private(key)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| key_file_error(path, e))?;
    writeln!(file, "{encoded}").map_err(|e| key_file_error(path, e))
}

/// Write an encoded public key followed by a newline.
pub fn write_public_key_file(path: impl AsRef<Path>, key: &PublicKey) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, format!("{}\n", encode_public(key))).map_err(|e| key_file_error(path, e))
}

fn read_trimmed(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|e| key_file_error(path, e))?;
    Ok(contents.trim().to_string())
}

fn key_file_error(path: &Path, source: std::io::Error) -> PskError {
    PskError::KeyFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Where an encoded key may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A key file. Always considered present once configured.
    File(PathBuf),
    /// An environment variable. Absent when unset or empty.
    Env(String),
    /// A literal encoded key, e.g. from a command-line flag. Absent when empty.
    Inline(String),
}

impl KeySource {
    /// Environment source for [`PRIVATE_KEY_ENV`].
    pub fn private_key_env() -> Self {
        KeySource::Env(PRIVATE_KEY_ENV.to_string())
    }

    /// Environment source for [`PEER_KEY_ENV`].
    pub fn peer_key_env() -> Self {
        KeySource::Env(PEER_KEY_ENV.to_string())
    }

    /// Returns true if this source currently provides a value.
    pub fn is_present(&self) -> bool {
        match self {
            KeySource::File(_) => true,
            KeySource::Env(var) => std::env::var(var).is_ok_and(|v| !v.trim().is_empty()),
            KeySource::Inline(s) => !s.trim().is_empty(),
        }
    }

    pub fn load_private(&self) -> Result<KeyPair> {
        decode_private(self.text()?.trim())
    }

    pub fn load_public(&self) -> Result<PublicKey> {
        decode_public(self.text()?.trim())
    }

    fn text(&self) -> Result<String> {
        match self {
            KeySource::File(path) => read_trimmed(path),
            KeySource::Env(var) => {
                std::env::var(var).map_err(|_| PskError::MissingKey(self.to_string()))
            }
            KeySource::Inline(s) => Ok(s.clone()),
        }
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::File(path) => write!(f, "file {}", path.display()),
            KeySource::Env(var) => write!(f, "${var}"),
            KeySource::Inline(_) => f.write_str("inline value"),
        }
    }
}

/// Load the private key from the first present source.
///
/// Returns `Ok(None)` if no source is present. Later present sources are
/// ignored with a warning.
pub fn resolve_private_key(sources: &[KeySource]) -> Result<Option<KeyPair>> {
    match first_present(sources) {
        Some(source) => source.load_private().map(Some),
        None => Ok(None),
    }
}

/// Load a public key from the first present source.
///
/// Returns `Ok(None)` if no source is present. Later present sources are
/// ignored with a warning.
pub fn resolve_public_key(sources: &[KeySource]) -> Result<Option<PublicKey>> {
    match first_present(sources) {
        Some(source) => source.load_public().map(Some),
        None => Ok(None),
    }
}

fn first_present(sources: &[KeySource]) -> Option<&KeySource> {
    let mut present = sources.iter().filter(|s| s.is_present());
    let chosen = present.next()?;
    for ignored in present {
        warn!(using = %chosen, %ignored, "multiple key sources configured");
    }
    Some(chosen)
}
