//! Generate and inspect pre-shared P-256 keys.
//!
//! Without flags a fresh private key is printed to stdout. With `--public` a
//! private key is read from stdin and its public key printed instead. With
//! `--out` the keys are written to files rather than stdout.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use psk_proto::codec::{decode_private, encode_private, encode_public};
use psk_proto::identity::fingerprint;
use psk_proto::keyfile::{write_private_key_file, write_public_key_file};
use psk_proto::{KeyPair, PskError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum KeygenError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Key(#[from] PskError),
}

#[derive(Debug, Parser)]
#[command(version, about = "Generate and inspect pre-shared P-256 keys")]
struct Args {
    /// Read a private key via stdin and output the public key.
    #[arg(short = 'p', long, action)]
    public: bool,

    /// Write the private key to PATH and its public key to PATH.pub.
    #[arg(short = 'o', long, value_name = "PATH", conflicts_with = "public")]
    out: Option<PathBuf>,
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    match run(&args, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("psk-keygen: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, mut input: impl Read, mut output: impl Write) -> Result<(), KeygenError> {
    if args.public {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        let key = decode_private(text.trim())?;
        writeln!(output, "{}", encode_public(&key.public_key()))?;
        return Ok(());
    }

    let key = KeyPair::generate();
    info!(fingerprint = %fingerprint(&key.public_key()), "generated key");

    match &args.out {
        Some(path) => write_key_pair(path, &key)?,
        None => writeln!(output, "{}", encode_private(&key)?)?,
    }
    Ok(())
}

fn write_key_pair(path: &Path, key: &KeyPair) -> Result<(), KeygenError> {
    let public_path = public_key_path(path);
    write_private_key_file(path, key)?;
    write_public_key_file(&public_path, &key.public_key())?;
    info!(
        private = %path.display(),
        public = %public_path.display(),
        "wrote key files"
    );
    Ok(())
}

fn public_key_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}
