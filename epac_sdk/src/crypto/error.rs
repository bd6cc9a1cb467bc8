use std::path::PathBuf;

use crate::name::Name;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(rsa::Error),
    #[error("plaintext of {len} bytes exceeds the {max} byte limit of the key")]
    Encoding { len: usize, max: usize },
    #[error("encryption failed: {0}")]
    Encryption(rsa::Error),
    #[error("ciphertext was not produced for this key or is corrupted")]
    Decryption,
    #[error("could not access key file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed key file '{0}': {1}")]
    KeyFormat(PathBuf, String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SignError {
    #[error("no signing key for identity {0}")]
    UnknownIdentity(Name),
    #[error("response carries no key locator")]
    MissingKeyLocator,
    #[error("unsupported signature type {0}")]
    UnsupportedSignatureType(u64),
    #[error("signature of {0} does not verify")]
    InvalidSignature(Name),
}
