use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use zeroize::Zeroizing;

use super::{CryptoError, KeyPair};

/// File name of the DER (SubjectPublicKeyInfo) encoded public key
pub const PUBLIC_KEY_FILE: &str = "publicKey.key";
/// File name of the DER (PKCS#8) encoded private key
pub const PRIVATE_KEY_FILE: &str = "privateKey.key";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CryptoError + '_ {
    move |source| CryptoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn format_error(path: &Path) -> impl FnOnce(rsa::pkcs8::Error) -> CryptoError + '_ {
    move |err| CryptoError::KeyFormat(path.to_path_buf(), err.to_string())
}

fn write_key_file(path: &Path, der: &[u8]) -> Result<(), CryptoError> {
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(der).map_err(io_error(path))?;
    file.sync_all().map_err(io_error(path))
}

pub fn save_public_key(path: &Path, key: &RsaPublicKey) -> Result<(), CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|err| CryptoError::KeyFormat(path.to_path_buf(), err.to_string()))?;

    write_key_file(path, der.as_bytes())
}

pub fn save_private_key(path: &Path, key: &RsaPrivateKey) -> Result<(), CryptoError> {
    let der = key.to_pkcs8_der().map_err(format_error(path))?;

    write_key_file(path, der.as_bytes())
}

pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, CryptoError> {
    let der = std::fs::read(path).map_err(io_error(path))?;

    RsaPublicKey::from_public_key_der(&der)
        .map_err(|err| CryptoError::KeyFormat(path.to_path_buf(), err.to_string()))
}

pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, CryptoError> {
    let der = Zeroizing::new(std::fs::read(path).map_err(io_error(path))?);

    RsaPrivateKey::from_pkcs8_der(&der).map_err(format_error(path))
}

impl KeyPair {
    /// Write both halves into `dir` as [PUBLIC_KEY_FILE] and [PRIVATE_KEY_FILE],
    /// returning the paths written
    pub fn save(&self, dir: &Path) -> Result<(PathBuf, PathBuf), CryptoError> {
        let public_path = dir.join(PUBLIC_KEY_FILE);
        let private_path = dir.join(PRIVATE_KEY_FILE);

        save_public_key(&public_path, self.public_key())?;
        save_private_key(&private_path, self.private_key())?;

        Ok((public_path, private_path))
    }

    /// Load a keypair from a PKCS#8 private key file
    pub fn load(private_key_path: &Path) -> Result<Self, CryptoError> {
        load_private_key(private_key_path).map(KeyPair::from_private_key)
    }
}
