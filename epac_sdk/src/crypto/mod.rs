use rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};
use sha1::Sha1;
use std::fmt;

pub mod error;
mod keychain;
mod keys;

pub use error::{CryptoError, SignError};
pub use keychain::{DEFAULT_IDENTITY, KeyChain, SigningInfo};
pub use keys::{
    PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, load_private_key, load_public_key, save_private_key,
    save_public_key,
};

/// Modulus size of every generated keypair
pub const KEY_BITS: usize = 1024;

/// OAEP overhead: two SHA-1 digests plus two framing bytes
const OAEP_OVERHEAD: usize = 2 * 20 + 2;

fn oaep() -> Oaep {
    Oaep::new::<Sha1>()
}

/// An RSA keypair owned by exactly one role (provider or consumer)
pub struct KeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the operating system's CSPRNG
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(CryptoError::KeyGeneration)?;

        Ok(Self::from_private_key(private))
    }

    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        Self {
            public: RsaPublicKey::from(&private),
            private,
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &(self.public.size() * 8))
            .finish_non_exhaustive()
    }
}

/// Largest plaintext `encrypt` accepts for this key
pub fn max_plaintext_len(public_key: &RsaPublicKey) -> usize {
    public_key.size().saturating_sub(OAEP_OVERHEAD)
}

/// Encrypt `plaintext` for the holder of the matching private key (RSAES-OAEP, SHA-1).
/// Every call uses fresh randomness, so equal plaintexts give different ciphertexts.
pub fn encrypt(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let max = max_plaintext_len(public_key);
    if plaintext.len() > max {
        return Err(CryptoError::Encoding {
            len: plaintext.len(),
            max,
        });
    }

    public_key
        .encrypt(&mut OsRng, oaep(), plaintext)
        .map_err(|err| match err {
            rsa::Error::MessageTooLong => CryptoError::Encoding {
                len: plaintext.len(),
                max,
            },
            other => CryptoError::Encryption(other),
        })
}

/// Decrypt a ciphertext produced by [encrypt] for the matching public key
pub fn decrypt(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    private_key
        .decrypt(oaep(), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}
