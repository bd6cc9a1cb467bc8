use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::SignError;
use crate::{
    definitions::{Response, SignatureInfo, SignatureType},
    name::{Component, Name},
};

/// Identity used when no other identity is requested
pub const DEFAULT_IDENTITY: &str = "/localhost/epac";

const KEY_COMPONENT: &str = "KEY";

/// [DEFAULT_IDENTITY] as a name; it holds no escapes, so splitting on `/` is exact
fn default_identity_name() -> Name {
    Name::from_components(
        DEFAULT_IDENTITY
            .split('/')
            .filter(|part| !part.is_empty())
            .map(Component::from),
    )
}

/// How a response should be signed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SigningInfo {
    /// Sign with the key of the default identity
    #[default]
    Default,
    /// A plain SHA-256 digest, no key involved
    Digest,
    /// Sign with the key of this identity
    Identity(Name),
}

/// Holds the identity keys used to sign responses
pub struct KeyChain {
    identities: HashMap<Name, SigningKey>,
    default_identity: Name,
}

impl Default for KeyChain {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyChain {
    /// A key chain with a freshly generated default identity
    pub fn new() -> Self {
        let default_identity = default_identity_name();
        let mut key_chain = Self {
            identities: HashMap::new(),
            default_identity: default_identity.clone(),
        };
        key_chain.create_identity(default_identity);

        key_chain
    }

    pub fn default_identity(&self) -> &Name {
        &self.default_identity
    }

    /// Create (or replace) the signing key of `identity`
    pub fn create_identity(&mut self, identity: Name) -> VerifyingKey {
        let key = SigningKey::generate(&mut OsRng);
        let verifying_key = key.verifying_key();
        self.identities.insert(identity, key);

        verifying_key
    }

    pub fn has_identity(&self, identity: &Name) -> bool {
        self.identities.contains_key(identity)
    }

    /// Fill in the signature info and value of `response`
    pub fn sign(&self, response: &mut Response, info: &SigningInfo) -> Result<(), SignError> {
        let identity = match info {
            SigningInfo::Digest => {
                response.signature_info = SignatureInfo {
                    signature_type: SignatureType::DigestSha256,
                    key_locator: None,
                };
                response.signature_value = Sha256::digest(response.signed_portion()).to_vec();

                return Ok(());
            }
            SigningInfo::Default => &self.default_identity,
            SigningInfo::Identity(identity) => identity,
        };

        let key = self
            .identities
            .get(identity)
            .ok_or_else(|| SignError::UnknownIdentity(identity.clone()))?;

        response.signature_info = SignatureInfo {
            signature_type: SignatureType::Ed25519,
            key_locator: Some(identity.clone().append(KEY_COMPONENT)),
        };
        response.signature_value = key.sign(&response.signed_portion()).to_bytes().to_vec();

        Ok(())
    }

    /// Check the signature of a response against the keys in this chain
    pub fn verify(&self, response: &Response) -> Result<(), SignError> {
        let invalid = || SignError::InvalidSignature(response.name.clone());

        match response.signature_info.signature_type {
            SignatureType::DigestSha256 => {
                let digest = Sha256::digest(response.signed_portion());
                if digest.as_slice() == response.signature_value.as_slice() {
                    Ok(())
                } else {
                    Err(invalid())
                }
            }
            SignatureType::Ed25519 => {
                let key_name = response
                    .signature_info
                    .key_locator
                    .as_ref()
                    .ok_or(SignError::MissingKeyLocator)?;

                let identity = match key_name.last() {
                    Some(last) if last.as_bytes() == KEY_COMPONENT.as_bytes() => {
                        Name::from_components(key_name.components()[..key_name.len() - 1].to_vec())
                    }
                    _ => key_name.clone(),
                };

                let key = self
                    .identities
                    .get(&identity)
                    .ok_or(SignError::UnknownIdentity(identity))?;

                let signature =
                    Signature::from_slice(&response.signature_value).map_err(|_| invalid())?;

                key.verifying_key()
                    .verify(&response.signed_portion(), &signature)
                    .map_err(|_| invalid())
            }
            other => Err(SignError::UnsupportedSignatureType(other.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> Response {
        let mut response = Response::new("/test/data".parse().unwrap());
        response.content = b"ciphertext".to_vec();
        response
    }

    #[test]
    fn default_identity_signature() {
        let key_chain = KeyChain::new();
        assert_eq!(key_chain.default_identity().to_string(), DEFAULT_IDENTITY);
        assert_eq!(
            key_chain.default_identity(),
            &DEFAULT_IDENTITY.parse::<Name>().unwrap()
        );
        assert!(key_chain.has_identity(&DEFAULT_IDENTITY.parse().unwrap()));

        let mut response = response();
        key_chain.sign(&mut response, &SigningInfo::Default).unwrap();

        assert_eq!(
            response.signature_info.signature_type,
            SignatureType::Ed25519
        );
        assert_eq!(
            response.signature_info.key_locator,
            Some("/localhost/epac/KEY".parse().unwrap())
        );
        assert_eq!(response.signature_value.len(), 64);
        key_chain.verify(&response).unwrap();

        response.content.push(0);
        assert!(matches!(
            key_chain.verify(&response),
            Err(SignError::InvalidSignature(_))
        ));
    }

    #[test]
    fn digest_signature() {
        let key_chain = KeyChain::new();

        let mut response = response();
        key_chain.sign(&mut response, &SigningInfo::Digest).unwrap();

        assert_eq!(
            response.signature_info.signature_type,
            SignatureType::DigestSha256
        );
        assert_eq!(response.signature_info.key_locator, None);
        assert_eq!(response.signature_value.len(), 32);
        key_chain.verify(&response).unwrap();
    }

    #[test]
    fn named_identity() {
        let mut key_chain = KeyChain::new();
        let alice: Name = "/alice".parse().unwrap();

        let mut response = response();
        assert_eq!(
            key_chain.sign(&mut response, &SigningInfo::Identity(alice.clone())),
            Err(SignError::UnknownIdentity(alice.clone()))
        );

        key_chain.create_identity(alice.clone());
        assert!(key_chain.has_identity(&alice));
        key_chain
            .sign(&mut response, &SigningInfo::Identity(alice))
            .unwrap();
        key_chain.verify(&response).unwrap();

        // a different chain does not know alice
        assert!(matches!(
            KeyChain::new().verify(&response),
            Err(SignError::UnknownIdentity(_))
        ));
    }
}
