use rsa::RsaPublicKey;
use std::collections::HashMap;

/// In-memory mapping from external user identifiers to their public keys
#[derive(Clone, Debug, Default)]
pub struct UserKeyRegistry {
    keys: HashMap<String, RsaPublicKey>,
}

impl UserKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key for `user_id`, replacing (and returning) any earlier key
    pub fn register(
        &mut self,
        user_id: impl Into<String>,
        public_key: RsaPublicKey,
    ) -> Option<RsaPublicKey> {
        let user_id = user_id.into();
        tracing::debug!("registered public key for user {user_id}");

        self.keys.insert(user_id, public_key)
    }

    pub fn lookup(&self, user_id: &str) -> Option<&RsaPublicKey> {
        self.keys.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.keys.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
