//! # Key Providers
//!
//! A [`KeyProvider`] supplies the active signing key and resolves historical
//! key ids during verification. Signing always uses the key returned by
//! [`KeyProvider::current_key`]; verification always uses the key named by
//! the event, so rotating the active key never breaks old signatures.
//!
//! [`Keyring`] is the in-process implementation: a map of key ids to
//! secrets behind a `parking_lot::RwLock`, plus the id of the active key.
//! Retired keys stay resolvable until explicitly revoked.

use std::collections::BTreeMap;
use std::sync::Arc;

use aigov_core::{CryptoError, KeyId};
use parking_lot::RwLock;

use crate::signing::SigningSecret;

/// Source of signing secrets.
pub trait KeyProvider: Send + Sync {
    /// The key new events are signed with.
    fn current_key(&self) -> Result<(KeyId, Arc<SigningSecret>), CryptoError>;

    /// The key registered under `key_id`, active or retired.
    ///
    /// An unknown id is an error; callers must treat it as a failed
    /// verification, never as a pass.
    fn key_for(&self, key_id: &KeyId) -> Result<Arc<SigningSecret>, CryptoError>;
}

#[derive(Debug)]
struct KeyringState {
    active: KeyId,
    keys: BTreeMap<KeyId, Arc<SigningSecret>>,
}

/// In-memory rotating key provider.
#[derive(Debug)]
pub struct Keyring {
    state: RwLock<KeyringState>,
}

impl Keyring {
    /// A keyring whose only (and active) key is `secret` under `key_id`.
    pub fn new(key_id: KeyId, secret: SigningSecret) -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(key_id.clone(), Arc::new(secret));
        Self {
            state: RwLock::new(KeyringState {
                active: key_id,
                keys,
            }),
        }
    }

    /// A keyring with a freshly generated active key.
    pub fn generate(key_id: KeyId) -> Self {
        Self::new(key_id, SigningSecret::generate())
    }

    /// Make `secret` the active key under a new id. The previous key stays
    /// available for verification.
    ///
    /// Reusing an existing id is rejected: a key id must always resolve to
    /// the secret it was first registered with.
    pub fn rotate(&self, key_id: KeyId, secret: SigningSecret) -> Result<(), CryptoError> {
        let mut state = self.state.write();
        if state.keys.contains_key(&key_id) {
            return Err(CryptoError::InvalidKey(format!(
                "key id {key_id} is already registered"
            )));
        }
        let previous = std::mem::replace(&mut state.active, key_id.clone());
        state.keys.insert(key_id.clone(), Arc::new(secret));
        tracing::info!(previous = %previous, active = %key_id, "signing key rotated");
        Ok(())
    }

    /// Remove a retired key. Events signed under it will no longer verify.
    ///
    /// The active key cannot be revoked; rotate first.
    pub fn revoke(&self, key_id: &KeyId) -> Result<(), CryptoError> {
        let mut state = self.state.write();
        if state.active == *key_id {
            return Err(CryptoError::InvalidKey(format!(
                "cannot revoke active key {key_id}"
            )));
        }
        if state.keys.remove(key_id).is_none() {
            return Err(CryptoError::UnknownKey(key_id.to_string()));
        }
        tracing::warn!(key = %key_id, "signing key revoked");
        Ok(())
    }

    /// Id of the active key.
    pub fn active_key_id(&self) -> KeyId {
        self.state.read().active.clone()
    }

    /// All registered key ids, in order.
    pub fn key_ids(&self) -> Vec<KeyId> {
        self.state.read().keys.keys().cloned().collect()
    }
}

impl KeyProvider for Keyring {
    fn current_key(&self) -> Result<(KeyId, Arc<SigningSecret>), CryptoError> {
        let state = self.state.read();
        let secret = state
            .keys
            .get(&state.active)
            .cloned()
            .ok_or(CryptoError::NoActiveKey)?;
        Ok((state.active.clone(), secret))
    }

    fn key_for(&self, key_id: &KeyId) -> Result<Arc<SigningSecret>, CryptoError> {
        self.state
            .read()
            .keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownKey(key_id.to_string()))
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn current_key(&self) -> Result<(KeyId, Arc<SigningSecret>), CryptoError> {
        (**self).current_key()
    }

    fn key_for(&self, key_id: &KeyId) -> Result<Arc<SigningSecret>, CryptoError> {
        (**self).key_for(key_id)
    }
}
