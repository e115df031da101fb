//! Storage capability and the record shapes kept in it.
//!
//! The protocol never talks to a concrete backend. Everything it persists
//! goes through [`KeyValueStore`], a plain string-keyed get/set with no
//! transactional guarantees. Callers serialize concurrent blind requests
//! to the same target themselves.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

pub const DEFAULT_PRIVATE_KEY_PREFIX: &str = "_privateKey";
pub const DEFAULT_REQUEST_TOKEN_PREFIX: &str = "_requestToken";

/// A string-keyed byte store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-memory store, mostly for tests and short lived sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Key prefixes used when building storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNamespace {
    pub private_key_prefix: String,
    pub request_token_prefix: String,
}

impl Default for StoreNamespace {
    fn default() -> Self {
        Self {
            private_key_prefix: DEFAULT_PRIVATE_KEY_PREFIX.to_string(),
            request_token_prefix: DEFAULT_REQUEST_TOKEN_PREFIX.to_string(),
        }
    }
}

impl StoreNamespace {
    /// `"<prefix>_<userId>"`
    pub fn private_key_key(&self, user_id: &str) -> String {
        format!("{}_{}", self.private_key_prefix, user_id)
    }

    /// `"<prefix>_<subscriberId>_<targetId>"`
    pub fn subscription_key(&self, subscriber_id: &str, target_id: &str) -> String {
        format!(
            "{}_{}_{}",
            self.request_token_prefix, subscriber_id, target_id
        )
    }
}

/// What a subscriber keeps per (subscriber, target) pair: the blinding
/// factor of the request in flight and every sigma obtained so far.
///
/// Sigmas are append-only. Older records carried a single `sigma`
/// field; it is folded into `sigmas` when the record is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default, alias = "ht", skip_serializing_if = "Option::is_none")]
    pub hashtag: Option<String>,

    /// Blinding factor as lowercase hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,

    #[serde(default)]
    sigmas: Vec<String>,

    #[serde(default, rename = "sigma", skip_serializing)]
    legacy_sigma: Option<String>,
}

impl SubscriptionRecord {
    pub fn sigmas(&self) -> &[String] {
        &self.sigmas
    }

    pub fn push_sigma(&mut self, sigma_hex: String) {
        self.sigmas.push(sigma_hex);
    }

    fn upgrade(mut self) -> Self {
        if let Some(sigma) = self.legacy_sigma.take() {
            if !self.sigmas.contains(&sigma) {
                self.sigmas.insert(0, sigma);
            }
        }
        self
    }
}

pub(crate) fn load_subscription<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<SubscriptionRecord>> {
    let bytes = match store.get(key)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    let record: SubscriptionRecord = serde_json::from_slice(&bytes).map_err(|e| {
        warn!(key, error = %e, "stored subscription record is unreadable");
        e
    })?;
    Ok(Some(record.upgrade()))
}

pub(crate) fn save_subscription<S: KeyValueStore + ?Sized>(
    store: &mut S,
    key: &str,
    record: &SubscriptionRecord,
) -> Result<()> {
    let bytes = serde_json::to_vec(record)?;
    store.set(key, bytes)?;
    info!(key, sigmas = record.sigmas.len(), "saved subscription record");
    Ok(())
}
