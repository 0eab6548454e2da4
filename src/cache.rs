//! Recipe cache keyed by normalized URL.

use async_trait::async_trait;
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use crate::model::RecipeDraft;

#[async_trait]
pub trait RecipeCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RecipeDraft>;

    async fn set(&self, key: &str, recipe: &RecipeDraft);
}

/// Lowercased URL without fragment, query or trailing slash.
pub fn normalize_url(url: &str) -> String {
    let normalized = match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url
            .trim()
            .split(['#', '?'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    normalized.trim_end_matches('/').to_lowercase()
}

/// SHA-256 hex digest of the normalized URL.
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(normalize_url(url).as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// In-process cache whose entries expire after a fixed TTL.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, RecipeDraft)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (Instant, RecipeDraft)>> {
        // entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecipeCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<RecipeDraft> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some((stored_at, recipe)) if stored_at.elapsed() < self.ttl => {
                debug!("Cache hit for {}", key);
                Some(recipe.clone())
            }
            Some(_) => {
                debug!("Cache entry for {} expired", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, recipe: &RecipeDraft) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        if entries.len() < before {
            debug!("Pruned {} expired cache entries", before - entries.len());
        }
        entries.insert(key.to_string(), (Instant::now(), recipe.clone()));
    }
}
