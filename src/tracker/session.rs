use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::tracker::clock::Clock;

pub const SESSION_STORAGE_KEY: &str = "analytics_session_id";

/// Key/value storage scoped to one browsing context: survives reloads of the
/// tab, not other tabs or a fresh context.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    saved_at: i64,
}

/// Holds the opaque session token between page loads. The token is only
/// ever round-tripped to the server; it is never parsed or generated here.
#[derive(Clone)]
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
        Self {
            storage,
            clock,
            max_age,
        }
    }

    /// The stored token, unless it is missing, unreadable or stale.
    pub fn get(&self) -> Option<String> {
        let raw = self.storage.get_item(SESSION_STORAGE_KEY)?;
        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(_) => {
                log::debug!("Discarding unreadable stored session");
                self.clear();
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(stored.saved_at);
        let max_age = i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX);
        if age > max_age || stored.token.is_empty() {
            self.clear();
            return None;
        }
        Some(stored.token)
    }

    /// Store `token`, restarting its freshness period.
    pub fn set(&self, token: &str) {
        let stored = StoredSession {
            token: token.to_string(),
            saved_at: self.clock.now_millis(),
        };
        match serde_json::to_string(&stored) {
            Ok(raw) => self.storage.set_item(SESSION_STORAGE_KEY, &raw),
            Err(e) => log::warn!("Failed to persist session token: {}", e),
        }
    }

    pub fn clear(&self) {
        self.storage.remove_item(SESSION_STORAGE_KEY);
    }
}
