//! In-memory revocation list for gateway tokens.
//!
//! Tokens are stored with their own expiry. Verification allows no leeway
//! past `exp`, so once a token has expired it can no longer verify and
//! [`TokenBlacklist::cleanup_expired`] drops it.
//! The list is process-local: a multi-instance deployment needs a shared
//! store instead.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
pub struct TokenBlacklist {
    // token -> expiry (epoch milliseconds)
    entries: Arc<RwLock<HashMap<String, i64>>>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes `token` until `expires_at_ms`. Blank tokens are ignored.
    pub fn blacklist(&self, token: &str, expires_at_ms: i64) {
        if token.trim().is_empty() {
            warn!("Attempted to blacklist a blank token");
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(token.to_string(), expires_at_ms);
        debug!(expires_at_ms, "Token blacklisted");
    }

    /// Revokes `token` unless it already is. Returns `true` for the caller
    /// that revoked it, so a token can be consumed exactly once.
    pub fn blacklist_if_absent(&self, token: &str, expires_at_ms: i64) -> bool {
        if token.trim().is_empty() {
            return false;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(token) {
            return false;
        }
        entries.insert(token.to_string(), expires_at_ms);
        true
    }

    pub fn is_blacklisted(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(token)
    }

    pub fn remove(&self, token: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(token);
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Drops entries whose expiry is before `now_ms`. Returns how many were removed.
    pub fn cleanup_expired_at(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now_ms);
        let removed = before - entries.len();

        if removed > 0 {
            info!(
                removed,
                remaining = entries.len(),
                "Cleaned up expired tokens from blacklist"
            );
        }
        removed
    }

    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now().timestamp_millis())
    }

    /// Spawns a task that runs [`cleanup_expired`](Self::cleanup_expired) every `interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let blacklist = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                blacklist.cleanup_expired();
            }
        })
    }
}
