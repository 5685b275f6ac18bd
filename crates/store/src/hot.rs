//! Hot tier: the source of truth while a session is in play. TTL-bound
//! snapshots, a per-session lease lock with fencing tokens, cooldown keys and
//! per-IP start-rate counters. The in-memory implementation evicts lazily:
//! an expired entry reads as absent.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use mol_bhav_ratelimit::FixedWindow;
use mol_bhav_types::{random_hex, Clock, NegotiationSession};

use crate::error::StoreError;

/// Proof of lock ownership. Release verifies the token so a task whose lease
/// expired cannot unlock a later holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub session_id: String,
    token: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait HotStore: Send + Sync {
    /// Write the snapshot under `session:{id}` and (re)arm its TTL
    async fn put_session(&self, session: &NegotiationSession, ttl_ms: u64)
        -> Result<(), StoreError>;

    /// Read a live snapshot; expired or missing yields None
    async fn get_session(&self, session_id: &str)
        -> Result<Option<NegotiationSession>, StoreError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), StoreError>;

    /// Single-writer mutex: write-if-absent with a lease. Contenders get
    /// `LockHeld` immediately, never block.
    async fn acquire_lock(&self, session_id: &str, lease_ms: u64)
        -> Result<LockToken, StoreError>;

    /// Release only succeeds with the fencing token of the current holder
    async fn release_lock(&self, token: &LockToken) -> Result<(), StoreError>;

    async fn set_cooldown(&self, session_id: &str, ttl_ms: u64) -> Result<(), StoreError>;

    async fn cooldown_active(&self, session_id: &str) -> Result<bool, StoreError>;

    /// Count a start attempt for `ip`; errors once the per-window cap is hit
    async fn incr_start_rate(
        &self,
        ip: &str,
        window_ms: u64,
        cap: u32,
    ) -> Result<u32, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

pub struct InMemoryHotStore {
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<String, Expiring<String>>>,
    locks: RwLock<HashMap<String, Expiring<String>>>,
    cooldowns: RwLock<HashMap<String, u64>>,
    start_windows: RwLock<HashMap<String, FixedWindow>>,
}

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: u64,
}

impl InMemoryHotStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sessions: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
            cooldowns: RwLock::new(HashMap::new()),
            start_windows: RwLock::new(HashMap::new()),
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }
}

#[async_trait]
impl HotStore for InMemoryHotStore {
    async fn put_session(
        &self,
        session: &NegotiationSession,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        let blob = serde_json::to_string(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.sessions.write().unwrap().insert(
            session.session_id.clone(),
            Expiring {
                value: blob,
                expires_at: self.now() + ttl_ms,
            },
        );
        Ok(())
    }

    async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<Option<NegotiationSession>, StoreError> {
        let now = self.now();
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(entry) if entry.expires_at > now => serde_json::from_str(&entry.value)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            _ => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }

    async fn acquire_lock(
        &self,
        session_id: &str,
        lease_ms: u64,
    ) -> Result<LockToken, StoreError> {
        let now = self.now();
        let mut locks = self.locks.write().unwrap();
        if let Some(held) = locks.get(session_id) {
            if held.expires_at > now {
                return Err(StoreError::LockHeld(session_id.to_string()));
            }
        }
        let token = random_hex(16).map_err(|e| StoreError::Database(e.to_string()))?;
        locks.insert(
            session_id.to_string(),
            Expiring {
                value: token.clone(),
                expires_at: now + lease_ms,
            },
        );
        Ok(LockToken {
            session_id: session_id.to_string(),
            token,
        })
    }

    async fn release_lock(&self, token: &LockToken) -> Result<(), StoreError> {
        let mut locks = self.locks.write().unwrap();
        match locks.get(&token.session_id) {
            Some(held) if held.value == token.token => {
                locks.remove(&token.session_id);
                Ok(())
            }
            Some(_) => Err(StoreError::ForeignUnlock(token.session_id.clone())),
            // Lease already lapsed and was reclaimed; release is idempotent
            None => Ok(()),
        }
    }

    async fn set_cooldown(&self, session_id: &str, ttl_ms: u64) -> Result<(), StoreError> {
        self.cooldowns
            .write()
            .unwrap()
            .insert(session_id.to_string(), self.now() + ttl_ms);
        Ok(())
    }

    async fn cooldown_active(&self, session_id: &str) -> Result<bool, StoreError> {
        let now = self.now();
        Ok(self
            .cooldowns
            .read()
            .unwrap()
            .get(session_id)
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn incr_start_rate(
        &self,
        ip: &str,
        window_ms: u64,
        cap: u32,
    ) -> Result<u32, StoreError> {
        let now = self.now();
        let fresh =
            FixedWindow::new(window_ms, cap).map_err(|e| StoreError::Database(e.to_string()))?;
        let mut windows = self.start_windows.write().unwrap();
        windows
            .entry(ip.to_string())
            .or_insert(fresh)
            .try_increment(now)
            .map_err(|_| StoreError::RateLimited { cap })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mol_bhav_types::{Language, ManualClock};

    fn make_test_session(id: &str) -> NegotiationSession {
        NegotiationSession::new(
            id.to_string(),
            "t".repeat(64),
            "sku-1".to_string(),
            "203.0.113.7".to_string(),
            Language::En,
            12_999,
            9_450,
            15,
            5.0,
            0.6,
            60,
            0,
        )
    }

    fn make_store() -> (Arc<ManualClock>, InMemoryHotStore) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = InMemoryHotStore::new(clock.clone());
        (clock, store)
    }

    // ==================== Snapshot TTL ====================

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_clock, store) = make_store();
        let session = make_test_session(&"a".repeat(32));

        store.put_session(&session, 300_000).await.unwrap();
        let loaded = store.get_session(&session.session_id).await.unwrap();
        assert_eq!(loaded, Some(session));
    }

    #[tokio::test]
    async fn test_snapshot_expires() {
        let (clock, store) = make_store();
        let session = make_test_session(&"a".repeat(32));

        store.put_session(&session, 300_000).await.unwrap();
        clock.advance(300_001);
        assert_eq!(store.get_session(&session.session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_refreshes_ttl() {
        let (clock, store) = make_store();
        let session = make_test_session(&"a".repeat(32));

        store.put_session(&session, 300_000).await.unwrap();
        clock.advance(200_000);
        store.put_session(&session, 300_000).await.unwrap();
        clock.advance(200_000);

        // 400s after creation but only 200s after refresh
        assert!(store.get_session(&session.session_id).await.unwrap().is_some());
    }

    // ==================== Lock Semantics ====================

    #[tokio::test]
    async fn test_lock_excludes_second_writer() {
        let (_clock, store) = make_store();
        let token = store.acquire_lock("s1", 5_000).await.unwrap();

        assert!(matches!(
            store.acquire_lock("s1", 5_000).await,
            Err(StoreError::LockHeld(_))
        ));

        store.release_lock(&token).await.unwrap();
        assert!(store.acquire_lock("s1", 5_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_lease_expiry_allows_reacquire() {
        let (clock, store) = make_store();
        let stale = store.acquire_lock("s1", 5_000).await.unwrap();

        clock.advance(5_001);
        let fresh = store.acquire_lock("s1", 5_000).await.unwrap();

        // The stale holder cannot release the new lease
        assert!(matches!(
            store.release_lock(&stale).await,
            Err(StoreError::ForeignUnlock(_))
        ));
        store.release_lock(&fresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_is_idempotent_after_reclaim() {
        let (clock, store) = make_store();
        let token = store.acquire_lock("s1", 5_000).await.unwrap();
        store.release_lock(&token).await.unwrap();
        clock.advance(10);
        assert!(store.release_lock(&token).await.is_ok());
    }

    // ==================== Cooldown & Start Rate ====================

    #[tokio::test]
    async fn test_cooldown_lifecycle() {
        let (clock, store) = make_store();
        assert!(!store.cooldown_active("s1").await.unwrap());

        store.set_cooldown("s1", 2_000).await.unwrap();
        assert!(store.cooldown_active("s1").await.unwrap());

        clock.advance(2_001);
        assert!(!store.cooldown_active("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_start_rate_caps_per_ip() {
        let (clock, store) = make_store();
        for _ in 0..30 {
            store.incr_start_rate("198.51.100.9", 60_000, 30).await.unwrap();
        }
        assert!(matches!(
            store.incr_start_rate("198.51.100.9", 60_000, 30).await,
            Err(StoreError::RateLimited { cap: 30 })
        ));

        // Another IP is unaffected
        assert!(store.incr_start_rate("198.51.100.10", 60_000, 30).await.is_ok());

        // Window rollover clears the counter
        clock.advance(60_000);
        assert!(store.incr_start_rate("198.51.100.9", 60_000, 30).await.is_ok());
    }
}
