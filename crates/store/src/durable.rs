//! Durable tier: append-only offer events plus a one-shot session summary,
//! written for audit rather than play. Writes are idempotent so the service
//! can retry them blindly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use mol_bhav_types::{Actor, NegotiationSession, Offer, SessionState, Tactic};

use crate::error::StoreError;

// ═══════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════

/// Immutable durable row for one offer, keyed (session_id, round, actor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferEvent {
    pub session_id: String,
    pub round: u32,
    pub actor: Actor,
    pub price: u64,
    pub message: String,
    pub tactic: Option<Tactic>,
    pub timestamp_ms: u64,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl OfferEvent {
    pub fn from_offer(session_id: &str, offer: &Offer) -> Self {
        Self {
            session_id: session_id.to_string(),
            round: offer.round,
            actor: offer.actor,
            price: offer.price,
            message: offer.message.clone(),
            tactic: offer.tactic,
            timestamp_ms: offer.timestamp_ms,
            metadata: offer.metadata.clone(),
        }
    }
}

/// Terminal-state audit document, written exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub product_id: String,
    pub buyer_ref: String,
    pub outcome: SessionState,
    pub rounds_used: u32,
    pub agreed_price: Option<u64>,
    pub bot_score: f64,
    pub coupons: Vec<String>,
    pub degraded: bool,
    pub created_at: u64,
    pub closed_at: u64,
}

impl SessionSummary {
    pub fn from_session(session: &NegotiationSession, closed_at: u64) -> Self {
        Self {
            session_id: session.session_id.clone(),
            product_id: session.product_id.clone(),
            buyer_ref: session.buyer_ref.clone(),
            outcome: session.state,
            rounds_used: session.round,
            agreed_price: session.agreed_price,
            bot_score: session.bot_score,
            coupons: session.coupons_applied.iter().cloned().collect(),
            degraded: session.degraded,
            created_at: session.created_at,
            closed_at,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Append one offer event. Re-appending the same (session_id, round,
    /// actor) is a no-op, which makes retries safe.
    async fn append_offer(&self, event: &OfferEvent) -> Result<(), StoreError>;

    /// Write the terminal summary. The first write wins; later writes are
    /// ignored.
    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), StoreError>;

    /// Events for a session ordered by round, buyer before seller per round
    async fn get_events(&self, session_id: &str) -> Result<Vec<OfferEvent>, StoreError>;

    async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError>;

    /// Closed sessions for a buyer, newest first
    async fn list_by_buyer(
        &self,
        buyer_ref: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError>;

    /// Whether any event was ever recorded for the session
    async fn has_session(&self, session_id: &str) -> Result<bool, StoreError>;
}

// ═══════════════════════════════════════════════════════════════════════════
// IN-MEMORY IMPLEMENTATION (tests and single-node deployments)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    events: RwLock<HashMap<String, Vec<OfferEvent>>>,
    summaries: RwLock<HashMap<String, SessionSummary>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn append_offer(&self, event: &OfferEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().unwrap();
        let list = events.entry(event.session_id.clone()).or_default();
        if list
            .iter()
            .any(|e| e.round == event.round && e.actor == event.actor)
        {
            return Ok(());
        }
        list.push(event.clone());
        Ok(())
    }

    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        self.summaries
            .write()
            .unwrap()
            .entry(summary.session_id.clone())
            .or_insert_with(|| summary.clone());
        Ok(())
    }

    async fn get_events(&self, session_id: &str) -> Result<Vec<OfferEvent>, StoreError> {
        let mut list = self
            .events
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by_key(|e| (e.round, e.actor == Actor::Seller));
        Ok(list)
    }

    async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError> {
        Ok(self.summaries.read().unwrap().get(session_id).cloned())
    }

    async fn list_by_buyer(
        &self,
        buyer_ref: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let summaries = self.summaries.read().unwrap();
        let mut results: Vec<_> = summaries
            .values()
            .filter(|s| s.buyer_ref == buyer_ref)
            .cloned()
            .collect();
        results.sort_by_key(|s| std::cmp::Reverse(s.closed_at));
        results.truncate(limit);
        Ok(results)
    }

    async fn has_session(&self, session_id: &str) -> Result<bool, StoreError> {
        Ok(self.events.read().unwrap().contains_key(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mol_bhav_types::Language;

    fn make_event(session_id: &str, round: u32, actor: Actor, price: u64) -> OfferEvent {
        OfferEvent {
            session_id: session_id.to_string(),
            round,
            actor,
            price,
            message: String::new(),
            tactic: None,
            timestamp_ms: round as u64 * 1_000,
            metadata: Default::default(),
        }
    }

    fn make_summary(session_id: &str, buyer_ref: &str, closed_at: u64) -> SessionSummary {
        SessionSummary {
            session_id: session_id.to_string(),
            product_id: "sku-1".to_string(),
            buyer_ref: buyer_ref.to_string(),
            outcome: SessionState::Agreed,
            rounds_used: 4,
            agreed_price: Some(11_000),
            bot_score: 0.0,
            coupons: vec![],
            degraded: false,
            created_at: 0,
            closed_at,
        }
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let store = InMemoryDurableStore::new();
        let event = make_event("s1", 1, Actor::Buyer, 9_000);

        store.append_offer(&event).await.unwrap();
        store.append_offer(&event).await.unwrap();

        assert_eq!(store.get_events("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_events_ordered_buyer_first() {
        let store = InMemoryDurableStore::new();
        store.append_offer(&make_event("s1", 1, Actor::Seller, 12_000)).await.unwrap();
        store.append_offer(&make_event("s1", 2, Actor::Buyer, 9_500)).await.unwrap();
        store.append_offer(&make_event("s1", 1, Actor::Buyer, 9_000)).await.unwrap();
        store.append_offer(&make_event("s1", 2, Actor::Seller, 11_500)).await.unwrap();

        let events = store.get_events("s1").await.unwrap();
        let shape: Vec<(u32, Actor)> = events.iter().map(|e| (e.round, e.actor)).collect();
        assert_eq!(
            shape,
            vec![
                (1, Actor::Buyer),
                (1, Actor::Seller),
                (2, Actor::Buyer),
                (2, Actor::Seller)
            ]
        );
    }

    #[tokio::test]
    async fn test_summary_first_write_wins() {
        let store = InMemoryDurableStore::new();
        store.write_summary(&make_summary("s1", "buyer-1", 10_000)).await.unwrap();

        let mut second = make_summary("s1", "buyer-1", 20_000);
        second.agreed_price = Some(1);
        store.write_summary(&second).await.unwrap();

        let stored = store.get_summary("s1").await.unwrap().unwrap();
        assert_eq!(stored.closed_at, 10_000);
        assert_eq!(stored.agreed_price, Some(11_000));
    }

    #[tokio::test]
    async fn test_list_by_buyer_newest_first() {
        let store = InMemoryDurableStore::new();
        store.write_summary(&make_summary("s1", "buyer-1", 10_000)).await.unwrap();
        store.write_summary(&make_summary("s2", "buyer-1", 30_000)).await.unwrap();
        store.write_summary(&make_summary("s3", "buyer-2", 20_000)).await.unwrap();

        let sessions = store.list_by_buyer("buyer-1", 10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
    }

    #[tokio::test]
    async fn test_has_session() {
        let store = InMemoryDurableStore::new();
        assert!(!store.has_session("s1").await.unwrap());
        store.append_offer(&make_event("s1", 1, Actor::Buyer, 9_000)).await.unwrap();
        assert!(store.has_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_from_session_carries_outcome() {
        let mut session = NegotiationSession::new(
            "a".repeat(32),
            "t".repeat(64),
            "sku-1".to_string(),
            "buyer-1".to_string(),
            Language::En,
            12_999,
            9_450,
            15,
            5.0,
            0.6,
            60,
            0,
        );
        session.close_agreed(11_000, 9_000);

        let summary = SessionSummary::from_session(&session, 9_000);
        assert_eq!(summary.outcome, SessionState::Agreed);
        assert_eq!(summary.agreed_price, Some(11_000));
        assert_eq!(summary.closed_at, 9_000);
    }
}
