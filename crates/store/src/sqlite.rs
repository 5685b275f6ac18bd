//! SQLite-backed durable tier. Idempotency rides on the table keys:
//! offer events insert-or-ignore on (session_id, round, actor), summaries on
//! their primary key, so the first write always wins.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use mol_bhav_types::{Actor, SessionState, Tactic};

use crate::durable::{DurableStore, OfferEvent, SessionSummary};
use crate::error::StoreError;

pub struct SqliteDurableStore {
    pool: SqlitePool,
}

impl SqliteDurableStore {
    /// Open (or create) a database file and run migrations
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        Self::from_url(&url).await
    }

    /// Connect to a SQLite URL, e.g. `sqlite::memory:`
    pub async fn from_url(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory database for tests
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::from_url("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for migration in [
            include_str!("../migrations/001_create_offer_events.sql"),
            include_str!("../migrations/002_create_session_summaries.sql"),
        ] {
            for statement in migration.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<OfferEvent, StoreError> {
        let actor_str: String = row.get("actor");
        let actor = Actor::parse(&actor_str)
            .ok_or_else(|| StoreError::Serialization(format!("bad actor: {actor_str}")))?;

        let tactic = row
            .get::<Option<String>, _>("tactic")
            .map(|t| {
                Tactic::parse(&t).ok_or_else(|| StoreError::Serialization(format!("bad tactic: {t}")))
            })
            .transpose()?;

        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str(&metadata_str)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(OfferEvent {
            session_id: row.get("session_id"),
            round: row.get::<i64, _>("round") as u32,
            actor,
            price: row.get::<i64, _>("price") as u64,
            message: row.get("message"),
            tactic,
            timestamp_ms: row.get::<i64, _>("timestamp_ms") as u64,
            metadata,
        })
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<SessionSummary, StoreError> {
        let outcome_str: String = row.get("outcome");
        let outcome = SessionState::parse(&outcome_str)
            .ok_or_else(|| StoreError::Serialization(format!("bad outcome: {outcome_str}")))?;

        let coupons_str: String = row.get("coupons");
        let coupons = serde_json::from_str(&coupons_str)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(SessionSummary {
            session_id: row.get("session_id"),
            product_id: row.get("product_id"),
            buyer_ref: row.get("buyer_ref"),
            outcome,
            rounds_used: row.get::<i64, _>("rounds_used") as u32,
            agreed_price: row.get::<Option<i64>, _>("agreed_price").map(|p| p as u64),
            bot_score: row.get("bot_score"),
            coupons,
            degraded: row.get::<i64, _>("degraded") != 0,
            created_at: row.get::<i64, _>("created_at") as u64,
            closed_at: row.get::<i64, _>("closed_at") as u64,
        })
    }
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn append_offer(&self, event: &OfferEvent) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO offer_events (
                session_id, round, actor, price, message, tactic, timestamp_ms, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.session_id)
        .bind(event.round as i64)
        .bind(event.actor.as_str())
        .bind(event.price as i64)
        .bind(&event.message)
        .bind(event.tactic.map(|t| t.as_str()))
        .bind(event.timestamp_ms as i64)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        let coupons = serde_json::to_string(&summary.coupons)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO session_summaries (
                session_id, product_id, buyer_ref, outcome, rounds_used,
                agreed_price, bot_score, coupons, degraded, created_at, closed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.session_id)
        .bind(&summary.product_id)
        .bind(&summary.buyer_ref)
        .bind(summary.outcome.as_str())
        .bind(summary.rounds_used as i64)
        .bind(summary.agreed_price.map(|p| p as i64))
        .bind(summary.bot_score)
        .bind(&coupons)
        .bind(summary.degraded as i64)
        .bind(summary.created_at as i64)
        .bind(summary.closed_at as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_events(&self, session_id: &str) -> Result<Vec<OfferEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM offer_events
            WHERE session_id = ?
            ORDER BY round ASC, CASE actor WHEN 'buyer' THEN 0 ELSE 1 END ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError> {
        let row = sqlx::query("SELECT * FROM session_summaries WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    async fn list_by_buyer(
        &self,
        buyer_ref: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM session_summaries
            WHERE buyer_ref = ?
            ORDER BY closed_at DESC
            LIMIT ?
            "#,
        )
        .bind(buyer_ref)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn has_session(&self, session_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM offer_events WHERE session_id = ? LIMIT 1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(session_id: &str, round: u32, actor: Actor, price: u64) -> OfferEvent {
        OfferEvent {
            session_id: session_id.to_string(),
            round,
            actor,
            price,
            message: "theek hai".to_string(),
            tactic: (actor == Actor::Seller).then_some(Tactic::Concession),
            timestamp_ms: round as u64 * 1_000,
            metadata: Default::default(),
        }
    }

    fn make_summary(session_id: &str) -> SessionSummary {
        SessionSummary {
            session_id: session_id.to_string(),
            product_id: "sku-1".to_string(),
            buyer_ref: "203.0.113.7".to_string(),
            outcome: SessionState::Agreed,
            rounds_used: 3,
            agreed_price: Some(11_000),
            bot_score: 0.125,
            coupons: vec!["festival-3pct".to_string()],
            degraded: false,
            created_at: 100,
            closed_at: 9_000,
        }
    }

    #[tokio::test]
    async fn test_event_round_trip() {
        let store = SqliteDurableStore::in_memory().await.unwrap();
        let event = make_event("s1", 1, Actor::Seller, 12_000);

        store.append_offer(&event).await.unwrap();
        let events = store.get_events("s1").await.unwrap();
        assert_eq!(events, vec![event]);
    }

    #[tokio::test]
    async fn test_duplicate_append_ignored() {
        let store = SqliteDurableStore::in_memory().await.unwrap();
        let event = make_event("s1", 1, Actor::Buyer, 9_000);

        store.append_offer(&event).await.unwrap();
        let mut replay = event.clone();
        replay.price = 1;
        store.append_offer(&replay).await.unwrap();

        let events = store.get_events("s1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].price, 9_000);
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let store = SqliteDurableStore::in_memory().await.unwrap();
        store.append_offer(&make_event("s1", 2, Actor::Seller, 11_000)).await.unwrap();
        store.append_offer(&make_event("s1", 1, Actor::Seller, 12_000)).await.unwrap();
        store.append_offer(&make_event("s1", 1, Actor::Buyer, 9_000)).await.unwrap();
        store.append_offer(&make_event("s1", 2, Actor::Buyer, 9_500)).await.unwrap();

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
    async fn test_summary_round_trip_and_first_write_wins() {
        let store = SqliteDurableStore::in_memory().await.unwrap();
        let summary = make_summary("s1");
        store.write_summary(&summary).await.unwrap();

        let mut second = make_summary("s1");
        second.agreed_price = Some(1);
        store.write_summary(&second).await.unwrap();

        let stored = store.get_summary("s1").await.unwrap().unwrap();
        assert_eq!(stored, summary);
    }

    #[tokio::test]
    async fn test_list_by_buyer() {
        let store = SqliteDurableStore::in_memory().await.unwrap();
        let mut a = make_summary("s1");
        a.closed_at = 10_000;
        let mut b = make_summary("s2");
        b.closed_at = 30_000;
        let mut other = make_summary("s3");
        other.buyer_ref = "198.51.100.1".to_string();

        store.write_summary(&a).await.unwrap();
        store.write_summary(&b).await.unwrap();
        store.write_summary(&other).await.unwrap();

        let sessions = store.list_by_buyer("203.0.113.7", 10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
    }

    #[tokio::test]
    async fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molbhav.db");

        let store = SqliteDurableStore::new(&path).await.unwrap();
        store.append_offer(&make_event("s1", 1, Actor::Buyer, 9_000)).await.unwrap();
        assert!(store.has_session("s1").await.unwrap());
    }
}
