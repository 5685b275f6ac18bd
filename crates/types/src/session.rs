use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::offer::{Actor, Offer};
use crate::state::{Language, Sentiment, SessionState, Tactic};

/// Full state of one buyer/seller haggling session. The snapshot is a value:
/// it is what the hot tier stores and what every pure component reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationSession {
    // ═══════════════════════════════════════════════════════════════════════
    // IDENTITY
    // ═══════════════════════════════════════════════════════════════════════
    /// 32 lowercase hex chars
    pub session_id: String,

    /// Opaque bearer token, >= 128 bits of entropy
    pub session_token: String,

    pub product_id: String,
    pub buyer_ref: String,
    pub language: Language,

    // ═══════════════════════════════════════════════════════════════════════
    // PRICING STATE
    // ═══════════════════════════════════════════════════════════════════════
    pub anchor_price: u64,

    /// Never revealed externally
    pub floor_price: u64,

    /// Seller's last counter; monotonically non-increasing
    pub current_price: u64,

    pub last_buyer_price: Option<u64>,
    pub agreed_price: Option<u64>,

    // ═══════════════════════════════════════════════════════════════════════
    // PROTOCOL STATE
    // ═══════════════════════════════════════════════════════════════════════
    pub round: u32,
    pub max_rounds: u32,
    pub state: SessionState,
    pub tactic: Tactic,
    pub sentiment: Sentiment,

    /// Concession curve shape, Boulware above 1.0
    pub beta: f64,

    /// Reciprocity damping
    pub alpha: f64,

    pub offers: Vec<Offer>,
    pub bot_score: f64,
    pub flounce_used: bool,
    pub coupons_applied: BTreeSet<String>,

    /// Audit trail incomplete after exhausted durable retries; session stays
    /// serviceable from the hot tier.
    pub degraded: bool,

    pub quote_ttl_seconds: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("session is terminal: {0}")]
    Terminal(SessionState),

    #[error("price {price} outside [{floor}, {anchor}]")]
    PriceOutOfBounds { price: u64, floor: u64, anchor: u64 },

    #[error("seller counter {next} above previous {prev}")]
    NonMonotonicCounter { prev: u64, next: u64 },

    #[error("round {got}, expected {expected}")]
    RoundSkew { expected: u32, got: u32 },
}

impl NegotiationSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        session_token: String,
        product_id: String,
        buyer_ref: String,
        language: Language,
        anchor_price: u64,
        floor_price: u64,
        max_rounds: u32,
        beta: f64,
        alpha: f64,
        quote_ttl_seconds: u64,
        now_ms: u64,
    ) -> Self {
        Self {
            session_id,
            session_token,
            product_id,
            buyer_ref,
            language,
            anchor_price,
            floor_price,
            current_price: anchor_price,
            last_buyer_price: None,
            agreed_price: None,
            round: 0,
            max_rounds,
            state: SessionState::Proposing,
            tactic: Tactic::OpeningAnchor,
            sentiment: Sentiment::Neutral,
            beta,
            alpha,
            offers: Vec::new(),
            bot_score: 0.0,
            flounce_used: false,
            coupons_applied: BTreeSet::new(),
            degraded: false,
            quote_ttl_seconds,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Buyer offers in arrival order
    pub fn buyer_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(|o| o.actor == Actor::Buyer)
    }

    /// Recorded buyer prices in arrival order
    pub fn buyer_prices(&self) -> Vec<u64> {
        self.buyer_offers().map(|o| o.price).collect()
    }

    /// Timestamp of the latest buyer offer, if any
    pub fn last_buyer_timestamp(&self) -> Option<u64> {
        self.buyer_offers().map(|o| o.timestamp_ms).last()
    }

    /// Append a buyer offer, advancing the round by exactly one
    pub fn record_buyer_offer(&mut self, offer: Offer) -> Result<(), SessionError> {
        if self.is_terminal() {
            return Err(SessionError::Terminal(self.state));
        }
        let expected = self.round + 1;
        if offer.round != expected {
            return Err(SessionError::RoundSkew {
                expected,
                got: offer.round,
            });
        }
        self.round = expected;
        self.last_buyer_price = Some(offer.price);
        self.updated_at = offer.timestamp_ms;
        self.offers.push(offer);

        // First buyer response collapses proposing into responding
        if self.state == SessionState::Proposing {
            self.state = SessionState::Responding;
        }
        Ok(())
    }

    /// Append a seller counter, enforcing floor/anchor bounds and the
    /// non-increasing counter invariant.
    pub fn record_seller_offer(&mut self, offer: Offer) -> Result<(), SessionError> {
        if offer.price < self.floor_price || offer.price > self.anchor_price {
            return Err(SessionError::PriceOutOfBounds {
                price: offer.price,
                floor: self.floor_price,
                anchor: self.anchor_price,
            });
        }
        if offer.price > self.current_price {
            return Err(SessionError::NonMonotonicCounter {
                prev: self.current_price,
                next: offer.price,
            });
        }
        self.current_price = offer.price;
        if let Some(tactic) = offer.tactic {
            self.tactic = tactic;
        }
        self.updated_at = offer.timestamp_ms;
        self.offers.push(offer);
        Ok(())
    }

    /// Freeze the session on agreement
    pub fn close_agreed(&mut self, agreed_price: u64, now_ms: u64) {
        self.agreed_price = Some(agreed_price);
        self.state = SessionState::Agreed;
        self.tactic = Tactic::Accept;
        self.updated_at = now_ms;
    }

    /// Cross-field consistency check used by debug assertions and tests
    pub fn check_invariants(&self) -> Result<(), SessionError> {
        if self.current_price < self.floor_price || self.current_price > self.anchor_price {
            return Err(SessionError::PriceOutOfBounds {
                price: self.current_price,
                floor: self.floor_price,
                anchor: self.anchor_price,
            });
        }
        let mut prev_seller: Option<u64> = None;
        for offer in self.offers.iter().filter(|o| o.actor == Actor::Seller) {
            if let Some(prev) = prev_seller {
                if offer.price > prev {
                    return Err(SessionError::NonMonotonicCounter {
                        prev,
                        next: offer.price,
                    });
                }
            }
            prev_seller = Some(offer.price);
        }
        let buyer_rounds = self.buyer_offers().count() as u32;
        if buyer_rounds != self.round {
            return Err(SessionError::RoundSkew {
                expected: self.round,
                got: buyer_rounds,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Tactic;

    fn make_test_session() -> NegotiationSession {
        NegotiationSession::new(
            "a".repeat(32),
            "t".repeat(64),
            "sku-1".to_string(),
            "203.0.113.7".to_string(),
            Language::Hi,
            12_999,
            9_450,
            15,
            5.0,
            0.6,
            60,
            1_000,
        )
    }

    #[test]
    fn test_new_session_opens_at_anchor() {
        let session = make_test_session();
        assert_eq!(session.current_price, 12_999);
        assert_eq!(session.round, 0);
        assert_eq!(session.state, SessionState::Proposing);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn test_round_advances_by_one() {
        let mut session = make_test_session();
        session
            .record_buyer_offer(Offer::buyer(8_000, String::new(), 1, 2_000))
            .unwrap();
        assert_eq!(session.round, 1);
        assert_eq!(session.state, SessionState::Responding);

        // Skipping a round is rejected
        let err = session
            .record_buyer_offer(Offer::buyer(8_100, String::new(), 3, 3_000))
            .unwrap_err();
        assert_eq!(err, SessionError::RoundSkew { expected: 2, got: 3 });
    }

    #[test]
    fn test_seller_counter_monotone() {
        let mut session = make_test_session();
        session
            .record_seller_offer(Offer::seller(12_000, String::new(), Tactic::Concession, 1, 2_000))
            .unwrap();
        let err = session
            .record_seller_offer(Offer::seller(12_500, String::new(), Tactic::Concession, 2, 3_000))
            .unwrap_err();
        assert!(matches!(err, SessionError::NonMonotonicCounter { .. }));
    }

    #[test]
    fn test_seller_counter_bounded() {
        let mut session = make_test_session();
        let below = session
            .record_seller_offer(Offer::seller(9_000, String::new(), Tactic::Concession, 1, 2_000))
            .unwrap_err();
        assert!(matches!(below, SessionError::PriceOutOfBounds { .. }));

        let above = session
            .record_seller_offer(Offer::seller(13_500, String::new(), Tactic::Concession, 1, 2_000))
            .unwrap_err();
        assert!(matches!(above, SessionError::PriceOutOfBounds { .. }));
    }

    #[test]
    fn test_terminal_sessions_reject_offers() {
        let mut session = make_test_session();
        session.close_agreed(11_000, 5_000);
        assert!(session.is_terminal());

        let err = session
            .record_buyer_offer(Offer::buyer(11_500, String::new(), 1, 6_000))
            .unwrap_err();
        assert_eq!(err, SessionError::Terminal(SessionState::Agreed));
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let mut session = make_test_session();
        session
            .record_buyer_offer(Offer::buyer(8_000, "thoda kam".to_string(), 1, 2_000))
            .unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let back: NegotiationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
