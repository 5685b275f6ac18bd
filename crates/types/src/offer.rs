use serde::{Deserialize, Serialize};

use crate::state::{Sentiment, Tactic};

/// Side of the table an offer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Buyer,
    Seller,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Buyer => "buyer",
            Actor::Seller => "seller",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buyer" => Some(Actor::Buyer),
            "seller" => Some(Actor::Seller),
            _ => None,
        }
    }
}

/// Timing and pattern deltas recorded against a buyer offer, consumed by the
/// bot detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferFeatures {
    /// Milliseconds since the previous buyer offer, None on the first one
    pub gap_ms: Option<u64>,

    /// Signed rupee delta against the previous buyer offer
    pub price_delta: Option<i64>,
}

/// One entry in a session's append-only offer ledger. Entries are immutable
/// once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub actor: Actor,
    pub price: u64,

    /// Sanitised free text, at most 2 KB
    pub message: String,

    /// Seller tactic; buyer offers carry none
    pub tactic: Option<Tactic>,

    pub sentiment: Sentiment,
    pub timestamp_ms: u64,
    pub round: u32,

    #[serde(default)]
    pub features: OfferFeatures,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Hard cap on stored offer text
pub const MAX_OFFER_MESSAGE_BYTES: usize = 2048;

impl Offer {
    pub fn buyer(price: u64, message: String, round: u32, timestamp_ms: u64) -> Self {
        Self {
            actor: Actor::Buyer,
            price,
            message: truncate_utf8(message, MAX_OFFER_MESSAGE_BYTES),
            tactic: None,
            sentiment: Sentiment::Neutral,
            timestamp_ms,
            round,
            features: OfferFeatures::default(),
            metadata: Default::default(),
        }
    }

    pub fn seller(price: u64, message: String, tactic: Tactic, round: u32, timestamp_ms: u64) -> Self {
        Self {
            actor: Actor::Seller,
            price,
            message: truncate_utf8(message, MAX_OFFER_MESSAGE_BYTES),
            tactic: Some(tactic),
            sentiment: Sentiment::Neutral,
            timestamp_ms,
            round,
            features: OfferFeatures::default(),
            metadata: Default::default(),
        }
    }

    pub fn with_features(mut self, features: OfferFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }
}

/// Truncate to a byte budget without splitting a UTF-8 code point
pub fn truncate_utf8(mut s: String, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s;
    }
    let mut cut = max_bytes;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_offer_has_no_tactic() {
        let offer = Offer::buyer(5_000, "bhaiya kam karo".to_string(), 1, 1_000);
        assert_eq!(offer.actor, Actor::Buyer);
        assert!(offer.tactic.is_none());
        assert_eq!(offer.round, 1);
    }

    #[test]
    fn test_seller_offer_carries_tactic() {
        let offer = Offer::seller(12_000, "final hai".to_string(), Tactic::Concession, 2, 2_000);
        assert_eq!(offer.tactic, Some(Tactic::Concession));
    }

    #[test]
    fn test_message_truncated_at_2kb() {
        let long = "x".repeat(5_000);
        let offer = Offer::buyer(100, long, 1, 0);
        assert_eq!(offer.message.len(), MAX_OFFER_MESSAGE_BYTES);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // Each devanagari char is 3 bytes
        let s = "नमस्ते".repeat(400);
        let t = truncate_utf8(s, MAX_OFFER_MESSAGE_BYTES);
        assert!(t.len() <= MAX_OFFER_MESSAGE_BYTES);
        assert!(std::str::from_utf8(t.as_bytes()).is_ok());
    }
}
