use serde::{Deserialize, Serialize};

use crate::session::NegotiationSession;
use crate::state::{Language, Sentiment, SessionState, Tactic};

/// Wire shape returned by start/offer/status. The floor never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub session_token: String,
    pub message: String,
    pub current_price: u64,
    pub anchor_price: u64,
    pub state: SessionState,
    pub tactic: Tactic,
    pub sentiment: Sentiment,
    pub round: u32,
    pub max_rounds: u32,
    pub language: Language,
    pub quote_ttl_seconds: u64,
    pub agreed_price: Option<u64>,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SessionResponse {
    /// Project a snapshot onto the wire shape
    pub fn from_session(session: &NegotiationSession, message: String) -> Self {
        Self {
            session_id: session.session_id.clone(),
            session_token: session.session_token.clone(),
            message,
            current_price: session.current_price,
            anchor_price: session.anchor_price,
            state: session.state,
            tactic: session.tactic,
            sentiment: session.sentiment,
            round: session.round,
            max_rounds: session.max_rounds,
            language: session.language,
            quote_ttl_seconds: session.quote_ttl_seconds,
            agreed_price: session.agreed_price,
            metadata: Default::default(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_omits_floor() {
        let session = NegotiationSession::new(
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
        let response = SessionResponse::from_session(&session, "namaste".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("9450"));
        assert!(!json.contains("floor"));
        assert!(json.contains("12999"));
    }

    #[test]
    fn test_metadata_attachment() {
        let session = NegotiationSession::new(
            "a".repeat(32),
            "t".repeat(64),
            "sku-1".to_string(),
            "buyer-1".to_string(),
            Language::En,
            1_000,
            800,
            15,
            5.0,
            0.6,
            60,
            0,
        );
        let response = SessionResponse::from_session(&session, String::new())
            .with_metadata("dialogue_fallback", serde_json::Value::Bool(true));
        assert_eq!(
            response.metadata.get("dialogue_fallback"),
            Some(&serde_json::Value::Bool(true))
        );
    }
}
