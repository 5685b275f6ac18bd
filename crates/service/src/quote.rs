//! Signed, TTL-bound quotes minted when a session reaches agreement.
//! Downstream order placement verifies the HMAC and the expiry; a lapsed
//! quote forces a fresh negotiation.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use mol_bhav_types::{new_session_id, NegotiationSession, Quote, SessionState, CURRENCY};

use crate::auth::constant_time_eq;
use crate::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

pub struct QuoteBuilder {
    signing_key: Vec<u8>,
}

impl QuoteBuilder {
    pub fn new(signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_key: signing_key.into(),
        }
    }

    /// Mint a quote for an agreed session
    pub fn build(
        &self,
        session: &NegotiationSession,
        now_ms: u64,
    ) -> Result<Quote, ServiceError> {
        if session.state != SessionState::Agreed {
            return Err(ServiceError::Internal(
                "quote requested for non-agreed session".to_string(),
            ));
        }
        let price = session.agreed_price.ok_or_else(|| {
            ServiceError::Internal("agreed session missing agreed_price".to_string())
        })?;

        let mut quote = Quote {
            quote_id: new_session_id().map_err(|e| ServiceError::Internal(e.to_string()))?,
            session_id: session.session_id.clone(),
            product_id: session.product_id.clone(),
            price,
            currency: CURRENCY.to_string(),
            issued_at: now_ms,
            expires_at: now_ms + session.quote_ttl_seconds * 1_000,
            signature: String::new(),
        };
        quote.signature = self.sign(&quote.signing_payload())?;
        Ok(quote)
    }

    /// Recompute and compare the signature in constant time
    pub fn verify(&self, quote: &Quote) -> bool {
        match self.sign(&quote.signing_payload()) {
            Ok(expected) => constant_time_eq(expected.as_bytes(), quote.signature.as_bytes()),
            Err(_) => false,
        }
    }

    fn sign(&self, payload: &str) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
