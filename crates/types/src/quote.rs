use serde::{Deserialize, Serialize};

/// Signed, TTL-bound record of an agreed price. Issued once a session reaches
/// `agreed`; expired quotes must be re-negotiated in a fresh session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,
    pub session_id: String,
    pub product_id: String,

    /// Agreed price, integer rupees
    pub price: u64,

    /// ISO 4217 code
    pub currency: String,

    pub issued_at: u64,
    pub expires_at: u64,

    /// Hex HMAC-SHA256 over the canonical payload
    pub signature: String,
}

impl Quote {
    /// Canonical byte string the signature covers. Field order is fixed;
    /// re-serialising the struct must never change it.
    pub fn signing_payload(&self) -> String {
        format!(
            "{{\"quote_id\":\"{}\",\"session_id\":\"{}\",\"product_id\":\"{}\",\"price\":{},\"currency\":\"{}\",\"issued_at\":{},\"expires_at\":{}}}",
            self.quote_id,
            self.session_id,
            self.product_id,
            self.price,
            self.currency,
            self.issued_at,
            self.expires_at,
        )
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}
