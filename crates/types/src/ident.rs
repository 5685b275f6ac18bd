use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// Generate `n` random bytes as lowercase hex
pub fn random_hex(n: usize) -> Result<String, IdentError> {
    let mut buf = vec![0u8; n];
    getrandom::getrandom(&mut buf).map_err(|e| IdentError::Entropy(e.to_string()))?;
    Ok(hex::encode(buf))
}

/// New session identifier: 32 lowercase hex chars (128 bits)
pub fn new_session_id() -> Result<String, IdentError> {
    random_hex(16)
}

/// New opaque session token: 64 lowercase hex chars (256 bits)
pub fn new_session_token() -> Result<String, IdentError> {
    random_hex(32)
}

/// Session ids match `^[a-f0-9]{32}$`
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == 32
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Product ids match `^[A-Za-z0-9_-]{1,100}$`
pub fn is_valid_product_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 100
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
