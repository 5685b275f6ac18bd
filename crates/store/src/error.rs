use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("lock held for session: {0}")]
    LockHeld(String),

    #[error("lock token mismatch for session: {0}")]
    ForeignUnlock(String),

    #[error("start rate exceeded: {cap} per window")]
    RateLimited { cap: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("connection error: {0}")]
    Connection(String),
}
