use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("rejected price: {0}")]
    RejectedPrice(String),

    #[error("invalid buyer price: {0}")]
    InvalidBuyerPrice(String),
}
