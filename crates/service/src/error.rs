use thiserror::Error;

use mol_bhav_engine::EngineError;
use mol_bhav_store::StoreError;
use mol_bhav_types::SessionError;

/// Service-level failures. Each variant maps to one wire error kind and an
/// HTTP-equivalent status for the shell to translate.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("invalid session token")]
    BadToken,

    #[error("session not found")]
    NoSession,

    #[error("session closed")]
    SessionClosed,

    #[error("session busy")]
    Busy,

    #[error("cooldown active")]
    Cooldown,

    #[error("rate limited")]
    RateLimited,

    #[error("offer out of order")]
    OutOfOrder,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("dialogue failed")]
    DialogueFailed,

    #[error("service degraded")]
    Degraded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable wire kind string
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::BadInput(_) => "bad_input",
            ServiceError::BadToken => "bad_token",
            ServiceError::NoSession => "no_session",
            ServiceError::SessionClosed => "session_closed",
            ServiceError::Busy => "busy",
            ServiceError::Cooldown => "cooldown",
            ServiceError::RateLimited => "rate_limited",
            ServiceError::OutOfOrder => "out_of_order",
            ServiceError::ValidationFailed(_) => "validation_failed",
            ServiceError::DialogueFailed => "dialogue_failed",
            ServiceError::Degraded => "degraded",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// HTTP-equivalent status for the shell collaborator
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadInput(_) => 400,
            ServiceError::BadToken => 401,
            ServiceError::NoSession => 404,
            ServiceError::Busy | ServiceError::OutOfOrder => 409,
            ServiceError::SessionClosed => 410,
            ServiceError::ValidationFailed(_) => 422,
            ServiceError::Cooldown | ServiceError::RateLimited => 429,
            ServiceError::DialogueFailed => 502,
            ServiceError::Degraded => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Opaque client-facing message; anything sensitive stays in the logs
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockHeld(_) => ServiceError::Busy,
            StoreError::RateLimited { .. } => ServiceError::RateLimited,
            StoreError::NotFound(_) => ServiceError::NoSession,
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidBuyerPrice(msg) => ServiceError::BadInput(msg),
            EngineError::RejectedPrice(msg) => ServiceError::ValidationFailed(msg),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Terminal(_) => ServiceError::SessionClosed,
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status_pairings() {
        let cases: Vec<(ServiceError, &str, u16)> = vec![
            (ServiceError::BadInput("x".into()), "bad_input", 400),
            (ServiceError::BadToken, "bad_token", 401),
            (ServiceError::NoSession, "no_session", 404),
            (ServiceError::Busy, "busy", 409),
            (ServiceError::SessionClosed, "session_closed", 410),
            (ServiceError::ValidationFailed("x".into()), "validation_failed", 422),
            (ServiceError::Cooldown, "cooldown", 429),
            (ServiceError::RateLimited, "rate_limited", 429),
            (ServiceError::DialogueFailed, "dialogue_failed", 502),
            (ServiceError::Degraded, "degraded", 503),
            (ServiceError::Internal("x".into()), "internal", 500),
        ];
        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind);
            assert_eq!(err.http_status(), status);
        }
    }

    #[test]
    fn test_internal_details_are_opaque() {
        let err = ServiceError::Internal("durable row corrupt: id=abc".to_string());
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn test_lock_contention_maps_to_busy() {
        let err: ServiceError = StoreError::LockHeld("s1".to_string()).into();
        assert!(matches!(err, ServiceError::Busy));
    }
}
