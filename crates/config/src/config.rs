//! Core configuration structures for the Mol-Bhav negotiation service

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Negotiation behaviour defaults applied to new sessions
    #[serde(default)]
    pub negotiation: NegotiationDefaults,

    /// Service environment and admin surface
    #[serde(default)]
    pub server: ServerConfig,

    /// External language model endpoint
    #[serde(default)]
    pub llm: LlmConfig,

    /// Hot and durable store endpoints and deadlines
    #[serde(default)]
    pub stores: StoreConfig,

    /// Quote signing
    #[serde(default)]
    pub quote: QuoteConfig,
}

/// Per-session negotiation parameters, chosen at session start and static
/// afterwards
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiationDefaults {
    /// Concession curve shape; above 1.0 holds firm until near the deadline
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Tit-for-tat damping factor
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,

    /// Cooldown between buyer offers
    #[serde(default = "default_min_response_delay_ms")]
    pub min_response_delay_ms: u64,

    #[serde(default = "default_quote_ttl_seconds")]
    pub quote_ttl_seconds: u64,

    /// ZOPA acceptance slack as a fraction of the anchor
    #[serde(default = "default_zopa_epsilon_pct")]
    pub zopa_epsilon_pct: f64,

    /// Session starts allowed per IP per minute
    #[serde(default = "default_start_rate_per_minute")]
    pub start_rate_per_minute: u32,

    /// Per-session lock lease
    #[serde(default = "default_lock_lease_ms")]
    pub lock_lease_ms: u64,
}

impl Default for NegotiationDefaults {
    fn default() -> Self {
        Self {
            beta: default_beta(),
            alpha: default_alpha(),
            max_rounds: default_max_rounds(),
            session_ttl_seconds: default_session_ttl_seconds(),
            min_response_delay_ms: default_min_response_delay_ms(),
            quote_ttl_seconds: default_quote_ttl_seconds(),
            zopa_epsilon_pct: default_zopa_epsilon_pct(),
            start_rate_per_minute: default_start_rate_per_minute(),
            lock_lease_ms: default_lock_lease_ms(),
        }
    }
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub env: Environment,

    /// Admin routes require this key, compared in constant time
    #[serde(default)]
    pub api_admin_key: Option<String>,

    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            env: Environment::Development,
            api_admin_key: None,
            cors_allowed_origins: Vec::new(),
            metrics_port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// `memory://` for the in-process hot tier
    #[serde(default = "default_hot_url")]
    pub hot_url: String,

    /// SQLite URL for the durable tier
    #[serde(default = "default_durable_url")]
    pub durable_url: String,

    #[serde(default = "default_hot_timeout_ms")]
    pub hot_timeout_ms: u64,

    #[serde(default = "default_durable_timeout_ms")]
    pub durable_timeout_ms: u64,

    /// Durable write attempts before the session is flagged degraded
    #[serde(default = "default_persist_retries")]
    pub persist_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hot_url: default_hot_url(),
            durable_url: default_durable_url(),
            hot_timeout_ms: default_hot_timeout_ms(),
            durable_timeout_ms: default_durable_timeout_ms(),
            persist_retries: default_persist_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct QuoteConfig {
    /// Server-side HMAC key for quote signatures
    #[serde(default)]
    pub signing_key: String,
}

fn default_beta() -> f64 {
    5.0
}
fn default_alpha() -> f64 {
    0.6
}
fn default_max_rounds() -> u32 {
    15
}
fn default_session_ttl_seconds() -> u64 {
    300
}
fn default_min_response_delay_ms() -> u64 {
    2_000
}
fn default_quote_ttl_seconds() -> u64 {
    60
}
fn default_zopa_epsilon_pct() -> f64 {
    0.01
}
fn default_start_rate_per_minute() -> u32 {
    30
}
fn default_lock_lease_ms() -> u64 {
    5_000
}
fn default_metrics_port() -> u16 {
    9_090
}
fn default_llm_timeout_ms() -> u64 {
    8_000
}
fn default_hot_url() -> String {
    "memory://".to_string()
}
fn default_durable_url() -> String {
    "sqlite::memory:".to_string()
}
fn default_hot_timeout_ms() -> u64 {
    150
}
fn default_durable_timeout_ms() -> u64 {
    500
}
fn default_persist_retries() -> u32 {
    3
}

impl AppConfig {
    /// Build from the flat environment variables the deployment surface uses
    /// (`DEFAULT_BETA`, `MIN_RESPONSE_DELAY_MS`, `ENV`, ...). Unset variables
    /// keep their defaults; set-but-malformed values are rejected.
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = AppConfig::default();

        read_env("DEFAULT_BETA", &mut cfg.negotiation.beta)?;
        read_env("DEFAULT_ALPHA", &mut cfg.negotiation.alpha)?;
        read_env("DEFAULT_MAX_ROUNDS", &mut cfg.negotiation.max_rounds)?;
        read_env(
            "DEFAULT_SESSION_TTL_SECONDS",
            &mut cfg.negotiation.session_ttl_seconds,
        )?;
        read_env(
            "MIN_RESPONSE_DELAY_MS",
            &mut cfg.negotiation.min_response_delay_ms,
        )?;
        read_env("QUOTE_TTL_SECONDS", &mut cfg.negotiation.quote_ttl_seconds)?;

        if let Ok(value) = std::env::var("ENV") {
            cfg.server.env = match value.as_str() {
                "development" => Environment::Development,
                "production" => Environment::Production,
                other => {
                    return Err(crate::ConfigError::Validation(format!(
                        "ENV must be development or production, got {other}"
                    )))
                }
            };
        }
        if let Ok(value) = std::env::var("API_ADMIN_KEY") {
            cfg.server.api_admin_key = Some(value);
        }
        if let Ok(value) = std::env::var("CORS_ALLOWED_ORIGINS") {
            cfg.server.cors_allowed_origins =
                value.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(value) = std::env::var("LLM_ENDPOINT") {
            cfg.llm.endpoint = value;
            cfg.llm.enabled = true;
        }
        if let Ok(value) = std::env::var("LLM_API_KEY") {
            cfg.llm.api_key = value;
        }
        if let Ok(value) = std::env::var("LLM_MODEL") {
            cfg.llm.model = value;
        }

        if let Ok(value) = std::env::var("HOT_STORE_URL") {
            cfg.stores.hot_url = value;
        }
        if let Ok(value) = std::env::var("DURABLE_STORE_URL") {
            cfg.stores.durable_url = value;
        }
        if let Ok(value) = std::env::var("QUOTE_SIGNING_KEY") {
            cfg.quote.signing_key = value;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) -> crate::Result<()> {
    if let Ok(value) = std::env::var(name) {
        *slot = value.parse().map_err(|_| {
            crate::ConfigError::Validation(format!("{name} is not a valid value: {value}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.negotiation.beta, 5.0);
        assert_eq!(cfg.negotiation.alpha, 0.6);
        assert_eq!(cfg.negotiation.max_rounds, 15);
        assert_eq!(cfg.negotiation.session_ttl_seconds, 300);
        assert_eq!(cfg.negotiation.min_response_delay_ms, 2_000);
        assert_eq!(cfg.negotiation.quote_ttl_seconds, 60);
        assert_eq!(cfg.server.env, Environment::Development);
        assert_eq!(cfg.stores.hot_timeout_ms, 150);
        assert_eq!(cfg.stores.durable_timeout_ms, 500);
        assert_eq!(cfg.llm.timeout_ms, 8_000);
    }

    #[test]
    fn test_environment_wire_form() {
        assert_eq!(
            serde_json::to_string(&Environment::Production).unwrap(),
            "\"production\""
        );
    }
}
