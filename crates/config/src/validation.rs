//! Range checks applied to every loaded configuration

use crate::{AppConfig, ConfigError, Environment, Result};

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let n = &self.negotiation;

        if n.beta <= 0.0 || !n.beta.is_finite() {
            return Err(invalid("negotiation.beta must be a positive finite number"));
        }
        if !(0.0..=1.0).contains(&n.alpha) {
            return Err(invalid("negotiation.alpha must be within [0, 1]"));
        }
        if n.max_rounds < 2 {
            return Err(invalid("negotiation.max_rounds must be at least 2"));
        }
        if n.session_ttl_seconds == 0 {
            return Err(invalid("negotiation.session_ttl_seconds must be positive"));
        }
        if !(0.0..=0.2).contains(&n.zopa_epsilon_pct) {
            return Err(invalid("negotiation.zopa_epsilon_pct must be within [0, 0.2]"));
        }
        if n.start_rate_per_minute == 0 {
            return Err(invalid("negotiation.start_rate_per_minute must be positive"));
        }
        if n.lock_lease_ms == 0 {
            return Err(invalid("negotiation.lock_lease_ms must be positive"));
        }

        if self.llm.enabled {
            if self.llm.endpoint.is_empty() {
                return Err(invalid("llm.endpoint required when llm.enabled"));
            }
            if self.llm.model.is_empty() {
                return Err(invalid("llm.model required when llm.enabled"));
            }
        }

        if self.stores.persist_retries == 0 {
            return Err(invalid("stores.persist_retries must be at least 1"));
        }

        if self.server.env == Environment::Production {
            if self.quote.signing_key.is_empty() {
                return Err(invalid("quote.signing_key required in production"));
            }
            if self.server.api_admin_key.is_none() {
                return Err(invalid("server.api_admin_key required in production"));
            }
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_alpha_range() {
        let mut cfg = AppConfig::default();
        cfg.negotiation.alpha = 1.2;
        assert!(cfg.validate().is_err());

        cfg.negotiation.alpha = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_beta_positive() {
        let mut cfg = AppConfig::default();
        cfg.negotiation.beta = 0.0;
        assert!(cfg.validate().is_err());

        cfg.negotiation.beta = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_llm_requires_endpoint_when_enabled() {
        let mut cfg = AppConfig::default();
        cfg.llm.enabled = true;
        assert!(cfg.validate().is_err());

        cfg.llm.endpoint = "http://localhost:1234".to_string();
        cfg.llm.model = "bazaar-small".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secrets() {
        let mut cfg = AppConfig::default();
        cfg.server.env = Environment::Production;
        assert!(cfg.validate().is_err());

        cfg.quote.signing_key = "k".to_string();
        assert!(cfg.validate().is_err());

        cfg.server.api_admin_key = Some("admin".to_string());
        assert!(cfg.validate().is_ok());
    }
}
