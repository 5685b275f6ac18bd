//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        let cfg: AppConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        let cfg: AppConfig = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        let cfg: AppConfig = serde_json::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `MOL_BHAV_`-prefixed environment variables
    ///
    /// Variables take the form PREFIX_SECTION_KEY, e.g.
    /// MOL_BHAV_NEGOTIATION_BETA=7.5
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        let cfg: AppConfig = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Merge two configurations, with overlay taking precedence
    pub fn merge(base: AppConfig, overlay: AppConfig) -> AppConfig {
        AppConfig {
            negotiation: overlay.negotiation,
            server: overlay.server,
            llm: overlay.llm,
            stores: overlay.stores,
            quote: if overlay.quote.signing_key.is_empty() {
                base.quote
            } else {
                overlay.quote
            },
        }
    }

    /// Load configuration from file with environment variable overrides
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        let file_config = Self::from_file(path)?;

        match Self::from_env_with_prefix(env_prefix) {
            Ok(env_config) => Ok(Self::merge(file_config, env_config)),
            Err(_) => Ok(file_config),
        }
    }

    /// Build configuration using the config crate's builder pattern
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

/// Builder for layered configuration loading
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self
            .builder
            .add_source(Environment::with_prefix(prefix).separator("_"));
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.builder.build()?;
        let cfg: AppConfig = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [negotiation]
            beta = 7.0
            alpha = 0.5
            max_rounds = 12

            [server]
            env = "production"
            api_admin_key = "sekrit"

            [llm]
            enabled = true
            endpoint = "http://localhost:8080/v1/chat/completions"
            model = "bazaar-small"

            [stores]
            durable_url = "sqlite:/var/lib/molbhav/audit.db"

            [quote]
            signing_key = "server-side-secret"
        "#;

        let cfg = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(cfg.negotiation.beta, 7.0);
        assert_eq!(cfg.negotiation.max_rounds, 12);
        // Unlisted keys keep their defaults
        assert_eq!(cfg.negotiation.session_ttl_seconds, 300);
        assert_eq!(cfg.server.env, crate::Environment::Production);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
negotiation:
  beta: 3.0
  start_rate_per_minute: 10

llm:
  enabled: false
"#;

        let cfg = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(cfg.negotiation.beta, 3.0);
        assert_eq!(cfg.negotiation.start_rate_per_minute, 10);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "negotiation": { "alpha": 0.8 },
  "stores": { "persist_retries": 5 }
}
        "#;

        let cfg = ConfigLoader::from_json(json).unwrap();
        assert_eq!(cfg.negotiation.alpha, 0.8);
        assert_eq!(cfg.stores.persist_retries, 5);
    }

    #[test]
    fn test_load_from_file() {
        let toml = r#"
[negotiation]
max_rounds = 20
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let cfg = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(cfg.negotiation.max_rounds, 20);
    }

    #[test]
    fn test_invalid_values_rejected_at_load() {
        let toml = r#"
[negotiation]
alpha = 1.5
        "#;
        assert!(ConfigLoader::from_toml(toml).is_err());
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = ConfigLoader::from_toml("[quote]\nsigning_key = \"base-key\"").unwrap();
        let mut overlay = AppConfig::default();
        overlay.negotiation.beta = 2.0;

        let merged = ConfigLoader::merge(base, overlay);
        assert_eq!(merged.negotiation.beta, 2.0);
        // Overlay had no signing key; the base one survives
        assert_eq!(merged.quote.signing_key, "base-key");
    }
}
