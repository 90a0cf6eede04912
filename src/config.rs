use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Gamma API base URL for market discovery
    pub base_url: String,
    /// Page size for event/market listings
    pub page_limit: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gamma-api.polymarket.com".to_string(),
            page_limit: 100,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// OpenAI-compatible chat-completions gateway base URL
    pub base_url: String,
    /// Model identifier (e.g. "openai/gpt-4o-mini")
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Max tokens to generate per response
    pub max_tokens: u32,
    /// Timeout for reasoning-service responses in seconds
    pub timeout_secs: u64,
    /// Maximum retries inside the client on a failed request
    pub max_retries: u8,
    /// Environment variable holding the gateway API key
    pub api_key_env: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.blockrun.xyz/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout_secs: 120,
            max_retries: 2,
            api_key_env: "LLM_GATEWAY_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    /// NewsAPI base URL
    pub base_url: String,
    /// Environment variable holding the NewsAPI key
    pub api_key_env: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".to_string(),
            api_key_env: "NEWSAPI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Bounded liveness timeout for connect and acquire, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/polyagent".to_string(),
            max_connections: 5,
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum pipeline attempts before the run is recorded as failed for good
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts, in milliseconds
    pub backoff_base_ms: u64,
    /// Local retrieval-snapshot directories cleared before each trade run
    pub cache_dirs: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 1000,
            cache_dirs: vec![
                "local_db_events".to_string(),
                "local_db_markets".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Delay before re-running after the given 1-based attempt number.
    pub fn backoff(&self, attempt: u32) -> std::time::Duration {
        let exp = attempt.saturating_sub(1).min(6);
        std::time::Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << exp))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Submit orders for the selected trade. Off by default: the decision is
    /// still made and recorded, the order is not placed.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific config (e.g. config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("POLYAGENT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (POLYAGENT_STORE__URL, etc.)
            .add_source(
                Environment::with_prefix("POLYAGENT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.pipeline.max_attempts == 0 {
            errors.push("pipeline.max_attempts must be at least 1".to_string());
        }

        if !(0.0..=2.0).contains(&self.agent.temperature) {
            errors.push("agent.temperature must be between 0 and 2".to_string());
        }

        if self.agent.max_tokens == 0 {
            errors.push("agent.max_tokens must be positive".to_string());
        }

        if self.store.max_connections == 0 {
            errors.push("store.max_connections must be at least 1".to_string());
        }

        if self.store.connect_timeout_ms == 0 {
            errors.push("store.connect_timeout_ms must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig {
            feed: FeedConfig::default(),
            agent: AgentConfig::default(),
            news: NewsConfig::default(),
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backoff_grows_and_saturates() {
        let pipeline = PipelineConfig {
            backoff_base_ms: 100,
            ..Default::default()
        };
        assert_eq!(pipeline.backoff(1).as_millis(), 100);
        assert_eq!(pipeline.backoff(2).as_millis(), 200);
        assert_eq!(pipeline.backoff(3).as_millis(), 400);
        // Exponent is capped so huge attempt numbers do not overflow
        assert_eq!(pipeline.backoff(40).as_millis(), 100 * 64);
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = AppConfig {
            pipeline: PipelineConfig {
                max_attempts: 0,
                ..Default::default()
            },
            feed: FeedConfig::default(),
            agent: AgentConfig::default(),
            news: NewsConfig::default(),
            store: StoreConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_attempts")));
    }
}
