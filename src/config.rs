//! Configuration types for the support assistant

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Model configuration for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    /// Temperature for sampling (0.0-2.0)
    pub temperature: f32,
    /// Maximum tokens for completion
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    /// Create a new model configuration
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// OpenRouter client configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key (loaded from environment variable)
    pub api_key: SecretString,
    /// Base URL for OpenRouter API
    pub base_url: Url,
    /// Default model for agents
    pub default_model: String,
    /// Request timeout
    pub timeout: Duration,
    /// App name for OpenRouter tracking
    pub app_name: String,
}

impl OpenRouterConfig {
    /// Create a new OpenRouter configuration from environment
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up OPENROUTER_API_KEY
        let _ = dotenv();

        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| Error::config("OPENROUTER_API_KEY environment variable not set"))?;

        let default_model = std::env::var("TUNEDESK_MODEL")
            .unwrap_or_else(|_| presets::BALANCED.to_string());

        Ok(Self::new(api_key).with_default_model(default_model))
    }

    /// Create a new OpenRouter configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: Url::parse("https://openrouter.ai/api/v1").expect("valid OpenRouter URL"),
            default_model: presets::BALANCED.to_string(),
            timeout: Duration::from_secs(120),
            app_name: "tunedesk support assistant".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the default model
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Where the store dataset comes from at startup.
///
/// The dataset is read-only reference data; whichever source is used, the
/// loaded store must pass [`crate::catalog::CatalogStore::verify`] before
/// the assistant accepts traffic.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// An existing SQLite database file on disk
    SqliteFile(PathBuf),
    /// A local SQL dump executed into an in-memory database
    SqlScript(PathBuf),
    /// A SQL dump fetched over HTTP and executed into an in-memory database
    DownloadSql(Url),
}

/// Dataset configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Dataset source
    pub source: CatalogSource,
}

impl CatalogConfig {
    /// Canonical URL of the Chinook sample database SQL dump
    pub const CHINOOK_SQL_URL: &'static str =
        "https://raw.githubusercontent.com/lerocha/chinook-database/master/ChinookDatabase/DataSources/Chinook_Sqlite.sql";

    /// Resolve the dataset source from environment variables.
    ///
    /// `TUNEDESK_DB` may name a `.sqlite`/`.db` file or a `.sql` dump;
    /// unset, the Chinook dump is downloaded.
    pub fn from_env() -> Self {
        let _ = dotenv();

        let source = match std::env::var("TUNEDESK_DB") {
            Ok(path) if path.ends_with(".sql") => CatalogSource::SqlScript(PathBuf::from(path)),
            Ok(path) => CatalogSource::SqliteFile(PathBuf::from(path)),
            Err(_) => CatalogSource::DownloadSql(
                Url::parse(Self::CHINOOK_SQL_URL).expect("valid Chinook URL"),
            ),
        };

        Self { source }
    }
}

/// Recommended model configurations
pub mod presets {
    /// Recommended for complex reasoning tasks
    pub const REASONING: &str = "anthropic/claude-sonnet-4";

    /// Balanced performance and cost
    pub const BALANCED: &str = "openai/gpt-4o-mini";

    /// Fast responses, lower cost
    pub const FAST: &str = "openai/gpt-4o-mini";

    /// Free tier model
    pub const FREE_TIER: &str = "meta-llama/llama-3.3-70b-instruct:free";
}
