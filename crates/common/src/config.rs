//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Voting rules.
    #[serde(default)]
    pub votes: VoteConfig,
    /// Listing defaults.
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://...` or `sqlite://...`).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait when opening or acquiring a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds an idle pooled connection is kept.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Log every SQL statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// Token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

/// Voting configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteConfig {
    /// Reject votes cast by the author of the target.
    #[serde(default)]
    pub forbid_self_vote: bool,
}

/// Meme listing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Page size used when the request omits `limit`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Upper bound for `limit`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_idle_timeout_secs() -> u64 {
    300
}

const fn default_token_ttl_hours() -> i64 {
    24
}

const fn default_page_size() -> u64 {
    10
}

const fn default_max_page_size() -> u64 {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MUSEUM_ENV`)
    /// 4. Environment variables with `MUSEUM__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("MUSEUM_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MUSEUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_sources(&config)
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MUSEUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_sources(&config)
    }

    fn from_sources(sources: &config::Config) -> Result<Self, config::ConfigError> {
        let config: Self = sources.clone().try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that deserialize but cannot run.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(config::ConfigError::Message(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }
        if self.listing.max_page_size == 0
            || self.listing.default_page_size == 0
            || self.listing.default_page_size > self.listing.max_page_size
        {
            return Err(config::ConfigError::Message(
                "listing.default_page_size must be between 1 and listing.max_page_size"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
