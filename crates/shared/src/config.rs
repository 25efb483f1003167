//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Accrual oracle configuration.
    pub accrual: AccrualConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Full `host:port` address; takes precedence over `host` and `port`.
    #[serde(default)]
    pub address: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            address: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Returns the socket address the server should bind to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Timeout for opening or acquiring a connection, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    5
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    3600 // 1 hour
}

/// Accrual oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualConfig {
    /// Base URL of the accrual service, e.g. `http://localhost:8081`.
    pub base_url: String,
    /// Pause between two polling cycles, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Pause after the oracle reports an order it does not know yet, in seconds.
    #[serde(default = "default_no_content_delay")]
    pub no_content_delay_secs: u64,
    /// Backoff used when a 429 arrives without a usable `Retry-After`, in seconds.
    #[serde(default = "default_retry_after")]
    pub default_retry_after_secs: u64,
    /// Timeout for a single oracle request, in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_no_content_delay() -> u64 {
    1
}

fn default_retry_after() -> u64 {
    60
}

fn default_oracle_timeout() -> u64 {
    10
}

/// Values supplied on the command line, applied on top of files and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Overrides `server.address`.
    pub server_address: Option<String>,
    /// Overrides `database.url`.
    pub database_url: Option<String>,
    /// Overrides `accrual.base_url`.
    pub accrual_base_url: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_overrides(ConfigOverrides::default())
    }

    /// Loads configuration, then applies command-line overrides.
    ///
    /// Sources in increasing priority: `config/default`, `config/{RUN_MODE}`,
    /// `LOYALTY__*` environment variables, `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load_with_overrides(overrides: ConfigOverrides) -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LOYALTY").separator("__"))
            .set_override_option("server.address", overrides.server_address)?
            .set_override_option("database.url", overrides.database_url)?
            .set_override_option("accrual.base_url", overrides.accrual_base_url)?
            .build()?;

        config.try_deserialize()
    }
}
