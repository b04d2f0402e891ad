use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Admin secret used when neither the config file nor the environment sets one.
pub const DEFAULT_ADMIN_SECRET: &str = "alter-lily-admin";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_analytics_file")]
    pub analytics_file: String,
    #[serde(default = "default_newsletter_file")]
    pub newsletter_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            analytics_file: default_analytics_file(),
            newsletter_file: default_newsletter_file(),
        }
    }
}

impl StorageConfig {
    pub fn analytics_path(&self) -> PathBuf {
        self.data_dir.join(&self.analytics_file)
    }

    pub fn newsletter_path(&self) -> PathBuf {
        self.data_dir.join(&self.newsletter_file)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_analytics_file() -> String {
    "analytics.json".to_string()
}
fn default_newsletter_file() -> String {
    "newsletter.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Maximum retained length of each event sequence.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Number of raw pageviews / clicks returned in the stats report.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}
fn default_recent_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_max_payload_bytes() -> usize {
    16 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_admin_secret")]
    pub admin_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_secret: default_admin_secret(),
        }
    }
}

fn default_admin_secret() -> String {
    DEFAULT_ADMIN_SECRET.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Seconds it takes to replenish one request of the burst (tower_governor semantics).
    #[serde(default = "default_per_second")]
    pub per_second: u64,
    /// Requests a client may send back to back before being throttled.
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}
fn default_per_second() -> u64 {
    1
}
fn default_burst_size() -> u32 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_posts_dir")]
    pub posts_dir: PathBuf,
    #[serde(default = "default_author")]
    pub default_author: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_render_cache_capacity")]
    pub render_cache_capacity: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            default_author: default_author(),
            default_category: default_category(),
            excerpt_chars: default_excerpt_chars(),
            render_cache_capacity: default_render_cache_capacity(),
        }
    }
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("content/posts")
}
fn default_author() -> String {
    "Veducko".to_string()
}
fn default_category() -> String {
    "Development Updates".to_string()
}
fn default_excerpt_chars() -> usize {
    160
}
fn default_render_cache_capacity() -> u64 {
    512
}

impl AppConfig {
    /// Validate the loaded configuration.
    ///
    /// An empty admin secret is rejected; the built-in fallback is accepted with a warning.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.admin_secret.is_empty() {
            return Err("auth.admin_secret must not be empty. \
                 Set it in config.toml, via ALTERLILY__AUTH__ADMIN_SECRET or ADMIN_PASSWORD."
                .to_string());
        }
        if self.auth.admin_secret == DEFAULT_ADMIN_SECRET {
            tracing::warn!("auth.admin_secret is the built-in default; set ADMIN_PASSWORD in production");
        }
        if self.analytics.max_entries == 0 {
            return Err("analytics.max_entries must be greater than zero".to_string());
        }
        if self.rate_limit.enabled && (self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0) {
            return Err("rate_limit.per_second and rate_limit.burst_size must be non-zero".to_string());
        }
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // Load from config file
        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (ALTERLILY__SERVER__PORT=3001, etc.)
        builder = builder.add_source(
            Environment::with_prefix("ALTERLILY")
                .separator("__")
                .try_parsing(true),
        );

        // The site has always read the admin secret from ADMIN_PASSWORD
        builder = builder.set_override_option(
            "auth.admin_secret",
            std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        )?;

        builder.build()?.try_deserialize()
    }
}
