use crate::models::{DiversityCaps, ScoringWeights};
use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub supabase: SupabaseSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub social: SocialSettings,
    #[serde(default)]
    pub badges: BadgeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_products_table")]
    pub products_table: String,
    #[serde(default = "default_dispensaries_table")]
    pub dispensaries_table: String,
}

fn default_timeout_secs() -> u64 { 10 }
fn default_products_table() -> String { "products".to_string() }
fn default_dispensaries_table() -> String { "dispensaries".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Without a Redis URL only the in-process tier is used
    pub redis_url: Option<String>,
    pub l1_cache_size: Option<u64>,
    /// How long the last good catalog is kept as a fallback
    pub catalog_ttl_secs: Option<u64>,
    pub preferences_ttl_secs: Option<u64>,
    pub badges_ttl_secs: Option<u64>,
}

impl CacheSettings {
    pub fn preferences_ttl(&self) -> u64 {
        self.preferences_ttl_secs.unwrap_or(1800)
    }

    pub fn catalog_ttl(&self) -> u64 {
        self.catalog_ttl_secs.unwrap_or(86_400)
    }

    pub fn badges_ttl(&self) -> u64 {
        self.badges_ttl_secs.unwrap_or(300)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_feed_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Rows pulled from the database per request, before filtering and caps
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default)]
    pub caps: CapsConfig,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_max_limit(),
            fetch_limit: default_fetch_limit(),
            caps: CapsConfig::default(),
        }
    }
}

fn default_feed_limit() -> usize { 50 }
fn default_max_limit() -> usize { 200 }
fn default_fetch_limit() -> usize { 1000 }

/// Diversity caps; 0 disables a check
#[derive(Debug, Clone, Deserialize)]
pub struct CapsConfig {
    #[serde(default = "default_per_dispensary")]
    pub per_dispensary: usize,
    #[serde(default = "default_per_chain")]
    pub per_chain: usize,
    #[serde(default = "default_per_brand_per_category")]
    pub per_brand_per_category: usize,
    #[serde(default = "default_per_brand_total")]
    pub per_brand_total: usize,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            per_dispensary: default_per_dispensary(),
            per_chain: default_per_chain(),
            per_brand_per_category: default_per_brand_per_category(),
            per_brand_total: default_per_brand_total(),
        }
    }
}

fn default_per_dispensary() -> usize { 5 }
fn default_per_chain() -> usize { 8 }
fn default_per_brand_per_category() -> usize { 2 }
fn default_per_brand_total() -> usize { 4 }

impl From<&CapsConfig> for DiversityCaps {
    fn from(caps: &CapsConfig) -> Self {
        Self {
            per_dispensary: caps.per_dispensary,
            per_chain: caps.per_chain,
            per_brand_per_category: caps.per_brand_per_category,
            per_brand_total: caps.per_brand_total,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_category_weight")]
    pub category: f64,
    #[serde(default = "default_price_weight")]
    pub price: f64,
    #[serde(default = "default_discount_weight")]
    pub discount: f64,
    #[serde(default = "default_brand_weight")]
    pub brand: f64,
    #[serde(default = "default_dispensary_weight")]
    pub dispensary: f64,
    #[serde(default = "default_recency_weight")]
    pub recency: f64,
    #[serde(default = "default_popularity_weight")]
    pub popularity: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            category: default_category_weight(),
            price: default_price_weight(),
            discount: default_discount_weight(),
            brand: default_brand_weight(),
            dispensary: default_dispensary_weight(),
            recency: default_recency_weight(),
            popularity: default_popularity_weight(),
        }
    }
}

fn default_category_weight() -> f64 { 25.0 }
fn default_price_weight() -> f64 { 15.0 }
fn default_discount_weight() -> f64 { 15.0 }
fn default_brand_weight() -> f64 { 20.0 }
fn default_dispensary_weight() -> f64 { 10.0 }
fn default_recency_weight() -> f64 { 10.0 }
fn default_popularity_weight() -> f64 { 5.0 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(weights: &WeightsConfig) -> Self {
        Self {
            category: weights.category,
            price: weights.price,
            discount: weights.discount,
            brand: weights.brand,
            dispensary: weights.dispensary,
            recency: weights.recency,
            popularity: weights.popularity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialSettings {
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self { site_url: default_site_url() }
    }
}

fn default_site_url() -> String { "https://clouded.deals".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct BadgeSettings {
    /// Offset from UTC where streak and challenge days roll over
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self { utc_offset_minutes: default_utc_offset_minutes() }
    }
}

impl BadgeSettings {
    /// Out-of-range offsets fall back to UTC
    pub fn day_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

// Las Vegas standard time
fn default_utc_offset_minutes() -> i32 { -480 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with CLOUDED__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., CLOUDED__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CLOUDED")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CLOUDED")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn diversity_caps(&self) -> DiversityCaps {
        DiversityCaps::from(&self.feed.caps)
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }
}

/// Apply the conventional hosting variables (`DATABASE_URL`, `SUPABASE_URL`,
/// `SUPABASE_KEY`) on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let database_url = env::var("DATABASE_URL").ok();
    let supabase_url = env::var("SUPABASE_URL").ok();
    let supabase_key = env::var("SUPABASE_KEY")
        .or_else(|_| env::var("SUPABASE_ANON_KEY"))
        .ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }
    if let Some(url) = supabase_url {
        builder = builder.set_override("supabase.url", url)?;
    }
    if let Some(key) = supabase_key {
        builder = builder.set_override("supabase.api_key", key)?;
    }

    builder.build()
}
