use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

const DEFAULT_MIN_HISTORY_DAILY: usize = 90;
const DEFAULT_MIN_HISTORY_WEEKLY: usize = 12;
const DEFAULT_HOLDOUT_MAX: usize = 30;
const DEFAULT_MAPE_THRESHOLD: f64 = 0.3;
const DEFAULT_HORIZON_PERIODS: usize = 7;
const DEFAULT_LEAD_TIME_DAYS: u32 = 7;
const DEFAULT_MAX_LEAD_TIME_DAYS: u32 = 30;
const DEFAULT_MAX_CONCURRENT_SKUS: usize = 8;
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 300;

/// Forecasting pipeline configuration.
///
/// The defaults are the documented model constants; overriding them via
/// `APP__FORECAST__*` is an operational escape hatch, not a tuning surface.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    /// Minimum series length for a SKU modeled at daily cadence.
    #[serde(default = "default_min_history_daily")]
    pub min_history_daily: usize,

    /// Minimum series length for a SKU modeled at weekly cadence.
    #[serde(default = "default_min_history_weekly")]
    pub min_history_weekly: usize,

    /// Upper bound on the trailing validation holdout, in periods.
    #[serde(default = "default_holdout_max")]
    pub holdout_max: usize,

    /// Holdout MAPE at or below which the seasonal model is accepted
    /// without consulting the fallbacks.
    #[serde(default = "default_mape_threshold")]
    #[validate(range(min = 0.01, max = 1.0))]
    pub mape_threshold: f64,

    /// Number of periods forecast ahead at the detected cadence.
    #[serde(default = "default_horizon_periods")]
    #[validate(range(min = 1, max = 90))]
    pub horizon_periods: usize,

    /// Lead time assumed when the caller does not supply one.
    #[serde(default = "default_lead_time_days")]
    #[validate(range(min = 1, max = 30))]
    pub default_lead_time_days: u32,

    /// Largest caller-supplied lead time accepted by predict/demo.
    #[serde(default = "default_max_lead_time_days")]
    #[validate(range(min = 1, max = 90))]
    pub max_lead_time_days: u32,

    /// Bound on concurrently processed SKUs within one batch.
    #[serde(default = "default_max_concurrent_skus")]
    #[validate(range(min = 1, max = 256))]
    pub max_concurrent_skus: usize,

    /// Batch deadline; when it fires, completed per-SKU results are
    /// returned with a cancelled-early flag.
    #[serde(default = "default_batch_timeout_secs")]
    #[validate(range(min = 1))]
    pub batch_timeout_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_history_daily: DEFAULT_MIN_HISTORY_DAILY,
            min_history_weekly: DEFAULT_MIN_HISTORY_WEEKLY,
            holdout_max: DEFAULT_HOLDOUT_MAX,
            mape_threshold: DEFAULT_MAPE_THRESHOLD,
            horizon_periods: DEFAULT_HORIZON_PERIODS,
            default_lead_time_days: DEFAULT_LEAD_TIME_DAYS,
            max_lead_time_days: DEFAULT_MAX_LEAD_TIME_DAYS,
            max_concurrent_skus: DEFAULT_MAX_CONCURRENT_SKUS,
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
        }
    }
}

impl ForecastConfig {
    /// Minimum-history threshold at the given cadence.
    pub fn min_history(&self, cadence: crate::models::Cadence) -> usize {
        match cadence {
            crate::models::Cadence::Daily => self.min_history_daily,
            crate::models::Cadence::Weekly => self.min_history_weekly,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Forecasting pipeline configuration
    #[serde(default)]
    #[validate]
    pub forecast: ForecastConfig,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_min_history_daily() -> usize {
    DEFAULT_MIN_HISTORY_DAILY
}

fn default_min_history_weekly() -> usize {
    DEFAULT_MIN_HISTORY_WEEKLY
}

fn default_holdout_max() -> usize {
    DEFAULT_HOLDOUT_MAX
}

fn default_mape_threshold() -> f64 {
    DEFAULT_MAPE_THRESHOLD
}

fn default_horizon_periods() -> usize {
    DEFAULT_HORIZON_PERIODS
}

fn default_lead_time_days() -> u32 {
    DEFAULT_LEAD_TIME_DAYS
}

fn default_max_lead_time_days() -> u32 {
    DEFAULT_MAX_LEAD_TIME_DAYS
}

fn default_max_concurrent_skus() -> usize {
    DEFAULT_MAX_CONCURRENT_SKUS
}

fn default_batch_timeout_secs() -> u64 {
    DEFAULT_BATCH_TIMEOUT_SECS
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initialize the tracing subscriber from the configured level and format.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("stocksight_forecast={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Load configuration from built-in defaults, optional files under
/// `config/`, and `APP__`-prefixed environment variables (in that order).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    Ok(app_config)
}
