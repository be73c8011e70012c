use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "BDT";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Payment gateway (SSLCommerz-style session API) configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Store identifier issued by the gateway
    #[serde(default)]
    pub store_id: String,

    /// Store passphrase issued by the gateway
    #[serde(default)]
    pub store_pass: String,

    /// Use the gateway sandbox environment
    #[serde(default = "default_true")]
    pub sandbox: bool,

    /// Explicit session endpoint override. When unset the endpoint is
    /// derived from the sandbox flag.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// ISO currency code sent with every session request
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            store_pass: String::new(),
            sandbox: true,
            endpoint: None,
            currency: default_currency(),
        }
    }
}

impl GatewayConfig {
    /// Resolved session-creation endpoint.
    pub fn session_endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }
        if self.sandbox {
            "https://sandbox.sslcommerz.com/gwprocess/v4/api.php".to_string()
        } else {
            "https://securepay.sslcommerz.com/gwprocess/v4/api.php".to_string()
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key used to verify bearer tokens
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime environment: development, test, or production
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Run migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Maximum database connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Minimum database connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Comma-separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Public base URL of this API, used to build gateway callback URLs
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Front-end base URL, used for post-payment redirects
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Payment gateway settings
    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,
}

fn default_jwt_expiration() -> usize {
    3600
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_true() -> bool {
    true
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling; everything else takes
    /// its default.
    pub fn new(database_url: String, jwt_secret: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration: default_jwt_expiration(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            cors_allowed_origins: None,
            backend_url: default_backend_url(),
            frontend_url: default_frontend_url(),
            gateway: GatewayConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Success/fail/cancel callback URLs handed to the gateway.
    pub fn callback_url(&self, outcome: &str) -> String {
        format!("{}/api/v1/payment/{}/", self.backend_url, outcome)
    }

    /// Post-payment redirect target on the front end.
    pub fn orders_page_url(&self) -> String {
        format!("{}/dashboard/orders/", self.frontend_url)
    }
}

/// Loads configuration from layered sources: `config/default`, the
/// per-environment file, and `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    // Development convenience only; production must configure a real secret.
    if environment == DEFAULT_ENV && env::var("APP__JWT_SECRET").is_err() {
        builder = builder.set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;
    }

    let config: AppConfig = builder.build()?.try_deserialize()?;

    config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    Ok(config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("bloomshop_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive).unwrap_or_else(|_| EnvFilter::new("info"));

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
