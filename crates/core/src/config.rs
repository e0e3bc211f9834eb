use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADPORTAL__` and an optional `adportal.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "adportal-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

// ─── Platform Config ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformsConfig {
    /// Per-call deadline applied to every outbound platform request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub tiktok: TiktokConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_meta_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_meta_api_version")]
    pub api_version: String,
}

#[derive(Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_ads_url")]
    pub ads_url: String,
    #[serde(default = "default_google_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub developer_token: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("ads_url", &self.ads_url)
            .field("api_version", &self.api_version)
            .field("developer_token", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiktokConfig {
    #[serde(default = "default_tiktok_base_url")]
    pub base_url: String,
}

fn default_request_timeout_ms() -> u64 { 30_000 }
fn default_meta_graph_url() -> String { "https://graph.facebook.com".to_string() }
fn default_meta_api_version() -> String { "v18.0".to_string() }
fn default_google_ads_url() -> String { "https://googleads.googleapis.com".to_string() }
fn default_google_api_version() -> String { "v17".to_string() }
fn default_google_token_url() -> String { "https://oauth2.googleapis.com/token".to_string() }
fn default_tiktok_base_url() -> String {
    "https://business-api.tiktok.com/open_api/v1.3".to_string()
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            meta: MetaConfig::default(),
            google: GoogleConfig::default(),
            tiktok: TiktokConfig::default(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            graph_url: default_meta_graph_url(),
            api_version: default_meta_api_version(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            ads_url: default_google_ads_url(),
            api_version: default_google_api_version(),
            developer_token: String::new(),
            token_url: default_google_token_url(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl Default for TiktokConfig {
    fn default() -> Self {
        Self {
            base_url: default_tiktok_base_url(),
        }
    }
}

// ─── Fan-out Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Look the object up by name before retrying a timed-out create.
    #[serde(default = "default_reconcile_on_timeout")]
    pub reconcile_on_timeout: bool,
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 10_000 }
fn default_backoff_multiplier() -> f64 { 2.0 }
fn default_jitter() -> bool { true }
fn default_reconcile_on_timeout() -> bool { true }

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
            reconcile_on_timeout: default_reconcile_on_timeout(),
        }
    }
}

// ─── Analytics Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_analytics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ingest_interval_secs")]
    pub ingest_interval_secs: u64,
}

fn default_analytics_enabled() -> bool { true }
fn default_ingest_interval_secs() -> u64 { 3600 }

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_analytics_enabled(),
            ingest_interval_secs: default_ingest_interval_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            platforms: PlatformsConfig::default(),
            fanout: FanoutConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("adportal").required(false))
            .add_source(
                config::Environment::with_prefix("ADPORTAL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
