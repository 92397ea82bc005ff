use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub rezdy_api_key: Option<String>,
    pub rezdy_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub rate_min_interval_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_stale_after_secs: u64,
    pub analytics_capacity: usize,
    pub filter_max_concurrency: usize,
    pub memo_ttl_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("database_url", &"[redacted]")
            .field(
                "rezdy_api_key",
                &self.rezdy_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("rezdy_base_url", &self.rezdy_base_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("rate_min_interval_ms", &self.rate_min_interval_ms)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_stale_after_secs", &self.cache_stale_after_secs)
            .field("analytics_capacity", &self.analytics_capacity)
            .field("filter_max_concurrency", &self.filter_max_concurrency)
            .field("memo_ttl_secs", &self.memo_ttl_secs)
            .finish()
    }
}
