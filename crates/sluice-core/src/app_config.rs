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
    /// Root of the `raw/` and `processed/` archives.
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub api_base_url: String,
    pub api_timeout_secs: u64,
    pub api_max_retries: u32,
    pub api_retry_backoff_base_ms: u64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Six-field cron expression; the scheduled pipeline job is disabled when `None`.
    pub pipeline_schedule: Option<String>,
    pub engagement_top_n: i64,
}

impl AppConfig {
    /// Scheme portion of `database_url`, safe to print.
    #[must_use]
    pub fn database_scheme(&self) -> &str {
        self.database_url
            .split_once(':')
            .map_or("unknown", |(scheme, _)| scheme)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("data_dir", &self.data_dir)
            .field("reports_dir", &self.reports_dir)
            .field("api_base_url", &self.api_base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_max_retries", &self.api_max_retries)
            .field("api_retry_backoff_base_ms", &self.api_retry_backoff_base_ms)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("pipeline_schedule", &self.pipeline_schedule)
            .field("engagement_top_n", &self.engagement_top_n)
            .finish()
    }
}
