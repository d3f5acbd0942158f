use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/pipeline.db?mode=rwc";
pub const DEFAULT_API_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = or_default("DATABASE_URL", DEFAULT_DATABASE_URL);
    if !database_url.starts_with("sqlite:") {
        return Err(invalid(
            "DATABASE_URL",
            "only sqlite: URLs are supported".to_string(),
        ));
    }

    let env = parse_environment(&or_default("SLUICE_ENV", "development"))?;
    let bind_addr = parse_addr("SLUICE_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("SLUICE_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("SLUICE_DATA_DIR", "data"));
    let reports_dir = PathBuf::from(or_default("SLUICE_REPORTS_DIR", "reports"));

    let api_base_url = or_default("SLUICE_API_BASE_URL", DEFAULT_API_BASE_URL);
    let api_timeout_secs = parse_u64("SLUICE_API_TIMEOUT_SECS", "30")?;
    let api_max_retries = parse_u32("SLUICE_API_MAX_RETRIES", "3")?;
    let api_retry_backoff_base_ms = parse_u64("SLUICE_API_RETRY_BACKOFF_BASE_MS", "1000")?;

    let db_max_connections = parse_u32("SLUICE_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(invalid(
            "SLUICE_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("SLUICE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let pipeline_schedule = lookup("SLUICE_PIPELINE_SCHEDULE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let engagement_top_n = parse_u32("SLUICE_ENGAGEMENT_TOP_N", "10")?;
    if engagement_top_n == 0 {
        return Err(invalid(
            "SLUICE_ENGAGEMENT_TOP_N",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        data_dir,
        reports_dir,
        api_base_url,
        api_timeout_secs,
        api_max_retries,
        api_retry_backoff_base_ms,
        db_max_connections,
        db_acquire_timeout_secs,
        pipeline_schedule,
        engagement_top_n: i64::from(engagement_top_n),
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SLUICE_ENV".to_string(),
            reason: format!("expected development, test, or production; got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
