pub mod analytics;
pub mod app_config;
pub mod config;
pub mod entities;
pub mod run;

pub use analytics::{AnalyticsReport, EngagementMetric, DEFAULT_ENGAGEMENT_TOP_N};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use entities::{Address, Comment, Company, Geo, Post, User};
pub use run::{PipelineRun, PipelineStatus, RunMetadata};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid pipeline status: {0}")]
    InvalidStatus(String),

    #[error("invalid pipeline run transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineStatus,
        to: PipelineStatus,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
