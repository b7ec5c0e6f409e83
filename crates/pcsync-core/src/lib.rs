pub mod app_config;
pub mod config;
pub mod pricing;
pub mod staged;

pub use app_config::{AdminCredentials, AppConfig, Environment, MailConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use pricing::apply_margin;
pub use staged::{category_tags, StagedProduct, NOT_AVAILABLE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
