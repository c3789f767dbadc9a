pub mod app_config;

pub use app_config::{
    AppConfig, DatabaseConfig, EmailConfig, LogFormat, LoggingConfig, ServerConfig, StorageConfig,
    VerificationConfig,
};
