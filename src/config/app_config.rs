use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Connection pool and driver settings. `url` falls back to the
/// `DATABASE_URL` environment variable when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: usize,
    pub connect_timeout_secs: u64,
    pub connect_retries: u32,
    pub retry_backoff_ms: u64,
    pub acquire_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

/// SMTP delivery. When `smtp_host` is unset, verification codes are logged
/// instead of mailed (development mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

/// Object storage endpoint and bucket names for uploaded images.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub scan_bucket: String,
    pub profile_bucket: String,
    pub public_base_url: String,
}

/// TTLs for the in-process verification/OTP stores.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub signup_ttl_secs: i64,
    pub password_reset_ttl_secs: i64,
    pub email_change_ttl_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connect_timeout_secs: 10,
            connect_retries: 3,
            retry_backoff_ms: 250,
            acquire_timeout_secs: 30,
            query_timeout_secs: 30,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            from_address: "noreply@ricescan.app".to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/storage/v1".to_string(),
            api_key: None,
            scan_bucket: "rice-leaf-scans".to_string(),
            profile_bucket: "profile-images".to_string(),
            public_base_url: "http://localhost:8000/storage/v1/object/public".to_string(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            signup_ttl_secs: 15 * 60,
            password_reset_ttl_secs: 15 * 60,
            email_change_ttl_secs: 10 * 60,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Resolved database URL: explicit config wins, then `DATABASE_URL`.
    pub fn database_url(&self) -> Option<String> {
        self.database
            .url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.verification.signup_ttl_secs, 900);
        assert_eq!(config.verification.email_change_ttl_secs, 600);
        assert!(config.email.smtp_host.is_none());
    }
}
