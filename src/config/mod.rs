use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub site: SiteConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_token_ttl_hours: i64,
    pub session_cookie_max_age_days: i64,
    pub one_time_token_ttl_hours: i64,
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public origin used to build invite links, e.g. `https://admin.example.com`
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_TOKEN_TTL_HOURS") {
            self.security.session_token_ttl_hours = v.parse().unwrap_or(self.security.session_token_ttl_hours);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_MAX_AGE_DAYS") {
            self.security.session_cookie_max_age_days =
                v.parse().unwrap_or(self.security.session_cookie_max_age_days);
        }
        if let Ok(v) = env::var("ONE_TIME_TOKEN_TTL_HOURS") {
            self.security.one_time_token_ttl_hours = v.parse().unwrap_or(self.security.one_time_token_ttl_hours);
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Site
        if let Ok(v) = env::var("SITE_DOMAIN") {
            self.site.domain = v;
        }

        // Mail transport
        if let Ok(v) = env::var("MAIL_API_URL") {
            self.mail.api_url = v;
        }
        if let Ok(v) = env::var("MAIL_API_KEY") {
            self.mail.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("MAIL_FROM") {
            self.mail.from = v;
        }

        // Image storage
        self.storage.cloud_name = env::var("CLOUDINARY_CLOUD_NAME").ok().or(self.storage.cloud_name);
        self.storage.api_key = env::var("CLOUDINARY_API_KEY").ok().or(self.storage.api_key);
        self.storage.api_secret = env::var("CLOUDINARY_API_SECRET").ok().or(self.storage.api_secret);

        self
    }

    /// Checks that must hold before the server accepts traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.environment == Environment::Production && self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        // Only development may fall back to the log-only mailer
        if self.environment != Environment::Development && self.mail.api_key.is_none() {
            return Err(ConfigError::Missing("MAIL_API_KEY"));
        }
        if self.security.session_token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TOKEN_TTL_HOURS",
                reason: "must be positive".to_string(),
            });
        }
        if url::Url::parse(&self.site.domain).is_err() {
            return Err(ConfigError::Invalid {
                key: "SITE_DOMAIN",
                reason: format!("'{}' is not an absolute URL", self.site.domain),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                session_token_ttl_hours: 24,
                session_cookie_max_age_days: 7,
                one_time_token_ttl_hours: 24,
                secure_cookies: false,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            site: SiteConfig {
                domain: "http://localhost:3000".to_string(),
            },
            mail: MailConfig {
                api_url: "https://api.resend.com/emails".to_string(),
                api_key: None,
                from: "CMS Admin <no-reply@localhost>".to_string(),
            },
            storage: StorageConfig {
                cloud_name: None,
                api_key: None,
                api_secret: None,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.host = "0.0.0.0".to_string();
        config.server.max_request_size_bytes = 5 * 1024 * 1024; // 5MB
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_secret = String::new();
        config.security.secure_cookies = true;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.site.domain = "https://staging.example.com".to_string();
        config
    }

    pub(crate) fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.host = "0.0.0.0".to_string();
        config.server.max_request_size_bytes = 2 * 1024 * 1024; // 2MB
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_secret = String::new();
        config.security.secure_cookies = true;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.site.domain = "https://app.example.com".to_string();
        config.mail.from = "CMS Admin <no-reply@example.com>".to_string();
        config
    }
}
