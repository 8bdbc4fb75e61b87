//! Process configuration: an environment preset (`APP_ENV`) with individual
//! settings overridden from environment variables.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub tenancy: TenancyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Which `Store` implementation backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    /// `*` or an empty list allows any origin
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Tenant used by token requests that name none
    pub default_tenant: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?} mode")]
    MissingJwtSecret(Environment),

    #[error("DATABASE_URL must be set when the postgres backend is selected")]
    MissingDatabaseUrl,
}

/// Overwrite `target` when `key` is set and parses
fn env_parse<T: FromStr>(key: &str, target: &mut T) {
    if let Some(parsed) = env::var(key).ok().and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::preset(Environment::from_env());
        config.apply_env();
        config
    }

    /// Defaults for one environment before any overrides
    fn preset(environment: Environment) -> Self {
        let (backend, max_connections, connection_timeout) = match environment {
            Environment::Development => (StoreBackend::Memory, 10, 30),
            Environment::Staging => (StoreBackend::Postgres, 20, 10),
            Environment::Production => (StoreBackend::Postgres, 50, 5),
        };
        let verbose = environment != Environment::Production;
        let max_request_mb = match environment {
            Environment::Development => 10,
            Environment::Staging => 5,
            Environment::Production => 2,
        };
        let cors_origins: &[&str] = match environment {
            Environment::Development => &["http://localhost:3000", "http://localhost:5173"],
            Environment::Staging => &["https://staging.potencialize.com.br"],
            Environment::Production => &["https://app.potencialize.com.br"],
        };
        let (access_token_minutes, refresh_token_hours) = match environment {
            Environment::Development => (60, 24),
            Environment::Staging => (30, 24),
            Environment::Production => (15, 12),
        };
        // Only development ships a usable secret
        let jwt_secret = match environment {
            Environment::Development => "development-only-secret".to_string(),
            _ => String::new(),
        };

        Self {
            environment,
            database: DatabaseConfig {
                backend,
                max_connections,
                connection_timeout,
                enable_query_logging: verbose,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: verbose,
                max_request_size_bytes: max_request_mb * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: cors_origins.iter().map(|o| o.to_string()).collect(),
                jwt_secret,
                access_token_minutes,
                refresh_token_hours,
            },
            tenancy: TenancyConfig {
                default_tenant: "main".to_string(),
            },
        }
    }

    fn apply_env(&mut self) {
        match env::var("DATABASE_BACKEND").as_deref() {
            Ok("memory") => self.database.backend = StoreBackend::Memory,
            Ok("postgres") | Ok("pg") => self.database.backend = StoreBackend::Postgres,
            _ if self.environment == Environment::Development && env::var("DATABASE_URL").is_ok() => {
                self.database.backend = StoreBackend::Postgres;
            }
            _ => {}
        }
        env_parse("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        env_parse("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);
        env_parse("DATABASE_ENABLE_QUERY_LOGGING", &mut self.database.enable_query_logging);

        env_parse("PORT", &mut self.api.port);
        env_parse("API_PORT", &mut self.api.port);
        env_parse("API_ENABLE_REQUEST_LOGGING", &mut self.api.enable_request_logging);
        env_parse("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        env_parse("SECURITY_ENABLE_CORS", &mut self.security.enable_cors);
        if let Ok(origins) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(secret) = env::var("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        env_parse("SECURITY_ACCESS_TOKEN_MINUTES", &mut self.security.access_token_minutes);
        env_parse("SECURITY_REFRESH_TOKEN_HOURS", &mut self.security.refresh_token_hours);

        if let Ok(tenant) = env::var("DEFAULT_TENANT") {
            if !tenant.trim().is_empty() {
                self.tenancy.default_tenant = tenant.trim().to_string();
            }
        }
    }

    /// Refuse to start with settings that would make the API unusable or unsafe
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret(self.environment));
        }
        if self.database.backend == StoreBackend::Postgres && env::var("DATABASE_URL").is_err() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }
}

// Loaded once, on first access
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_preset_runs_in_memory() {
        let config = AppConfig::preset(Environment::Development);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.tenancy.default_tenant, "main");
        assert_eq!(config.api.max_request_size_bytes, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_preset_needs_a_secret() {
        let config = AppConfig::preset(Environment::Production);
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(!config.api.enable_request_logging);
        assert!(config.security.access_token_minutes < AppConfig::preset(Environment::Development).security.access_token_minutes);
        assert!(matches!(config.validate(), Err(ConfigError::MissingJwtSecret(Environment::Production))));
    }
}
