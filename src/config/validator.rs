//! Config validation: values that parse but cannot work.

use crate::config::AppConfig;
use crate::error::ConfigError;

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            key: "SERVER_PORT",
            value: "0".into(),
        });
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "DATABASE_MAX_CONNECTIONS",
            value: "0".into(),
        });
    }
    if !config.database.url.starts_with("postgres://") && !config.database.url.starts_with("postgresql://") {
        return Err(ConfigError::Invalid {
            key: "DATABASE_URL",
            value: config.database.url.clone(),
        });
    }
    if config.cors.allow_credentials && config.cors.allow_origins.iter().any(|o| o == "*") {
        return Err(ConfigError::Invalid {
            key: "CORS_ALLOW_ORIGINS",
            value: "*".into(),
        });
    }
    Ok(())
}
