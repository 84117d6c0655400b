use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Hosted identity service (bearer token verification)
    pub auth_base_url: String,
    pub auth_service_key: String,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            auth_base_url: env::var("AUTH_BASE_URL")?,
            auth_service_key: env::var("AUTH_SERVICE_KEY")?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.auth_base_url.trim().is_empty() {
            anyhow::bail!("AUTH_BASE_URL is empty");
        }
        if self.auth_service_key.trim().is_empty() {
            anyhow::bail!("AUTH_SERVICE_KEY is empty");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 3000,
        environment: "development".to_string(),
        database_url: "postgres://localhost/lingorush_test".to_string(),
        database_max_connections: 1,
        auth_base_url: "http://localhost:54321".to_string(),
        auth_service_key: "test_service_key".to_string(),
        cors_allowed_origins: "*".to_string(),
    }
}
