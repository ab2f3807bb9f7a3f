/// Configuration management for the API server
///
/// Loaded once at startup from environment variables (a `.env` file is
/// honored in development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: *)
/// - `JWT_SECRET`: JWT signing secret, at least 32 bytes (required)
/// - `REDIS_URL`: Redis for rate limiting; in-process fallback when unset
/// - `BILLING_API_KEY`: payment provider key; noop processor when unset
/// - `BILLING_API_URL`: payment provider base URL
/// - `BILLING_WEBHOOK_SECRET`: webhook signature secret
/// - `PROMOTE_COMPANY_OWNER`: registering user becomes company admin
///   (default: true)
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub billing: BillingConfig,
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; "*" means permissive (development)
    pub cors_origins: Vec<String>,

    /// True when ENVIRONMENT=production; enables HSTS
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL; None means in-process rate limit counters
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Payment provider API key; None means the noop processor
    pub api_key: Option<String>,

    pub api_url: String,

    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Whether the user who registers a company becomes its company
    /// admin with an active account immediately
    pub promote_company_owner: bool,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when required variables are missing, values do
    /// not parse, or the JWT secret is too short.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let production = env::var("ENVIRONMENT")
            .map(|v| v == "production")
            .unwrap_or(false);
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let redis_url = env::var("REDIS_URL").ok();

        let billing_api_key = env::var("BILLING_API_KEY").ok().filter(|s| !s.is_empty());
        let billing_api_url =
            env::var("BILLING_API_URL").unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let billing_webhook_secret = env::var("BILLING_WEBHOOK_SECRET").ok();

        let promote_company_owner = env::var("PROMOTE_COMPANY_OWNER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            redis: RedisConfig { url: redis_url },
            billing: BillingConfig {
                api_key: billing_api_key,
                api_url: billing_api_url,
                webhook_secret: billing_webhook_secret,
            },
            registration: RegistrationConfig {
                promote_company_owner,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            redis: RedisConfig { url: None },
            billing: BillingConfig {
                api_key: None,
                api_url: "https://api.stripe.com".to_string(),
                webhook_secret: None,
            },
            registration: RegistrationConfig {
                promote_company_owner: true,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }
}
