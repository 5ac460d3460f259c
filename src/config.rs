use std::env;
use secrecy::SecretString;

const DEV_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEV_JWT_REFRESH_SECRET: &str = "dev_refresh_secret_key_change_in_production";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub api_prefix: String,
    pub api_version: String,
    pub jwt_secret: SecretString,
    pub jwt_refresh_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub jwt_refresh_expiration_hours: i64,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            environment: Environment::parse(
                &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            ),
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .or_else(|_| env::var("MONGODB_URI"))
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "smartquiz".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5002),
            api_prefix: normalize_prefix(
                &env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            ),
            api_version: env::var("API_VERSION").unwrap_or_else(|_| "v1".to_string()),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            ),
            jwt_refresh_secret: SecretString::from(
                env::var("JWT_REFRESH_SECRET")
                    .unwrap_or_else(|_| DEV_JWT_REFRESH_SECRET.to_string()),
            ),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24 * 7),
            jwt_refresh_expiration_hours: env::var("JWT_REFRESH_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24 * 30),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_else(|_| default_origins()),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `mock-jwt-token-<id>` bearer tokens are only honoured outside production.
    pub fn allow_mock_tokens(&self) -> bool {
        !self.is_production()
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if !self.is_production() {
            return;
        }

        for (name, secret, default) in [
            ("JWT_SECRET", self.jwt_secret.expose_secret(), DEV_JWT_SECRET),
            (
                "JWT_REFRESH_SECRET",
                self.jwt_refresh_secret.expose_secret(),
                DEV_JWT_REFRESH_SECRET,
            ),
        ] {
            if secret == default {
                panic!(
                    "FATAL: {name} is using default value! Set {name} environment variable to a secure random string."
                );
            }
            if secret.len() < 32 {
                panic!(
                    "FATAL: {name} is too short ({}). Must be at least 32 characters for security.",
                    secret.len()
                );
            }
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            environment: Environment::Test,
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "smartquiz-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 5002,
            api_prefix: "/api".to_string(),
            api_version: "v1".to_string(),
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_refresh_secret: SecretString::from("test_jwt_refresh_secret_key".to_string()),
            jwt_expiration_hours: 1,
            jwt_refresh_expiration_hours: 24,
            cors_origins: default_origins(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:3002".to_string(),
    ]
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
