use std::env;
use std::fmt;

const DEFAULT_JWT_TTL_HOURS: i64 = 24 * 7;
const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";
const DEFAULT_EMAIL_FROM: &str = "no-reply@taskmate.local";

/// Raised when the environment is missing a required value or holds an unparsable one.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Signing settings shared by token issuing and the auth middleware.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Outbound email settings. `api_key == None` disables sending.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub from: String,
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                ttl_hours: parsed("JWT_TTL_HOURS", DEFAULT_JWT_TTL_HOURS)?,
            },
            email: EmailConfig {
                api_key: env::var("SENDGRID_API_KEY").ok().filter(|key| !key.is_empty()),
                api_url: env::var("SENDGRID_API_URL")
                    .unwrap_or_else(|_| DEFAULT_SENDGRID_API_URL.to_string()),
                from: env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.to_string()),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid(key, value)),
        Err(_) => Ok(default),
    }
}
