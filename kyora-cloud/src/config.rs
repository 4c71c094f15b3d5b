//! Server configuration

use crate::BoxError;

/// Server configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Pool size
    pub database_max_connections: u32,
    /// HTTP listen port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret for access tokens
    pub jwt_secret: String,
    /// Run the recurring expense processor in this instance
    pub recurring_job_enabled: bool,
    /// Seconds between two recurring expense runs
    pub recurring_job_interval_secs: u64,
    /// Allowed CORS origins; empty means permissive (development only)
    pub cors_allowed_origins: Vec<String>,
    /// `json` for machine-readable logs, anything else for the pretty formatter
    pub log_format: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let recurring_job_interval_secs = Self::parse_var("RECURRING_JOB_INTERVAL_SECS", 86_400u64);
        if recurring_job_interval_secs == 0 {
            return Err("RECURRING_JOB_INTERVAL_SECS must be greater than zero".into());
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            database_max_connections: Self::parse_var("DATABASE_MAX_CONNECTIONS", 10),
            http_port: Self::parse_var("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            recurring_job_enabled: Self::parse_var("RECURRING_JOB_ENABLED", true),
            recurring_job_interval_secs,
            cors_allowed_origins: parse_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert!(parse_origins("").is_empty());
        assert_eq!(
            parse_origins(" https://a.example, ,https://b.example "),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_require_secret_dev_fallback() {
        let secret = Config::require_secret("KYORA_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(secret, "dev-KYORA_TEST_UNSET_SECRET-not-for-production");
        assert!(Config::require_secret("KYORA_TEST_UNSET_SECRET", "production").is_err());
    }
}
