use std::env;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment or .env file")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub session_ttl_hours: i64,
    pub trial_days: i64,
    /// Account that receives the admin role when it signs up.
    pub admin_email: Option<String>,
    /// Frontend bundle directory, served with SPA fallback when present.
    pub static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            database_url,
            bind_addr: parse_or("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", 24 * 7)?,
            trial_days: parse_or("TRIAL_DAYS", 30)?,
            admin_email: optional("ADMIN_EMAIL").map(|email| email.to_lowercase()),
            static_dir: optional("STATIC_DIR"),
        })
    }
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_to_default_when_unset() {
        let value: u32 = parse_or("CAIXA_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("CAIXA_TEST_BAD_NUMBER", "many");
        let result: Result<u32, _> = parse_or("CAIXA_TEST_BAD_NUMBER", 7);
        assert!(matches!(result, Err(ConfigError::Invalid { key: "CAIXA_TEST_BAD_NUMBER", .. })));
    }
}
