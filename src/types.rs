pub use crate::utils::database;
use async_trait::async_trait;
use std::env;
use std::future::Future;
use std::time::Duration;

/// Process-wide handle: only obtainable from a successful connect.
#[derive(Clone)]
pub struct Context {
    pub db: database::Database,
}

impl Context {
    pub async fn close(self) {
        self.db.conn.pool.close().await;
        tracing::debug!("Database connection closed");
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub connect_retries: u32,
    pub retry_backoff: Duration,
    pub log_queries: bool,
    pub auto_migrate: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = parse_number(&lookup, "DATABASE_MAX_CONNECTIONS", 1u32)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DATABASE_MAX_CONNECTIONS",
                value: max_connections.to_string(),
            });
        }
        let connect_timeout_secs = parse_number(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 10u64)?;
        let connect_retries = parse_number(&lookup, "DATABASE_CONNECT_RETRIES", 0u32)?;
        let retry_backoff_ms = parse_number(&lookup, "DATABASE_RETRY_BACKOFF_MS", 500u64)?;
        let log_queries = parse_flag(&lookup, "DATABASE_LOG_QUERIES", true)?;
        let auto_migrate = parse_flag(&lookup, "DATABASE_AUTO_MIGRATE", false)?;

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                connect_timeout: Duration::from_secs(connect_timeout_secs),
                connect_retries,
                retry_backoff: Duration::from_millis(retry_backoff_ms),
                log_queries,
                auto_migrate,
            },
        })
    }
}

#[async_trait]
pub trait ToContext {
    async fn to_context(self) -> Result<Context, database::Error>;
}

#[async_trait]
impl ToContext for Config {
    async fn to_context(self) -> Result<Context, database::Error> {
        let db_conn = database::connect(&self.database).await?;

        if self.database.auto_migrate {
            database::migrate(&db_conn).await?;
        }

        Ok(Context {
            db: database::Database::new(db_conn),
        })
    }
}

/// Connects once and reports the outcome; never panics on a bad URL.
/// Failures are already logged where they happen.
pub async fn bootstrap(config: Config) -> Result<Context, database::Error> {
    config.to_context().await
}

/// Runs `attempt` up to `retries + 1` times, sleeping between tries with a
/// backoff that doubles each time. Only connection failures are retried.
pub async fn retry_connect<T, F, Fut>(
    retries: u32,
    backoff: Duration,
    mut attempt: F,
) -> Result<T, database::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, database::Error>>,
{
    let attempts = retries.saturating_add(1);
    let mut backoff = backoff;
    let mut tried = 1u32;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(database::Error::Connect(err)) if tried < attempts => {
                tracing::warn!(
                    "Connection attempt {}/{} failed ({}), retrying in {:?}",
                    tried,
                    attempts,
                    err,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                tried += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub async fn bootstrap_with_retry(config: Config) -> Result<Context, database::Error> {
    let retries = config.database.connect_retries;
    let backoff = config.database.retry_backoff;

    retry_connect(retries, backoff, || bootstrap(config.clone())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
        assert_eq!(err.to_string(), "DATABASE_URL not set");
    }

    #[test]
    fn defaults_keep_a_single_connection() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/food")])).unwrap();

        assert_eq!(config.database.url, "postgres://localhost/food");
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.database.connect_retries, 0);
        assert_eq!(config.database.retry_backoff, Duration::from_millis(500));
        assert!(config.database.log_queries);
        assert!(!config.database.auto_migrate);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/food"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("DATABASE_CONNECT_RETRIES", "3"),
            ("DATABASE_LOG_QUERIES", "off"),
            ("DATABASE_AUTO_MIGRATE", "1"),
        ]))
        .unwrap();

        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.connect_retries, 3);
        assert!(!config.database.log_queries);
        assert!(config.database.auto_migrate);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/food"),
            ("DATABASE_CONNECT_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "DATABASE_CONNECT_TIMEOUT_SECS",
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn zero_connections_is_invalid() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/food"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DATABASE_MAX_CONNECTIONS", .. }));
    }

    fn connect_error() -> database::Error {
        database::Error::Connect(sqlx::Error::PoolTimedOut)
    }

    #[tokio::test]
    async fn retries_connection_failures_until_success() {
        let mut calls = 0u32;
        let result = retry_connect(5, Duration::from_millis(1), || {
            calls += 1;
            let call = calls;
            async move {
                if call < 3 {
                    Err(connect_error())
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_connect(2, Duration::from_millis(1), || {
            calls += 1;
            async { Err(connect_error()) }
        })
        .await;

        assert!(matches!(result, Err(database::Error::Connect(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_connect(4, Duration::from_millis(1), || {
            calls += 1;
            async { Err(database::Error::Verify(sqlx::Error::RowNotFound)) }
        })
        .await;

        assert!(matches!(result, Err(database::Error::Verify(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn max_retries_do_not_overflow() {
        let mut calls = 0u32;
        let result = retry_connect(u32::MAX, Duration::ZERO, || {
            calls += 1;
            let call = calls;
            async move {
                if call < 3 {
                    Err(connect_error())
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn bootstrap_with_retry_reports_invalid_url() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "definitely not a url"),
            ("DATABASE_CONNECT_RETRIES", "2"),
            ("DATABASE_RETRY_BACKOFF_MS", "1"),
        ]))
        .unwrap();

        let result = bootstrap_with_retry(config).await;
        assert!(matches!(result, Err(database::Error::Connect(_))));
    }

    #[tokio::test]
    async fn bootstrap_returns_error_for_invalid_url() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "definitely not a url")])).unwrap();

        let result = bootstrap(config).await;
        assert!(matches!(result, Err(database::Error::Connect(_))));
    }
}
