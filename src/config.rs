use std::time::Duration;

use crate::backbone::store::NestingStrategy;

// ============================================================================
// Configuration - process settings read from the environment
// ============================================================================
//
// | Variable               | Default      |
// |------------------------|--------------|
// | HTTP_PORT              | 8090         |
// | GRACEFUL_TIMEOUT       | 5s           |
// | GRACEFUL_TIMEOUT_SECS  | (overrides)  |
// | DB_DSN                 | (required)   |
// | DB_MAX_CONNECTIONS     | 10           |
// | TX_NESTING             | savepoints   |
// | REQUEST_TIMEOUT_SECS   | 10           |
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Port the HTTP server binds on 0.0.0.0
    pub http_port: u16,
    /// How long in-flight requests may finish after a shutdown signal
    pub graceful_timeout: Duration,
    pub db_dsn: String,
    pub db_max_connections: u32,
    /// How a unit of work nested in another one behaves
    pub tx_nesting: NestingStrategy,
    /// Deadline attached to every request context
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8090,
            graceful_timeout: Duration::from_secs(5),
            db_dsn: String::new(),
            db_max_connections: 10,
            tx_nesting: NestingStrategy::Savepoints,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_dsn = lookup("DB_DSN")
            .map(|dsn| dsn.trim().to_string())
            .filter(|dsn| !dsn.is_empty())
            .ok_or(ConfigError::Missing("DB_DSN"))?;

        let db_max_connections: u32 = parse(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            http_port: parse(&lookup, "HTTP_PORT", defaults.http_port)?,
            graceful_timeout: graceful_timeout(&lookup, defaults.graceful_timeout)?,
            db_dsn,
            db_max_connections,
            tx_nesting: parse(&lookup, "TX_NESTING", defaults.tx_nesting)?,
            request_timeout: Duration::from_secs(parse(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }
}

/// `GRACEFUL_TIMEOUT_SECS` wins over `GRACEFUL_TIMEOUT`; zero is rejected
fn graceful_timeout<F>(lookup: &F, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (key, timeout) = if lookup("GRACEFUL_TIMEOUT_SECS").is_some() {
        let secs: u64 = parse(lookup, "GRACEFUL_TIMEOUT_SECS", default.as_secs())?;
        ("GRACEFUL_TIMEOUT_SECS", Duration::from_secs(secs))
    } else {
        let timeout = match lookup("GRACEFUL_TIMEOUT") {
            None => default,
            Some(raw) => parse_duration(&raw).map_err(|reason| ConfigError::Invalid {
                key: "GRACEFUL_TIMEOUT",
                value: raw.clone(),
                reason,
            })?,
        };
        ("GRACEFUL_TIMEOUT", timeout)
    };

    if timeout.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(timeout)
}

/// Durations like `500ms`, `5s`, `2m`, `1h`; a bare number counts as seconds
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("expected a duration such as 5s, got {raw:?}"))?;

    let millis = match unit {
        "ms" => Some(value),
        "" | "s" => value.checked_mul(1_000),
        "m" => value.checked_mul(60_000),
        "h" => value.checked_mul(3_600_000),
        other => return Err(format!("unknown duration unit {other:?}")),
    };
    millis
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration {raw:?} is too large"))
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[("DB_DSN", "postgres://localhost/orders")])).unwrap();

        assert_eq!(config.http_port, 8090);
        assert_eq!(config.graceful_timeout, Duration::from_secs(5));
        assert_eq!(config.db_dsn, "postgres://localhost/orders");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.tx_nesting, NestingStrategy::Savepoints);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DB_DSN", "postgres://db/orders"),
            ("HTTP_PORT", "9000"),
            ("GRACEFUL_TIMEOUT_SECS", "1"),
            ("DB_MAX_CONNECTIONS", "3"),
            ("TX_NESTING", "flatten"),
            ("REQUEST_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.graceful_timeout, Duration::from_secs(1));
        assert_eq!(config.db_max_connections, 3);
        assert_eq!(config.tx_nesting, NestingStrategy::Flatten);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_graceful_timeout_accepts_durations() {
        let timeout = |value: &str| {
            Config::from_lookup(lookup(&[("DB_DSN", "x"), ("GRACEFUL_TIMEOUT", value)]))
                .map(|config| config.graceful_timeout)
        };

        assert_eq!(timeout("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(timeout("1500ms"), Ok(Duration::from_millis(1500)));
        assert_eq!(timeout("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(timeout("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(timeout(" 7 "), Ok(Duration::from_secs(7)));

        for bad in ["", "fast", "5 days", "0s", "-1s"] {
            assert!(
                matches!(timeout(bad), Err(ConfigError::Invalid { key: "GRACEFUL_TIMEOUT", .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_graceful_timeout_secs_takes_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("DB_DSN", "x"),
            ("GRACEFUL_TIMEOUT", "30s"),
            ("GRACEFUL_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.graceful_timeout, Duration::from_secs(3));

        let err = Config::from_lookup(lookup(&[("DB_DSN", "x"), ("GRACEFUL_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GRACEFUL_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_dsn_is_required() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("DB_DSN")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("DB_DSN", "  ")])).unwrap_err(),
            ConfigError::Missing("DB_DSN")
        );
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = Config::from_lookup(lookup(&[("DB_DSN", "x"), ("HTTP_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "HTTP_PORT", .. }));

        let err = Config::from_lookup(lookup(&[("DB_DSN", "x"), ("TX_NESTING", "nested")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TX_NESTING", .. }));

        let err = Config::from_lookup(lookup(&[("DB_DSN", "x"), ("DB_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. }));
    }
}
