use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::external::argentinadatos::DEFAULT_QUOTES_URL;
use crate::models::TableRef;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct WarehouseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub query_timeout: Duration,
}

// Keeps the password out of logs
impl fmt::Debug for WarehouseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Six-field cron expression (sec min hour day month weekday).
    pub schedule: String,
    pub retries: u32,
    pub retry_delay: Duration,
    pub status_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub table: TableRef,
    pub source: SourceSettings,
    pub scheduler: SchedulerSettings,
    pub handoff_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let settings = Self {
            warehouse: WarehouseSettings {
                host: env.required("REDSHIFT_HOST")?,
                port: env.parse_or("REDSHIFT_PORT", 5439)?,
                database: env.required("REDSHIFT_DB")?,
                user: env.required("REDSHIFT_USER")?,
                password: env.required("REDSHIFT_PASSWORD")?,
                query_timeout: Duration::from_secs(env.parse_or("QUERY_TIMEOUT_SECS", 60)?),
            },
            table: TableRef::new(
                env.string_or("SCHEMA_NAME", "public"),
                env.string_or("TABLE_NAME", "cotizaciones_dolares"),
            ),
            source: SourceSettings {
                url: env.string_or("QUOTES_API_URL", DEFAULT_QUOTES_URL),
                timeout: Duration::from_secs(env.parse_or("HTTP_TIMEOUT_SECS", 30)?),
            },
            scheduler: SchedulerSettings {
                schedule: env.string_or("ETL_SCHEDULE", "0 0 0 * * *"),
                retries: env.parse_or("ETL_RETRIES", 1)?,
                retry_delay: Duration::from_secs(env.parse_or("ETL_RETRY_DELAY_SECS", 300)?),
                status_addr: env.parse_or("STATUS_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            },
            handoff_dir: PathBuf::from(env.string_or("HANDOFF_DIR", "./handoff")),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.table.validate().map_err(|reason| ConfigError::Invalid {
            key: "SCHEMA_NAME/TABLE_NAME",
            value: self.table.qualified(),
            reason,
        })?;

        if self.warehouse.query_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "QUERY_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.source.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    // Blank values count as unset
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("REDSHIFT_HOST", "warehouse.example.com"),
        ("REDSHIFT_DB", "dev"),
        ("REDSHIFT_USER", "etl"),
        ("REDSHIFT_PASSWORD", "s3cret"),
    ];

    #[test]
    fn test_defaults_apply() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.warehouse.port, 5439);
        assert_eq!(settings.warehouse.query_timeout, Duration::from_secs(60));
        assert_eq!(settings.table, TableRef::new("public", "cotizaciones_dolares"));
        assert_eq!(settings.source.url, DEFAULT_QUOTES_URL);
        assert_eq!(settings.source.timeout, Duration::from_secs(30));
        assert_eq!(settings.scheduler.schedule, "0 0 0 * * *");
        assert_eq!(settings.scheduler.retries, 1);
        assert_eq!(settings.handoff_dir, PathBuf::from("./handoff"));
    }

    #[test]
    fn test_overrides_apply() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("REDSHIFT_PORT", "5440"),
            ("SCHEMA_NAME", "2024_fx_schema"),
            ("TABLE_NAME", "quotes"),
            ("ETL_RETRIES", "3"),
        ]);

        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.warehouse.port, 5440);
        assert_eq!(settings.table, TableRef::new("2024_fx_schema", "quotes"));
        assert_eq!(settings.scheduler.retries, 3);
    }

    #[test]
    fn test_mixed_case_table_name_matches_catalog_form() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("SCHEMA_NAME", "Finanzas"), ("TABLE_NAME", "Cotizaciones")]);

        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.table.schema, "finanzas");
        assert_eq!(settings.table.name, "cotizaciones");
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "REDSHIFT_PASSWORD")
            .collect();

        match Settings::from_lookup(lookup(&pairs)) {
            Err(ConfigError::Missing(key)) => assert_eq!(key, "REDSHIFT_PASSWORD"),
            other => panic!("expected Missing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REDSHIFT_PORT", "not-a-port"));

        assert!(matches!(
            Settings::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "REDSHIFT_PORT", .. })
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "0"));

        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", settings.warehouse);
        assert!(!rendered.contains("s3cret"));
    }
}
