//! Subscriber setup for the ETL binary.
//!
//! Console output is always on. With the `loki` feature and `LOKI_ENABLED`,
//! the same events are also shipped to Loki, labelled with the service,
//! environment and pipeline they came from.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info,sqlx=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            loki_enabled: lookup("LOKI_ENABLED").is_some_and(|v| is_truthy(&v)),
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "dolar-etl".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }

    /// Falls back to the default directives when `RUST_LOG` does not parse.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Install the global subscriber. Loki shipping needs a running tokio runtime.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    let registry = registry.with(loki_layer(&config)?);

    registry.try_init()?;

    #[cfg(not(feature = "loki"))]
    {
        if config.loki_enabled {
            tracing::warn!("LOKI_ENABLED is set but this build has no `loki` feature");
        }
    }

    tracing::debug!(
        "Logging ready for {} ({}), level {}",
        config.service_name,
        config.environment,
        config.log_level
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(
    config: &LoggingConfig,
) -> Result<Option<tracing_loki::Layer>, Box<dyn std::error::Error>> {
    let loki_url = match (&config.loki_url, config.loki_enabled) {
        (Some(url), true) => url,
        _ => return Ok(None),
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .label("pipeline", "dolar_quotes")?
        .build_url(url::Url::parse(loki_url)?)?;

    tokio::spawn(task);
    Ok(Some(layer))
}
