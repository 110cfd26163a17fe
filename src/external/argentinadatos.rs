use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::SourceSettings;
use crate::external::quote_source::{QuoteSource, QuoteSourceError};
use crate::models::{parse_timestamp, QuoteRecord};

pub const DEFAULT_QUOTES_URL: &str = "https://api.argentinadatos.com/v1/cotizaciones/dolares";

pub struct ArgentinaDatosProvider {
    client: reqwest::Client,
    url: String,
}

impl ArgentinaDatosProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QuoteSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteSourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_settings(settings: &SourceSettings) -> Result<Self, QuoteSourceError> {
        Self::new(settings.url.clone(), settings.timeout)
    }
}

// Wire shape of one element of the response array (only what we need)
#[derive(Debug, Deserialize)]
struct ApiQuote {
    casa: String,
    compra: Option<f64>,
    venta: Option<f64>,
    fecha: String,
}

#[async_trait]
impl QuoteSource for ArgentinaDatosProvider {
    async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, QuoteSourceError> {
        debug!("GET {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| QuoteSourceError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteSourceError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QuoteSourceError::Network(e.to_string()))?;

        let quotes = parse_quotes(&body)?;
        info!("Fetched {} quotes from {}", quotes.len(), self.url);
        Ok(quotes)
    }
}

/// Decode the upstream payload, failing the whole batch on the first bad date.
pub fn parse_quotes(body: &str) -> Result<Vec<QuoteRecord>, QuoteSourceError> {
    let raw: Vec<ApiQuote> =
        serde_json::from_str(body).map_err(|e| QuoteSourceError::Parse(e.to_string()))?;

    if raw.is_empty() {
        return Err(QuoteSourceError::Empty);
    }

    raw.into_iter()
        .enumerate()
        .map(|(index, q)| {
            let date = parse_timestamp(&q.fecha).ok_or_else(|| QuoteSourceError::InvalidDate {
                index,
                value: q.fecha.clone(),
            })?;

            Ok(QuoteRecord {
                date,
                house_code: q.casa,
                buy_price: q.compra,
                sell_price: q.venta,
            })
        })
        .collect()
}
