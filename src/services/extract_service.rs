use chrono::NaiveDateTime;
use tracing::info;

use crate::db::warehouse::WarehouseConnector;
use crate::errors::EtlError;
use crate::external::quote_source::QuoteSource;
use crate::models::{QuoteRecord, TableRef};
use crate::services::watermark_service;

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub watermark: Option<NaiveDateTime>,
    pub fetched: usize,
    pub records: Vec<QuoteRecord>,
}

/// Keep the records strictly newer than the watermark, in their original order.
/// No watermark means the full history is kept.
pub fn filter_new_quotes(
    quotes: Vec<QuoteRecord>,
    watermark: Option<NaiveDateTime>,
) -> Vec<QuoteRecord> {
    match watermark {
        None => quotes,
        Some(last) => quotes.into_iter().filter(|q| q.date > last).collect(),
    }
}

/// Resolve the watermark on a dedicated connection, fetch the full history and
/// reduce it to the new delta. An upstream failure or empty payload aborts.
pub async fn extract(
    source: &dyn QuoteSource,
    connector: &dyn WarehouseConnector,
    table: &TableRef,
) -> Result<Extraction, EtlError> {
    let watermark = {
        let warehouse = connector.connect().await?;
        watermark_service::last_timestamp(warehouse.as_ref(), table).await?
    };

    let quotes = source.fetch_quotes().await?;
    let fetched = quotes.len();
    let records = filter_new_quotes(quotes, watermark);

    info!(
        "Extracted {} new of {} fetched quotes (watermark: {:?})",
        records.len(),
        fetched,
        watermark
    );

    Ok(Extraction {
        watermark,
        fetched,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quote(house: &str, y: i32, m: u32, d: u32) -> QuoteRecord {
        QuoteRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            house_code: house.to_string(),
            buy_price: Some(1.0),
            sell_price: Some(2.0),
        }
    }

    #[test]
    fn test_no_watermark_keeps_everything() {
        let quotes = vec![quote("oficial", 2024, 10, 14), quote("blue", 2024, 10, 15)];
        assert_eq!(filter_new_quotes(quotes.clone(), None), quotes);
    }

    #[test]
    fn test_watermark_is_exclusive() {
        let quotes = vec![
            quote("oficial", 2024, 10, 13),
            quote("oficial", 2024, 10, 14),
            quote("blue", 2024, 10, 15),
        ];
        let watermark = NaiveDate::from_ymd_opt(2024, 10, 14)
            .unwrap()
            .and_hms_opt(0, 0, 0);

        let kept = filter_new_quotes(quotes, watermark);
        assert_eq!(kept, vec![quote("blue", 2024, 10, 15)]);
    }

    #[test]
    fn test_filter_preserves_relative_order() {
        let quotes = vec![
            quote("blue", 2024, 10, 16),
            quote("oficial", 2024, 10, 10),
            quote("cripto", 2024, 10, 15),
        ];
        let watermark = NaiveDate::from_ymd_opt(2024, 10, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0);

        let codes: Vec<String> = filter_new_quotes(quotes, watermark)
            .into_iter()
            .map(|q| q.house_code)
            .collect();
        assert_eq!(codes, vec!["blue", "cripto"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let quotes = vec![quote("oficial", 2024, 10, 14), quote("blue", 2024, 10, 15)];
        let watermark = NaiveDate::from_ymd_opt(2024, 10, 14)
            .unwrap()
            .and_hms_opt(0, 0, 0);

        let first = filter_new_quotes(quotes.clone(), watermark);
        let second = filter_new_quotes(quotes, watermark);
        assert_eq!(first, second);
    }

    #[test]
    fn test_watermark_past_everything_yields_empty_delta() {
        let quotes = vec![quote("oficial", 2024, 10, 14)];
        let watermark = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0);

        assert!(filter_new_quotes(quotes, watermark).is_empty());
    }

    #[test]
    fn test_loaded_sub_microsecond_quote_is_not_extracted_again() {
        use crate::external::argentinadatos::parse_quotes;

        let body = r#"[{"casa":"oficial","compra":900.0,"venta":920.0,"fecha":"2024-10-15T13:45:00.1234567"}]"#;
        let quotes = parse_quotes(body).unwrap();

        // What MAX(updated_at) returns once the row is stored at microsecond precision
        let stored = NaiveDate::from_ymd_opt(2024, 10, 15)
            .unwrap()
            .and_hms_micro_opt(13, 45, 0, 123_456);

        assert!(filter_new_quotes(quotes, stored).is_empty());
    }
}
