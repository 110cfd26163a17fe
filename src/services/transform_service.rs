use std::collections::BTreeSet;

use tracing::warn;

use crate::models::{HouseType, QuoteRecord, TransformedRecord};

/// Mean of whichever prices are present.
pub fn average_price(buy: Option<f64>, sell: Option<f64>) -> Option<f64> {
    match (buy, sell) {
        (Some(b), Some(s)) => Some((b + s) / 2.0),
        (Some(p), None) | (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

pub fn transform_record(record: QuoteRecord) -> TransformedRecord {
    TransformedRecord {
        type_id: HouseType::from_code(&record.house_code).map(|h| h.type_id()),
        avg_price: average_price(record.buy_price, record.sell_price),
        type_desc: record.house_code,
        buy_price: record.buy_price,
        sell_price: record.sell_price,
        updated_at: record.date,
    }
}

/// Map a batch to warehouse rows, preserving order.
///
/// Never fails: an unknown house code produces a row with no `type_id` and
/// a data-quality warning.
pub fn transform(records: Vec<QuoteRecord>) -> Vec<TransformedRecord> {
    let rows: Vec<TransformedRecord> = records.into_iter().map(transform_record).collect();

    for code in unmapped_house_codes(&rows) {
        let count = rows.iter().filter(|r| r.type_desc == code).count();
        warn!(
            "House code {:?} has no type mapping; {} row(s) will load with a NULL type_id",
            code, count
        );
    }

    rows
}

pub fn unmapped_house_codes(rows: &[TransformedRecord]) -> BTreeSet<String> {
    rows.iter()
        .filter(|r| r.type_id.is_none())
        .map(|r| r.type_desc.clone())
        .collect()
}
