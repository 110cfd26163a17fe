use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

// One exchange-rate observation as published by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub date: NaiveDateTime,
    pub house_code: String,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
}

// Warehouse-bound row, one per QuoteRecord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub type_id: Option<i32>,
    pub type_desc: String,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub avg_price: Option<f64>,
    pub updated_at: NaiveDateTime,
}

/// Quote venue categories published by the source, with their fixed warehouse codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HouseType {
    Oficial,
    Mayorista,
    ContadoConLiqui,
    Bolsa,
    Tarjeta,
    Solidario,
    Cripto,
    Blue,
}

impl HouseType {
    pub const ALL: [HouseType; 8] = [
        HouseType::Oficial,
        HouseType::Mayorista,
        HouseType::ContadoConLiqui,
        HouseType::Bolsa,
        HouseType::Tarjeta,
        HouseType::Solidario,
        HouseType::Cripto,
        HouseType::Blue,
    ];

    /// Exact, case-sensitive lookup of the source's `casa` value.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "oficial" => Some(HouseType::Oficial),
            "mayorista" => Some(HouseType::Mayorista),
            "contadoconliqui" => Some(HouseType::ContadoConLiqui),
            "bolsa" => Some(HouseType::Bolsa),
            "tarjeta" => Some(HouseType::Tarjeta),
            "solidario" => Some(HouseType::Solidario),
            "cripto" => Some(HouseType::Cripto),
            "blue" => Some(HouseType::Blue),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            HouseType::Oficial => "oficial",
            HouseType::Mayorista => "mayorista",
            HouseType::ContadoConLiqui => "contadoconliqui",
            HouseType::Bolsa => "bolsa",
            HouseType::Tarjeta => "tarjeta",
            HouseType::Solidario => "solidario",
            HouseType::Cripto => "cripto",
            HouseType::Blue => "blue",
        }
    }

    pub fn type_id(&self) -> i32 {
        match self {
            HouseType::Oficial => 0,
            HouseType::Mayorista => 1,
            HouseType::ContadoConLiqui => 2,
            HouseType::Bolsa => 3,
            HouseType::Tarjeta => 4,
            HouseType::Solidario => 5,
            HouseType::Cripto => 6,
            HouseType::Blue => 7,
        }
    }
}

/// Parse an observation timestamp as the upstream formats it.
///
/// Accepts a bare date (midnight), a naive date-time with `T` or a space as
/// separator, and RFC 3339 with an offset, which is normalized to UTC.
///
/// Fractions finer than a microsecond are dropped: the warehouse stores whole
/// microseconds, and the watermark read back must equal the loaded value.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    parse_full_precision(value.trim()).map(|ts| ts.trunc_subsecs(6))
}

fn parse_full_precision(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.naive_utc())
}
