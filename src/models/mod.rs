mod quote;
mod table;
mod run;

pub use quote::{parse_timestamp, HouseType, QuoteRecord, TransformedRecord};
pub use run::{LoadReport, RunRecord, RunReport, RunStatus};
pub use table::{quote_ident, TableRef};
