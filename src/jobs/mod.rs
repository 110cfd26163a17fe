//! Background Jobs Module
//!
//! Jobs registered with the job scheduler service.
//!
//! - `daily_quotes_job` - Incremental load of exchange-rate quotes into the warehouse

pub mod daily_quotes_job;
