//! Command-line interface

use clap::{Parser, Subcommand};

use crate::services::pipeline_service::Step;

/// Incremental loader of dollar exchange-rate quotes into Redshift
#[derive(Parser)]
#[command(name = "dolar-etl")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every step once, in order
    Run,
    /// Run a single step, exchanging data through HANDOFF_DIR
    Step {
        #[arg(value_enum)]
        step: Step,
    },
    /// Run daily on ETL_SCHEDULE and serve run status on STATUS_ADDR
    Schedule,
}
