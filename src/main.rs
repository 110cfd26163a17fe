use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use dolar_etl::app;
use dolar_etl::cli::{Cli, Commands};
use dolar_etl::config::Settings;
use dolar_etl::db::redshift::RedshiftConnector;
use dolar_etl::external::argentinadatos::ArgentinaDatosProvider;
use dolar_etl::logging::{init_logging, LoggingConfig};
use dolar_etl::services::handoff::{FileHandoff, HandoffStore, MemoryHandoff};
use dolar_etl::services::job_scheduler_service::JobSchedulerService;
use dolar_etl::services::pipeline_service::{Pipeline, StepOutcome};
use dolar_etl::services::run_tracker::{RetryPolicy, RunTracker};
use dolar_etl::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid configuration")?;

    let result = match cli.command {
        Commands::Run => run_once(&settings).await,
        Commands::Step { step } => {
            let pipeline = build_pipeline(&settings, Arc::new(FileHandoff::new(&settings.handoff_dir)))?;
            let outcome = pipeline.run_step(step).await?;
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Schedule => schedule(&settings).await,
    };

    if let Err(e) = &result {
        error!("❌ {:#}", e);
    }
    result
}

fn build_pipeline(settings: &Settings, handoff: Arc<dyn HandoffStore>) -> Result<Pipeline> {
    let source = ArgentinaDatosProvider::from_settings(&settings.source)
        .context("failed to build quote source client")?;
    let connector = RedshiftConnector::new(settings.warehouse.clone());

    Ok(Pipeline::new(
        Arc::new(source),
        Arc::new(connector),
        handoff,
        settings.table.clone(),
    ))
}

async fn run_once(settings: &Settings) -> Result<()> {
    let pipeline = build_pipeline(settings, Arc::new(MemoryHandoff::new()))?;
    let tracker = RunTracker::new(Arc::new(pipeline));

    let report = tracker.run_exclusive("cli", RetryPolicy::none()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn schedule(settings: &Settings) -> Result<()> {
    let pipeline = build_pipeline(settings, Arc::new(MemoryHandoff::new()))?;
    let tracker = Arc::new(RunTracker::new(Arc::new(pipeline)));

    let mut scheduler = JobSchedulerService::new(tracker.clone(), &settings.scheduler).await?;
    scheduler.start().await?;

    let app = app::create_app(AppState { tracker });
    let listener = TcpListener::bind(settings.scheduler.status_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.scheduler.status_addr))?;
    info!("🚀 Status server running at http://{}/", settings.scheduler.status_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await?;

    scheduler.stop().await?;
    Ok(())
}

fn print_outcome(outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Checked => println!("preflight checks passed"),
        StepOutcome::Extracted { watermark, fetched, kept } => match watermark {
            Some(ts) => println!("extracted {} of {} quotes newer than {}", kept, fetched, ts),
            None => println!("extracted {} of {} quotes (full load)", kept, fetched),
        },
        StepOutcome::Transformed { rows, unmapped } => {
            println!("transformed {} rows ({} without type mapping)", rows, unmapped)
        }
        StepOutcome::Loaded(report) => println!(
            "inserted {} rows{}",
            report.rows_inserted,
            if report.table_created { " into newly created table" } else { "" }
        ),
    }
}
