use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simex_core::domain::{Kind, ModelKind, ModuleRegistry};
use simex_core::{
    Pipeline, PipelineBuilder, PipelineConfig, PipelineError, SchedulerLoop, TaskEvent,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated execution pipeline driver
#[derive(Parser)]
#[command(name = "simex", version, about = "Run and inspect the simulated execution pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an end-to-end session: one intent, one prediction, one wallet transaction
    Demo {
        /// JSON config file (missing fields fall back to defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the length of one time unit in milliseconds
        #[arg(long)]
        time_unit_ms: Option<u64>,

        /// Leave the gasless module disabled (the gasless transaction is rejected)
        #[arg(long)]
        skip_gasless_enable: bool,
    },

    /// Print the prediction model catalog
    Models,

    /// Print the wallet module catalog
    Modules,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            config,
            time_unit_ms,
            skip_gasless_enable,
        } => cmd_demo(config, time_unit_ms, skip_gasless_enable).await,
        Commands::Models => cmd_models(),
        Commands::Modules => cmd_modules(),
    }
}

fn load_config(path: Option<PathBuf>, time_unit_ms: Option<u64>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(ms) = time_unit_ms {
        config.time_unit_ms = ms;
    }
    Ok(config)
}

async fn cmd_demo(
    config: Option<PathBuf>,
    time_unit_ms: Option<u64>,
    skip_gasless_enable: bool,
) -> Result<()> {
    let config = load_config(config, time_unit_ms)?;
    let tick = Duration::from_millis(config.time_unit_ms);
    let pipeline = PipelineBuilder::new()
        .config(config)
        .build()
        .context("building pipeline")?;

    let printer = tokio::spawn(print_events(pipeline.subscribe()));
    let driver = SchedulerLoop::spawn(pipeline.clone());

    // intent: submit -> simulate -> execute
    let intent = pipeline
        .submit_intent("Get 5% yield on my ETH with low risk", "1.0", Some("low"))
        .await?;
    let preview = pipeline
        .simulate_intent("Get 5% yield on my ETH with low risk", "1.0")
        .await?;
    info!(route = %preview.route_summary(), apy = %preview.estimated_apy, "route preview");
    pipeline.execute_intent(intent).await?;

    // prediction: one rejected for a missing field, one accepted
    let mut fields: BTreeMap<String, String> = ModelKind::CreditRisk
        .spec()
        .fields
        .iter()
        .map(|field| (field.key.to_string(), field.placeholder.to_string()))
        .collect();
    let employment = fields.remove("employment");
    if let Err(err) = pipeline.submit_prediction("credit-risk", fields.clone()).await {
        report_rejection("prediction", &err);
    }
    if let Some(employment) = employment {
        fields.insert("employment".to_string(), employment);
    }
    pipeline.submit_prediction("credit-risk", fields).await?;

    // wallet: gasless is gated until the module is enabled
    if let Err(err) = pipeline.submit_wallet_transaction("gasless", "0.1").await {
        report_rejection("wallet transaction", &err);
    }
    if !skip_gasless_enable {
        pipeline.toggle_wallet_module("gasless").await?;
        pipeline.submit_wallet_transaction("gasless", "0.1").await?;
    }

    tokio::select! {
        _ = wait_until_idle(&pipeline, tick) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    driver.shutdown_and_join().await;
    // let the printer drain what is already buffered
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();

    for kind in Kind::ALL {
        let snapshot = pipeline.snapshot(kind).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

/// Plain message for input problems; `None` means a pipeline bug.
fn rejection_notice(what: &str, err: &PipelineError) -> Option<String> {
    err.is_user_facing().then(|| format!("{what} rejected: {err}"))
}

fn report_rejection(what: &str, err: &PipelineError) {
    match rejection_notice(what, err) {
        Some(notice) => eprintln!("{notice}"),
        None => error!(error = %err, what, "internal pipeline error"),
    }
}

async fn wait_until_idle(pipeline: &Pipeline, tick: Duration) {
    while pipeline.pending_transitions().await > 0 {
        tokio::time::sleep(tick).await;
    }
}

async fn print_events(mut events: broadcast::Receiver<TaskEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "event not serializable"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn cmd_models() -> Result<()> {
    let specs: Vec<_> = ModelKind::ALL.iter().map(|model| model.spec()).collect();
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

fn cmd_modules() -> Result<()> {
    let modules = ModuleRegistry::new().list();
    println!("{}", serde_json::to_string_pretty(&modules)?);
    Ok(())
}
