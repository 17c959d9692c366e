//! inventory-pipeline - daily inventory anomaly pipeline
//!
//! Usage:
//!   inventory-pipeline run --input data/raw/inventory.csv
//!   inventory-pipeline run --config pipeline.json --skip-alerts
//!   inventory-pipeline score --model models/isolation_forest_model.iforest.gz --input new.csv

use clap::{Parser, Subcommand};
use inventory_sentinel::{
    score_file, ChannelKind, LogChannel, OutboxChannel, Pipeline, PipelineConfig, Result,
    RunOptions,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inventory-pipeline")]
#[command(about = "Validate, forecast and score daily inventory data for anomalies")]
struct Cli {
    /// JSON configuration file; defaults apply to absent fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline
    Run {
        /// Input CSV (overrides paths.data_file)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Do not send alerts
        #[arg(long)]
        skip_alerts: bool,

        /// Also deliver alerts to email channels
        #[arg(long)]
        send_email: bool,

        /// Do not write the run report
        #[arg(long)]
        skip_report: bool,

        /// Append webhook alerts as JSON lines to this file
        #[arg(long)]
        webhook_outbox: Option<PathBuf>,

        /// Append email alerts as JSON lines to this file
        #[arg(long)]
        email_outbox: Option<PathBuf>,
    },

    /// Score an input file with a saved model
    Score {
        /// Model artifact (.iforest or .iforest.gz)
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Scored CSV output
        #[arg(short, long, default_value = "scored.csv")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Run {
            input,
            skip_alerts,
            send_email,
            skip_report,
            webhook_outbox,
            email_outbox,
        } => {
            let mut pipeline = Pipeline::new(config)?.with_channel(LogChannel::default());
            if let Some(path) = webhook_outbox {
                pipeline = pipeline.with_channel(OutboxChannel::new("webhook", ChannelKind::Webhook, path));
            }
            if let Some(path) = email_outbox {
                pipeline = pipeline.with_channel(OutboxChannel::new("email", ChannelKind::Email, path));
            }

            let summary = pipeline.run(&RunOptions {
                input,
                send_alerts: !skip_alerts,
                send_email,
                generate_report: !skip_report,
            })?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Score {
            model,
            input,
            output,
        } => {
            let scored = score_file(&config, &model, &input, &output)?;
            println!(
                "{} rows scored, {} anomalies ({:.2}%) -> {}",
                scored.scored_count(),
                scored.anomaly_count(),
                scored.anomaly_percentage(),
                output.display()
            );
        }
    }
    Ok(())
}
