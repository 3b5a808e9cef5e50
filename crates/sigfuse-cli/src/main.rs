mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sigfuse")]
#[command(about = "Fuse competitor, customer and trend signals into offer concepts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one strategy pipeline and print the report
    Run {
        /// Mechanics already covered by our own offers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        active: Vec<String>,

        /// Seed for reproducible synthetic sampling (overrides SIGFUSE_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// YAML fixture file to read records from instead of sampling
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = sigfuse_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, reference_date = %config.scoring.reference_date, "configuration loaded");

    match cli.command {
        Commands::Run {
            active,
            seed,
            fixtures,
            json,
        } => {
            run::run_strategy(
                &config,
                run::RunArgs {
                    active,
                    seed,
                    fixtures,
                    json,
                },
            )
            .await?;
        }
    }

    Ok(())
}
