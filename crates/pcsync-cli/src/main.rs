mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pcsync")]
#[command(about = "PC Service to Shopify catalog sync")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stage the previous day's source changes into a snapshot CSV
    Stage {
        /// Snapshot date (DD_MM_YYYY); the day before it is fetched.
        /// Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Reconcile a staged snapshot against the Shopify catalog
    Sync {
        /// Snapshot date (DD_MM_YYYY). Defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// Plan and report without writing to Shopify or sending mail
        #[arg(long)]
        dry_run: bool,
    },
    /// Stage then sync, as the scheduled daily job does
    Run,
    /// List the shop's inventory locations
    Locations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pcsync: no command given (try --help)");
        return Ok(());
    };

    let config = pcsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Stage { date } => commands::run_stage(&config, date.as_deref()).await,
        Commands::Sync { date, dry_run } => {
            commands::run_sync(&config, date.as_deref(), dry_run).await
        }
        Commands::Run => commands::run_daily(&config).await,
        Commands::Locations => commands::run_locations(&config).await,
    }
}
