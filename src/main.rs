//! Command-line interface for fixture-reset
//!
//! # Usage Examples
//!
//! ## Seed
//! ```bash
//! # Seed the `app` database from fixtures/db
//! fixture-reset seed --mysql-database app
//!
//! # Show the seed order and row counts without writing
//! fixture-reset seed --mysql-database app --dry-run
//!
//! # Use a custom table registry
//! fixture-reset seed --schema fixtures/schema.yaml --fixtures-dir fixtures/db
//! ```
//!
//! ## Mirror
//! ```bash
//! # Mirror every bucket directory under fixtures/s3 into a local emulator
//! AWS_ENDPOINT_URL=http://localhost:4566 fixture-reset mirror --s3-force-path-style
//! ```
//!
//! ## Reset
//! ```bash
//! # Seed, then mirror, giving up after five minutes
//! fixture-reset reset --timeout 5m
//! ```

use clap::{Parser, Subcommand};
use fixture_reset::config::parse_duration;
use fixture_reset::{run_mirror, run_seed, shutdown_token, MirrorOpts, MySqlOpts, SeedOpts};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "fixture-reset")]
#[command(about = "Reset MySQL and S3 to a known fixture state")]
#[command(version)]
struct Cli {
    /// Cancel the run after this long (e.g. "300", "30s", "5m", "1h")
    #[arg(long, global = true, env = "RESET_TIMEOUT")]
    timeout: Option<String>,

    /// Plan only: report what would change without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed MySQL tables from JSON fixtures in foreign-key order
    Seed {
        #[command(flatten)]
        mysql: MySqlOpts,

        #[command(flatten)]
        seed: SeedOpts,
    },

    /// Replace the contents of each bucket with its fixture directory
    Mirror {
        #[command(flatten)]
        mirror: MirrorOpts,
    },

    /// Seed MySQL, then mirror buckets
    Reset {
        #[command(flatten)]
        mysql: MySqlOpts,

        #[command(flatten)]
        seed: SeedOpts,

        #[command(flatten)]
        mirror: MirrorOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let timeout = cli.timeout.as_deref().map(parse_duration).transpose()?;
    let cancel = shutdown_token(timeout);

    if cli.dry_run {
        tracing::info!("Running in dry-run mode - no data will be written");
    }

    let result = execute(cli.command, cli.dry_run, &cancel).await;

    // Stop the signal watcher
    cancel.cancel();

    result?;
    tracing::info!("Fixture reset completed");
    Ok(())
}

async fn execute(
    command: Commands,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Commands::Seed { mysql, seed } => {
            run_seed(&mysql, &seed, dry_run, cancel).await?;
        }
        Commands::Mirror { mirror } => {
            run_mirror(&mirror, dry_run, cancel).await?;
        }
        Commands::Reset {
            mysql,
            seed,
            mirror,
        } => {
            tracing::info!("Resetting relational fixtures");
            run_seed(&mysql, &seed, dry_run, cancel).await?;
            tracing::info!("Resetting bucket fixtures");
            run_mirror(&mirror, dry_run, cancel).await?;
        }
    }
    Ok(())
}
