//! Fixture Reset Library
//!
//! Resets a development or test environment to a known data state.
//!
//! # Features
//!
//! - Relational seeding: tables are ordered by their foreign keys and every
//!   fixture is inserted inside one MySQL transaction
//! - Bucket mirroring: each S3 bucket is cleared page by page and then
//!   refilled from a local directory tree
//! - Dry runs for both paths
//!
//! # CLI Usage
//!
//! ```bash
//! # Seed MySQL from fixtures/db/<table>.json
//! MYSQL_DATABASE=app fixture-reset seed
//!
//! # Mirror fixtures/s3/<bucket>/ into each bucket
//! fixture-reset mirror --bucket avatars
//!
//! # Both, relational first
//! fixture-reset reset --timeout 5m
//! ```

use anyhow::Context;
use bucket_mirror::{mirror_all, MirrorOptions, MirrorReport, ObjectStore, S3Client};
use clap::Args;
use mysql_fixtures::{
    new_mysql_pool, seed_database, MySqlConfig, MySqlDatabase, SchemaRegistry, SeedDatabase,
    SeedOptions, SeedReport, DEFAULT_BATCH_SIZE,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod config;

#[derive(Args, Clone, Debug)]
pub struct MySqlOpts {
    /// MySQL host
    #[arg(long, default_value = "localhost", env = "MYSQL_HOST")]
    pub mysql_host: String,

    /// MySQL port
    #[arg(long, default_value = "3306", env = "MYSQL_PORT")]
    pub mysql_port: u16,

    /// MySQL username
    #[arg(long, default_value = "root", env = "MYSQL_USER")]
    pub mysql_user: String,

    /// MySQL password
    #[arg(long, default_value = "", env = "MYSQL_PASSWORD")]
    pub mysql_password: String,

    /// Database to seed
    #[arg(long, env = "MYSQL_DATABASE")]
    pub mysql_database: Option<String>,
}

impl MySqlOpts {
    pub fn to_config(&self) -> anyhow::Result<MySqlConfig> {
        let database = self
            .mysql_database
            .clone()
            .filter(|name| !name.is_empty())
            .context("MYSQL_DATABASE (or --mysql-database) is required for seeding")?;

        Ok(MySqlConfig {
            host: self.mysql_host.clone(),
            port: self.mysql_port,
            user: self.mysql_user.clone(),
            password: self.mysql_password.clone(),
            database,
        })
    }
}

#[derive(Args, Clone, Debug)]
pub struct SeedOpts {
    /// Directory holding one `<table>.json` file per table
    #[arg(long, default_value = "fixtures/db", env = "FIXTURES_DIR")]
    pub fixtures_dir: PathBuf,

    /// Table registry YAML; the built-in application schema is used when unset
    #[arg(long = "schema", env = "FIXTURE_SCHEMA")]
    pub schema_file: Option<PathBuf>,

    /// Maximum records per INSERT statement
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

impl SeedOpts {
    pub fn load_registry(&self) -> anyhow::Result<SchemaRegistry> {
        match &self.schema_file {
            Some(path) => SchemaRegistry::from_file(path)
                .with_context(|| format!("Failed to load table registry from {path:?}")),
            None => Ok(SchemaRegistry::application()),
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct MirrorOpts {
    /// Directory holding one subdirectory per bucket
    #[arg(long, default_value = "fixtures/s3", env = "BUCKET_FIXTURES_DIR")]
    pub bucket_fixtures_dir: PathBuf,

    /// Only mirror this bucket (repeatable)
    #[arg(long = "bucket")]
    pub buckets: Vec<String>,

    /// Use path-style addressing (needed by most local S3 emulators)
    #[arg(
        long,
        env = "S3_FORCE_PATH_STYLE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub s3_force_path_style: bool,
}

/// Token cancelled on Ctrl-C or once `timeout` elapses.
pub fn shutdown_token(timeout: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();
    let watcher = token.clone();

    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = watcher.cancelled() => return,
            _ = tokio::signal::ctrl_c() => warn!("Interrupted, cancelling"),
            _ = deadline => warn!("Timed out after {:?}, cancelling", timeout.unwrap_or_default()),
        }
        watcher.cancel();
    });

    token
}

/// Seed through an already connected database.
pub async fn seed_fixtures<D>(
    db: &mut D,
    opts: &SeedOpts,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<SeedReport>
where
    D: SeedDatabase + ?Sized,
{
    let registry = opts.load_registry()?;
    let options = SeedOptions {
        batch_size: opts.batch_size,
        dry_run,
    };

    let report = seed_database(db, &registry, &opts.fixtures_dir, &options, cancel)
        .await
        .context("Failed to seed database")?;

    if report.dry_run {
        info!(
            "[dry run] would insert {} rows into {} tables",
            report.total_rows(),
            report.inserted.len()
        );
    } else {
        info!(
            "Seeded {} rows into {} tables",
            report.total_rows(),
            report.inserted.len()
        );
    }
    for table in &report.skipped {
        info!("No fixture for table {}, skipped", table);
    }

    Ok(report)
}

/// Seed MySQL. The pool is disconnected whether or not seeding succeeds.
pub async fn run_seed(
    mysql: &MySqlOpts,
    opts: &SeedOpts,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<SeedReport> {
    let config = mysql.to_config()?;
    info!("Seeding {}", config.display_target());

    let pool = new_mysql_pool(&config);
    let result = async {
        let mut db = MySqlDatabase::connect(&pool)
            .await
            .with_context(|| format!("Failed to connect to {}", config.display_target()))?;
        seed_fixtures(&mut db, opts, dry_run, cancel).await
    }
    .await;

    if let Err(e) = pool.disconnect().await {
        warn!("Failed to disconnect MySQL pool: {e}");
    }

    result
}

/// Mirror bucket fixtures through any object store.
pub async fn mirror_fixtures<S>(
    store: &S,
    opts: &MirrorOpts,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<MirrorReport>>
where
    S: ObjectStore + ?Sized,
{
    let options = MirrorOptions {
        buckets: opts.buckets.clone(),
        dry_run,
    };

    let reports = mirror_all(store, &opts.bucket_fixtures_dir, &options, cancel)
        .await
        .context("Failed to mirror bucket fixtures")?;

    for report in &reports {
        info!(
            "Bucket {}: {} objects removed, {} uploaded",
            report.bucket, report.deleted, report.uploaded
        );
    }

    Ok(reports)
}

/// Mirror bucket fixtures into S3.
pub async fn run_mirror(
    opts: &MirrorOpts,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<Vec<MirrorReport>> {
    ensure_dir(&opts.bucket_fixtures_dir)?;
    let client = S3Client::new(opts.s3_force_path_style).await;
    mirror_fixtures(&client, opts, dry_run, cancel).await
}

fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Bucket fixtures directory {path:?} does not exist");
    }
    Ok(())
}
