//! Transactional fixture seeding.
//!
//! A seed run resolves foreign keys from the catalog, orders the declared
//! tables, loads every fixture, and only then opens a single transaction that
//! receives all inserts. Anything that fails before the transaction leaves the
//! database untouched; anything that fails inside it is rolled back.

use crate::insert::{build_insert_statements, InsertStatement, DEFAULT_BATCH_SIZE};
use crate::registry::SchemaRegistry;
use async_trait::async_trait;
use seed_core::{
    filter_relations, BoxError, DependencyGraph, FixtureLoader, PlannedFixture, Relation,
    SeedError, SeedResult,
};
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A database that can report its foreign keys and run a seed transaction.
#[async_trait]
pub trait SeedDatabase: Send {
    /// Foreign-key usages from the live catalog, including rows whose
    /// referenced table is `None`.
    async fn foreign_key_relations(&mut self) -> SeedResult<Vec<Relation>>;

    /// Open the one transaction a seed run writes through.
    async fn begin<'a>(&'a mut self) -> SeedResult<Box<dyn SeedTransaction + 'a>>;
}

/// An open seed transaction.
#[async_trait]
pub trait SeedTransaction: Send {
    /// Execute one INSERT, returning the number of rows written.
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, BoxError>;

    async fn commit(&mut self) -> Result<(), BoxError>;

    async fn rollback(&mut self) -> Result<(), BoxError>;
}

/// Options for a seed run.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Maximum records per INSERT statement
    pub batch_size: usize,
    /// Plan only: resolve order and parse fixtures without opening a transaction
    pub dry_run: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

/// Outcome of a seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Tables in the order they were (or would be) seeded
    pub order: Vec<String>,
    /// Rows inserted per table, in seed order
    pub inserted: Vec<(String, u64)>,
    /// Tables without a fixture file
    pub skipped: Vec<String>,
    /// True when nothing was written because of `dry_run`
    pub dry_run: bool,
}

impl SeedReport {
    pub fn total_rows(&self) -> u64 {
        self.inserted.iter().map(|(_, rows)| rows).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<u64> {
        self.inserted
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| *rows)
    }
}

/// Run `future` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> SeedResult<T>
where
    F: Future<Output = SeedResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SeedError::Cancelled),
        result = future => result,
    }
}

/// Compute the seed order for the registry against the live catalog.
pub async fn resolve_seed_order<D>(
    db: &mut D,
    registry: &SchemaRegistry,
    cancel: &CancellationToken,
) -> SeedResult<Vec<String>>
where
    D: SeedDatabase + ?Sized,
{
    let rows = cancellable(cancel, db.foreign_key_relations()).await?;
    let relations = filter_relations(rows);
    debug!("Catalog reported {} foreign-key usages", relations.len());

    let graph = DependencyGraph::build(registry.table_names(), &relations)?;
    graph.sort()
}

/// Seed the database from `fixtures_dir`: order, load, then apply in one transaction.
pub async fn seed_database<D>(
    db: &mut D,
    registry: &SchemaRegistry,
    fixtures_dir: &Path,
    options: &SeedOptions,
    cancel: &CancellationToken,
) -> SeedResult<SeedReport>
where
    D: SeedDatabase + ?Sized,
{
    let order = resolve_seed_order(db, registry, cancel).await?;
    info!("Seed order: {}", order.join(" -> "));

    let loader = FixtureLoader::open(fixtures_dir).await?;
    let plan = loader.load_all(&order).await?;

    seed(db, registry, &plan, options, cancel).await
}

/// Apply a loaded plan inside a single transaction.
///
/// Tables without a fixture are skipped. If any insert fails, or `cancel`
/// fires before the commit, the transaction is rolled back and no rows from
/// this run remain.
pub async fn seed<D>(
    db: &mut D,
    registry: &SchemaRegistry,
    plan: &[PlannedFixture],
    options: &SeedOptions,
    cancel: &CancellationToken,
) -> SeedResult<SeedReport>
where
    D: SeedDatabase + ?Sized,
{
    let mut report = SeedReport {
        order: plan.iter().map(|(table, _)| table.clone()).collect(),
        dry_run: options.dry_run,
        ..SeedReport::default()
    };

    // Resolve handles and build every statement before touching the database.
    let mut batches: Vec<(&str, Vec<InsertStatement>)> = Vec::new();
    for (table, fixture) in plan {
        let descriptor = registry
            .get_table(table)
            .ok_or_else(|| SeedError::MissingHandle {
                table: table.clone(),
            })?;

        match fixture {
            Some(fixture) if !fixture.is_empty() => {
                let statements = build_insert_statements(descriptor, fixture, options.batch_size)?;
                batches.push((table.as_str(), statements));
            }
            Some(_) => {
                debug!("Fixture for {} is empty", table);
                report.inserted.push((table.clone(), 0));
            }
            None => {
                debug!("No fixture for {}, skipping", table);
                report.skipped.push(table.clone());
            }
        }
    }

    if options.dry_run {
        for (table, statements) in &batches {
            let rows: usize = statements.iter().map(InsertStatement::row_count).sum();
            info!("[dry run] would insert {} rows into {}", rows, table);
            report.inserted.push((table.to_string(), rows as u64));
        }
        report
            .inserted
            .sort_by_key(|(table, _)| report.order.iter().position(|t| t == table));
        return Ok(report);
    }

    if cancel.is_cancelled() {
        return Err(SeedError::Cancelled);
    }

    let mut tx = db.begin().await?;
    debug!("Seed transaction started");

    let applied = apply(tx.as_mut(), &batches, cancel).await;
    let applied = match applied {
        Ok(_) if cancel.is_cancelled() => Err(SeedError::Cancelled),
        other => other,
    };

    match applied {
        Ok(inserted) => {
            tx.commit()
                .await
                .map_err(|e| SeedError::database("committing the seed transaction", e))?;
            report.inserted.extend(inserted);
            report
                .inserted
                .sort_by_key(|(table, _)| report.order.iter().position(|t| t == table));
            info!(
                "Seed committed: {} rows across {} tables",
                report.total_rows(),
                report.inserted.len()
            );
            Ok(report)
        }
        Err(e) => {
            warn!("Seeding failed, rolling back: {}", e);
            if let Err(rollback_error) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback_error);
            }
            Err(e)
        }
    }
}

async fn apply(
    tx: &mut (dyn SeedTransaction + '_),
    batches: &[(&str, Vec<InsertStatement>)],
    cancel: &CancellationToken,
) -> SeedResult<Vec<(String, u64)>> {
    let mut inserted = Vec::with_capacity(batches.len());

    for (table, statements) in batches {
        let mut rows = 0;
        for statement in statements {
            let execute = async {
                tx.execute(statement).await.map_err(|e| SeedError::Insert {
                    table: table.to_string(),
                    reason: e.to_string(),
                })
            };
            rows += cancellable(cancel, execute).await?;
        }
        info!("Inserted {} rows into {}", rows, table);
        inserted.push((table.to_string(), rows));
    }

    Ok(inserted)
}
