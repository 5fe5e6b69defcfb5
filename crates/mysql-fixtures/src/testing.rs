//! In-memory seed backend for tests.
//!
//! Mimics the parts of MySQL a seed run depends on: a catalog of foreign keys,
//! foreign-key enforcement on insert, and transactions that either commit all
//! staged rows or discard them.

use crate::insert::InsertStatement;
use crate::seeder::{SeedDatabase, SeedTransaction};
use async_trait::async_trait;
use seed_core::{BoxError, Record, Relation, SeedResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single-column foreign key.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKey {
    pub fn new(
        table: &str,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
        }
    }
}

/// Committed state plus counters for asserting transactional behaviour.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: BTreeMap<String, Vec<Record>>,
    foreign_keys: Vec<ForeignKey>,
    pub transactions_started: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub statements_executed: usize,
}

impl InMemoryDatabase {
    pub fn new(tables: &[&str], foreign_keys: Vec<ForeignKey>) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
            foreign_keys,
            ..Self::default()
        }
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> &[Record] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Insert committed rows directly, bypassing transactions.
    pub fn preload(&mut self, table: &str, rows: Vec<Record>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }
}

#[async_trait]
impl SeedDatabase for InMemoryDatabase {
    async fn foreign_key_relations(&mut self) -> SeedResult<Vec<Relation>> {
        // Primary keys show up in the catalog with no referenced table.
        let mut relations: Vec<Relation> = self
            .tables
            .keys()
            .map(|table| Relation {
                table: table.clone(),
                referenced_table: None,
            })
            .collect();
        relations.extend(
            self.foreign_keys
                .iter()
                .map(|fk| Relation::new(fk.table.clone(), fk.referenced_table.clone())),
        );
        Ok(relations)
    }

    async fn begin<'a>(&'a mut self) -> SeedResult<Box<dyn SeedTransaction + 'a>> {
        self.transactions_started += 1;
        Ok(Box::new(InMemoryTransaction {
            db: self,
            staged: BTreeMap::new(),
        }))
    }
}

struct InMemoryTransaction<'a> {
    db: &'a mut InMemoryDatabase,
    staged: BTreeMap<String, Vec<Record>>,
}

impl InMemoryTransaction<'_> {
    fn visible_rows<'s>(&'s self, table: &str) -> impl Iterator<Item = &'s Record> + 's {
        self.db
            .rows(table)
            .iter()
            .chain(self.staged.get(table).into_iter().flatten())
    }

    fn check_foreign_keys(&self, table: &str, row: &Record) -> Result<(), BoxError> {
        for fk in self.db.foreign_keys.iter().filter(|fk| fk.table == table) {
            let Some(value) = row.get(&fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let exists = self
                .visible_rows(&fk.referenced_table)
                .any(|referenced| referenced.get(&fk.referenced_column) == Some(value));
            if !exists {
                return Err(format!(
                    "Cannot add or update a child row: a foreign key constraint fails \
                     (`{}`.`{}` references `{}`.`{}` = {})",
                    fk.table, fk.column, fk.referenced_table, fk.referenced_column, value
                )
                .into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SeedTransaction for InMemoryTransaction<'_> {
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, BoxError> {
        self.db.statements_executed += 1;
        if !self.db.tables.contains_key(&statement.table) {
            return Err(format!("Table '{}' doesn't exist", statement.table).into());
        }

        for values in &statement.rows {
            let row: Record = statement
                .columns
                .iter()
                .zip(values)
                .filter_map(|(column, value)| {
                    value
                        .as_ref()
                        .map(|v: &Value| (column.clone(), v.clone()))
                })
                .collect();
            self.check_foreign_keys(&statement.table, &row)?;
            self.staged
                .entry(statement.table.clone())
                .or_default()
                .push(row);
        }

        Ok(statement.row_count() as u64)
    }

    async fn commit(&mut self) -> Result<(), BoxError> {
        for (table, rows) in std::mem::take(&mut self.staged) {
            self.db.tables.entry(table).or_default().extend(rows);
        }
        self.db.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxError> {
        self.staged.clear();
        self.db.rollbacks += 1;
        Ok(())
    }
}
