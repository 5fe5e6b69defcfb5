//! MySQL connection handling and the `mysql_async` seed backend.

use crate::catalog::introspect_relations;
use crate::insert::InsertStatement;
use crate::seeder::{SeedDatabase, SeedTransaction};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, Transaction, TxOpts};
use seed_core::{BoxError, Relation, SeedError, SeedResult};
use tracing::debug;

/// MySQL connection options
#[derive(Clone, Debug)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl MySqlConfig {
    /// Connection target for logging; never includes the password.
    pub fn display_target(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    fn opts(&self) -> OptsBuilder {
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
    }
}

/// Create the connection pool for a run.
pub fn new_mysql_pool(config: &MySqlConfig) -> Pool {
    debug!("Creating MySQL pool for {}", config.display_target());
    Pool::new(config.opts())
}

/// Seed backend over a single pooled MySQL connection.
pub struct MySqlDatabase {
    conn: Conn,
}

impl MySqlDatabase {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    /// Check out a connection from `pool`.
    pub async fn connect(pool: &Pool) -> SeedResult<Self> {
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| SeedError::database("connecting to MySQL", e))?;
        Ok(Self::new(conn))
    }

    pub fn into_inner(self) -> Conn {
        self.conn
    }
}

#[async_trait]
impl SeedDatabase for MySqlDatabase {
    async fn foreign_key_relations(&mut self) -> SeedResult<Vec<Relation>> {
        introspect_relations(&mut self.conn).await
    }

    async fn begin<'a>(&'a mut self) -> SeedResult<Box<dyn SeedTransaction + 'a>> {
        let tx = self
            .conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(|e| SeedError::database("starting the seed transaction", e))?;
        Ok(Box::new(MySqlTransaction { tx: Some(tx) }))
    }
}

/// An open `mysql_async` transaction.
///
/// Dropping it without commit leaves `mysql_async` to roll back when the
/// connection is next used or returned to the pool.
struct MySqlTransaction<'a> {
    tx: Option<Transaction<'a>>,
}

impl<'a> MySqlTransaction<'a> {
    fn open(&mut self) -> Result<&mut Transaction<'a>, BoxError> {
        self.tx
            .as_mut()
            .ok_or_else(|| "transaction already finished".into())
    }
}

#[async_trait]
impl SeedTransaction for MySqlTransaction<'_> {
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, BoxError> {
        let sql = statement.to_sql();
        let tx = self.open()?;
        tx.exec_drop(sql, statement.params()).await?;
        Ok(statement.row_count() as u64)
    }

    async fn commit(&mut self) -> Result<(), BoxError> {
        let tx = self
            .tx
            .take()
            .ok_or("transaction already finished")?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
