//! Foreign-key discovery from `information_schema`.

use mysql_async::prelude::*;
use mysql_async::Conn;
use seed_core::{Relation, SeedError, SeedResult};

/// Key column usages of the connected schema. `REFERENCED_TABLE_NAME` is NULL
/// for primary and unique keys; those rows are dropped by the graph builder.
pub const FOREIGN_KEY_QUERY: &str = "
    SELECT TABLE_NAME, REFERENCED_TABLE_NAME
    FROM information_schema.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION";

/// Read every key column usage of the current database.
pub async fn introspect_relations(conn: &mut Conn) -> SeedResult<Vec<Relation>> {
    let rows: Vec<(String, Option<String>)> = conn
        .query(FOREIGN_KEY_QUERY)
        .await
        .map_err(|e| SeedError::database("querying foreign keys", e))?;

    Ok(rows
        .into_iter()
        .map(|(table, referenced_table)| Relation {
            table,
            referenced_table,
        })
        .collect())
}
