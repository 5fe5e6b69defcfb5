//! Multi-row INSERT statements built from fixture records.

use crate::registry::TableDescriptor;
use mysql_async::{Params, Value};
use seed_core::{Fixture, SeedError, SeedResult};

/// Default number of records per INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One INSERT statement for a batch of fixture records.
///
/// `rows[i][j]` is the value for `columns[j]` in the i-th record; `None` means
/// the record omitted that column and the database default applies.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<serde_json::Value>>>,
}

impl InsertStatement {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render the statement with `?` placeholders and `DEFAULT` for omitted values.
    ///
    /// A batch of records that set no column renders as `() VALUES (), ...`,
    /// so every column takes its default.
    pub fn to_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(|value| if value.is_some() { "?" } else { "DEFAULT" })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!("INSERT INTO `{}` ({columns}) VALUES {rows}", self.table)
    }

    /// Positional parameters matching the placeholders of [`Self::to_sql`].
    pub fn params(&self) -> Params {
        let values: Vec<Value> = self
            .rows
            .iter()
            .flatten()
            .flatten()
            .map(json_to_mysql)
            .collect();

        if values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(values)
        }
    }
}

/// Convert a fixture value to a MySQL parameter.
///
/// Arrays and objects are sent as JSON text, booleans as 0/1.
pub fn json_to_mysql(value: &serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match value {
        Json::Null => Value::NULL,
        Json::Bool(b) => Value::Int(i64::from(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Double(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => Value::Bytes(s.as_bytes().to_vec()),
        Json::Array(_) | Json::Object(_) => Value::Bytes(value.to_string().into_bytes()),
    }
}

/// Build the INSERT statements for one table's fixture.
///
/// Record keys are mapped through the table descriptor; a key that matches no
/// declared column fails before anything is sent to the database.
pub fn build_insert_statements(
    descriptor: &TableDescriptor,
    fixture: &Fixture,
    batch_size: usize,
) -> SeedResult<Vec<InsertStatement>> {
    let batch_size = batch_size.max(1);
    let mut statements = Vec::new();

    for (chunk_index, chunk) in fixture.records.chunks(batch_size).enumerate() {
        let mut mapped: Vec<Vec<(&str, &serde_json::Value)>> = Vec::with_capacity(chunk.len());
        let mut columns: Vec<String> = Vec::new();

        for (offset, record) in chunk.iter().enumerate() {
            let mut row = Vec::with_capacity(record.len());
            for (key, value) in record {
                let column = descriptor
                    .column_for(key)
                    .ok_or_else(|| SeedError::Insert {
                        table: descriptor.name.clone(),
                        reason: format!(
                            "record {} has field '{key}' which is not a column of the table",
                            chunk_index * batch_size + offset
                        ),
                    })?;
                if column.is_empty() || column.contains('`') {
                    return Err(SeedError::Insert {
                        table: descriptor.name.clone(),
                        reason: format!("'{column}' is not a valid column name"),
                    });
                }
                if row.iter().any(|(existing, _)| *existing == column) {
                    return Err(SeedError::Insert {
                        table: descriptor.name.clone(),
                        reason: format!(
                            "record {} sets column '{column}' more than once",
                            chunk_index * batch_size + offset
                        ),
                    });
                }
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
                row.push((column, value));
            }
            mapped.push(row);
        }

        if !descriptor.columns.is_empty() {
            columns.sort_by_key(|c| descriptor.column_position(c));
        }

        let rows = mapped
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.iter()
                            .find(|(name, _)| *name == column.as_str())
                            .map(|(_, value)| (*value).clone())
                    })
                    .collect()
            })
            .collect();

        statements.push(InsertStatement {
            table: descriptor.name.clone(),
            columns,
            rows,
        });
    }

    Ok(statements)
}
