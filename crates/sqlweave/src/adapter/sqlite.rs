//! SQLite adapter over `rusqlite`.

use super::{Adapter, Dialect, StatementHandle};
use crate::error::{DriverError, QbError, QbResult};
use crate::ident::Ident;
use crate::query::{PlaceholderStyle, Query};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::types::{ToSqlOutput, ValueRef};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Bool(b) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Adapter over one `rusqlite::Connection`.
///
/// Statements run synchronously on the calling task while the connection
/// lock is held; SQLite connections are not shareable across threads.
pub struct SqliteAdapter {
    conn: Mutex<Connection>,
}

impl SqliteAdapter {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> QbResult<Self> {
        Connection::open(path)
            .map(Self::new)
            .map_err(|e| QbError::Connection(e.to_string()))
    }

    pub fn open_in_memory() -> QbResult<Self> {
        Connection::open_in_memory()
            .map(Self::new)
            .map_err(|e| QbError::Connection(e.to_string()))
    }

    /// Run a batch of `;`-separated statements without bindings (schema setup).
    pub fn execute_batch(&self, sql: &str) -> QbResult<()> {
        self.lock()
            .map_err(|e| QbError::Connection(e.to_string()))?
            .execute_batch(sql)
            .map_err(|e| QbError::Connection(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DriverError> {
        self.conn
            .lock()
            .map_err(|_| DriverError::unprepared("sqlite connection lock poisoned"))
    }

    fn run(&self, query: &Query) -> Result<StatementHandle, DriverError> {
        let conn = self.lock()?;
        let sql = query.to_positional(PlaceholderStyle::NumberedQuestion);
        let mut stmt = conn.prepare(&sql).map_err(DriverError::unprepared)?;
        let params = rusqlite::params_from_iter(query.values());

        let column_count = stmt.column_count();
        if column_count == 0 {
            let affected = stmt.execute(params).map_err(DriverError::prepared)?;
            return Ok(StatementHandle::empty(affected as u64));
        }

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = stmt.query(params).map_err(DriverError::prepared)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(DriverError::prepared)? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(from_value_ref(
                    row.get_ref(idx).map_err(DriverError::prepared)?,
                ));
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        let returned = out.len() as u64;
        Ok(StatementHandle::new(columns, out, returned))
    }

    fn columns_of(&self, table: &str) -> Result<Vec<String>, DriverError> {
        let ident = Ident::parse(table).map_err(DriverError::unprepared)?;
        let pragma = match ident.qualifier() {
            Some(schema) => format!(
                "PRAGMA \"{}\".table_info(\"{}\")",
                schema.replace('"', "\"\""),
                ident.name().replace('"', "\"\"")
            ),
            None => format!("PRAGMA table_info(\"{}\")", ident.name().replace('"', "\"\"")),
        };
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&pragma).map_err(DriverError::unprepared)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>("name"))
            .map_err(DriverError::prepared)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DriverError::prepared)?;
        Ok(names)
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn prepare_and_execute(&self, query: &Query) -> Result<StatementHandle, DriverError> {
        self.run(query)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DriverError> {
        self.columns_of(table)
    }
}
