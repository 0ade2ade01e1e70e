//! In-memory adapter that records every statement it is asked to run.

use super::{Adapter, Dialect, StatementHandle};
use crate::error::DriverError;
use crate::query::Query;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug)]
pub(crate) struct RecordingAdapter {
    dialect: Dialect,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected: Option<u64>,
    table_columns: Vec<String>,
    fail_with: Option<(bool, String)>,
    executed: Mutex<Vec<Query>>,
}

impl RecordingAdapter {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            columns: Vec::new(),
            rows: Vec::new(),
            affected: None,
            table_columns: Vec::new(),
            fail_with: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Result set returned by every execution.
    pub(crate) fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows;
        self
    }

    /// Affected-row count reported by every execution.
    pub(crate) fn with_affected(mut self, affected: u64) -> Self {
        self.affected = Some(affected);
        self
    }

    pub(crate) fn with_table_columns(mut self, columns: &[&str]) -> Self {
        self.table_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Fail every execution, after (`prepared = true`) or before preparing.
    pub(crate) fn failing(mut self, prepared: bool, message: &str) -> Self {
        self.fail_with = Some((prepared, message.to_string()));
        self
    }

    pub(crate) fn executions(&self) -> usize {
        self.executed.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub(crate) fn executed(&self) -> Vec<Query> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn prepare_and_execute(&self, query: &Query) -> Result<StatementHandle, DriverError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(query.clone());
        }
        if let Some((prepared, message)) = &self.fail_with {
            return Err(DriverError {
                prepared: *prepared,
                source: message.clone().into(),
            });
        }
        let mut handle = StatementHandle::from_values(self.columns.clone(), self.rows.clone());
        if let Some(affected) = self.affected {
            handle = StatementHandle::new(
                handle.columns().into(),
                handle.fetch_all(),
                affected,
            );
        }
        Ok(handle)
    }

    async fn table_columns(&self, _table: &str) -> Result<Vec<String>, DriverError> {
        Ok(self.table_columns.clone())
    }
}
