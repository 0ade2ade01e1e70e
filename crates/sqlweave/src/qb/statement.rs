//! Compile memoization and execute-once state shared by every builder.

use crate::adapter::{Adapter, StatementHandle};
use crate::config::ExecConfig;
use crate::error::{ExecutionError, QbResult};
use crate::query::Query;
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, warn};

/// Statement kind, used in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        })
    }
}

/// Per-builder execution state.
///
/// Holds the target connection name, the last compiled [`Query`] and the
/// handle of the last execution. Any edit to the owning builder calls
/// [`reset`](Self::reset); cloning yields a fresh, unexecuted state.
#[derive(Debug, Default)]
pub struct Statement {
    connection: Option<String>,
    compiled: OnceLock<Query>,
    handle: Option<StatementHandle>,
}

impl Clone for Statement {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            compiled: OnceLock::new(),
            handle: None,
        }
    }
}

impl Statement {
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub(crate) fn set_connection(&mut self, name: Option<String>) {
        self.reset();
        self.connection = name;
    }

    pub fn was_executed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Forget the compiled query and the execution handle.
    pub fn reset(&mut self) {
        self.compiled = OnceLock::new();
        self.handle = None;
    }

    /// The memoized query, compiled with `build` on first use.
    pub(crate) fn memoize(&self, build: impl FnOnce() -> QbResult<Query>) -> QbResult<&Query> {
        if let Some(query) = self.compiled.get() {
            return Ok(query);
        }
        let query = build()?;
        Ok(self.compiled.get_or_init(|| query))
    }

    pub(crate) fn store(&mut self, handle: StatementHandle) {
        self.handle = Some(handle);
    }

    pub fn handle(&self) -> Option<&StatementHandle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut StatementHandle> {
        self.handle.as_mut()
    }
}

/// Hand `query` to `adapter`, logging on the `sqlweave.sql` target.
///
/// Driver failures come back as [`ExecutionError`] carrying the statement.
pub(crate) async fn run(
    query: &Query,
    kind: StatementKind,
    adapter: &dyn Adapter,
    config: &ExecConfig,
) -> QbResult<StatementHandle> {
    let sql = config.truncate_sql(query.sql());
    let connection = query.connection().unwrap_or("default");
    let param_count = query.bindings().len();
    if config.log_bindings {
        debug!(
            target: "sqlweave.sql",
            query_type = %kind,
            connection,
            dialect = %adapter.dialect(),
            param_count,
            bindings = ?query.bindings(),
            sql = %sql,
            "executing statement"
        );
    } else {
        debug!(
            target: "sqlweave.sql",
            query_type = %kind,
            connection,
            dialect = %adapter.dialect(),
            param_count,
            sql = %sql,
            "executing statement"
        );
    }

    let started = Instant::now();
    match adapter.prepare_and_execute(query).await {
        Ok(handle) => {
            let elapsed = started.elapsed();
            if config.is_slow(elapsed) {
                warn!(
                    target: "sqlweave.sql",
                    query_type = %kind,
                    connection,
                    elapsed_ms = elapsed.as_millis() as u64,
                    sql = %sql,
                    "slow query"
                );
            }
            Ok(handle)
        }
        Err(err) => {
            warn!(
                target: "sqlweave.sql",
                query_type = %kind,
                connection,
                prepared = err.prepared,
                error = %err,
                sql = %sql,
                "statement failed"
            );
            Err(ExecutionError {
                sql: query.sql().to_string(),
                bindings: query.bindings().to_vec(),
                connection: query.connection().map(String::from),
                prepared: err.prepared,
                source: err.source,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Bindings;

    #[test]
    fn test_memoize_builds_once() {
        let statement = Statement::default();
        let mut calls = 0;
        for _ in 0..3 {
            statement
                .memoize(|| {
                    calls += 1;
                    Ok(Query::new("SELECT 1", Bindings::new(), None))
                })
                .expect("compiled");
        }
        assert_eq!(calls, 1);
        assert!(statement.is_compiled());
    }

    #[test]
    fn test_clone_drops_derived_state() {
        let mut statement = Statement::default();
        statement.set_connection(Some("replica".to_string()));
        statement
            .memoize(|| Ok(Query::new("SELECT 1", Bindings::new(), None)))
            .expect("compiled");
        statement.store(StatementHandle::empty(1));

        let copy = statement.clone();
        assert_eq!(copy.connection(), Some("replica"));
        assert!(!copy.is_compiled());
        assert!(!copy.was_executed());
        assert!(statement.was_executed());
    }
}
