//! DELETE query builder.

use crate::binding::Bindings;
use crate::condition::{Conditional, Where};
use crate::error::{QbError, QbResult};
use crate::qb::statement::{Statement, StatementKind};
use crate::qb::traits::{Mutation, QueryBuilder};

/// DELETE query builder.
#[derive(Debug, Clone)]
pub struct Delete {
    /// Table name
    table: String,
    /// WHERE conditions
    conditions: Where,
    /// RETURNING columns
    returning: Vec<String>,
    statement: Statement,
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Where::new(),
            returning: Vec::new(),
            statement: Statement::default(),
        }
    }

    pub fn returning<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement.reset();
        self.returning = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.statement.set_connection(Some(name.into()));
        self
    }
}

impl Conditional for Delete {
    fn conditions(&self) -> &Where {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Where {
        self.statement.reset();
        &mut self.conditions
    }
}

impl QueryBuilder for Delete {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        if self.table.trim().is_empty() {
            return Err(QbError::build("DELETE has no table"));
        }
        let mut sql = format!("DELETE FROM {}", self.table);
        if self.conditions.has_where() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.build(bindings)?);
        }
        if !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning.join(", "));
        }
        Ok(sql)
    }

    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.statement
    }
}

impl Mutation for Delete {}
