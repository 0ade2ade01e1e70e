//! UPDATE query builder.

use crate::binding::Bindings;
use crate::condition::{Conditional, Where};
use crate::error::{QbError, QbResult};
use crate::expr::{Expr, Operand};
use crate::qb::statement::{Statement, StatementKind};
use crate::qb::traits::{Mutation, QueryBuilder};
use crate::value::Value;

/// UPDATE query builder.
#[derive(Debug, Clone)]
pub struct Update {
    /// Table name
    table: String,
    /// SET clauses, one per field
    assignments: Vec<(String, Operand)>,
    /// WHERE conditions
    conditions: Where,
    /// ORDER BY entries
    order_by: Vec<String>,
    limit: Option<u64>,
    /// RETURNING columns
    returning: Vec<String>,
    /// First invalid argument passed to a chained call
    error: Option<String>,
    statement: Statement,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            conditions: Where::new(),
            order_by: Vec::new(),
            limit: None,
            returning: Vec::new(),
            error: None,
            statement: Statement::default(),
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut Self)) -> Self {
        self.statement.reset();
        f(&mut self);
        self
    }

    fn assign(&mut self, field: String, operand: Operand) {
        match self.assignments.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = operand,
            None => self.assignments.push((field, operand)),
        }
    }

    /// `SET field = value`. Setting a field again replaces the earlier value
    /// (including an earlier increment) in place.
    pub fn set(self, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        let (field, value) = (field.into(), value.into());
        self.edit(|s| s.assign(field, value))
    }

    pub fn set_values<I, K, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        let values: Vec<(String, Operand)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.edit(|s| {
            for (field, value) in values {
                s.assign(field, value);
            }
        })
    }

    /// `SET field = field + amount`. A negative amount subtracts.
    ///
    /// `amount` must be numeric; anything else fails at compile time.
    pub fn increment(self, field: impl Into<String>, amount: impl Into<Value>) -> Self {
        self.step(field.into(), amount.into(), false)
    }

    /// `SET field = field - amount`.
    pub fn decrement(self, field: impl Into<String>, amount: impl Into<Value>) -> Self {
        self.step(field.into(), amount.into(), true)
    }

    fn step(self, field: String, amount: Value, subtract: bool) -> Self {
        let (negative, magnitude) = match amount {
            Value::Int(n) => (n < 0, n.unsigned_abs().to_string()),
            Value::Float(x) if x.is_finite() => (x < 0.0, x.abs().to_string()),
            other => {
                let message = format!("non-numeric step {other:?} for '{field}'");
                return self.edit(|s| {
                    s.error.get_or_insert(message);
                });
            }
        };
        let sign = if negative != subtract { '-' } else { '+' };
        let expr = Expr::new(format!("{field} {sign} {magnitude}"));
        self.edit(|s| s.assign(field, expr.into()))
    }

    pub fn order_by(self, field: impl Into<String>) -> Self {
        let clause = format!("{} ASC", field.into());
        self.edit(|s| s.order_by.push(clause))
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        let clause = format!("{} DESC", field.into());
        self.edit(|s| s.order_by.push(clause))
    }

    /// `LIMIT count` (MySQL and SQLite builds that allow it).
    pub fn limit(self, count: u64) -> Self {
        self.edit(|s| s.limit = Some(count))
    }

    pub fn returning<I, S>(self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cols: Vec<String> = cols.into_iter().map(Into::into).collect();
        self.edit(|s| s.returning = cols)
    }

    pub fn connection(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.edit(|s| s.statement.set_connection(Some(name)))
    }
}

impl Conditional for Update {
    fn conditions(&self) -> &Where {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Where {
        self.statement.reset();
        &mut self.conditions
    }
}

impl QueryBuilder for Update {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        if let Some(message) = &self.error {
            return Err(QbError::build(format!("UPDATE {}: {message}", self.table)));
        }
        if self.table.trim().is_empty() {
            return Err(QbError::build("UPDATE has no table"));
        }
        if self.assignments.is_empty() {
            return Err(QbError::build(format!("UPDATE {}: empty SET clause", self.table)));
        }

        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, operand)| format!("{field} = {}", operand.render(field, bindings)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));

        if self.conditions.has_where() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.build(bindings)?);
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
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

impl Mutation for Update {}
