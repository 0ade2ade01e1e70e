//! INSERT query builder.

use crate::binding::Bindings;
use crate::error::{QbError, QbResult};
use crate::expr::Operand;
use crate::qb::build_subquery;
use crate::qb::select::Select;
use crate::qb::statement::{Statement, StatementKind};
use crate::qb::traits::{Mutation, QueryBuilder};

/// One row of literal values.
#[derive(Debug, Clone)]
enum InsertRow {
    /// field → value pairs
    Keyed(Vec<(String, Operand)>),
    /// values in field-list order
    Positional(Vec<Operand>),
}

/// INSERT query builder.
///
/// Rows are either keyed (`field → value`) or positional; one statement uses
/// one shape. Alternatively the rows come from a [`Select`] (`INSERT ... SELECT`).
#[derive(Debug, Clone)]
pub struct Insert {
    /// Target table
    table: String,
    /// Explicit field list; inferred from the first keyed row when empty
    fields: Vec<String>,
    /// Literal rows
    rows: Vec<InsertRow>,
    /// Source query, exclusive with `rows`
    source: Option<Box<Select>>,
    /// RETURNING columns
    returning: Vec<String>,
    statement: Statement,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            rows: Vec::new(),
            source: None,
            returning: Vec::new(),
            statement: Statement::default(),
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut Self)) -> Self {
        self.statement.reset();
        f(&mut self);
        self
    }

    /// Set the field list explicitly.
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.edit(|s| s.fields = fields)
    }

    /// Append one keyed row.
    ///
    /// ```ignore
    /// let q = qb::insert("users").row([("name", "Alice")]);
    /// ```
    pub fn row<I, K, V>(self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        let row: Vec<(String, Operand)> = row
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.edit(|s| s.rows.push(InsertRow::Keyed(row)))
    }

    /// Append several keyed rows.
    pub fn rows<R, I, K, V>(self, rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        rows.into_iter().fold(self, |q, row| q.row(row))
    }

    /// Append a row of values in field-list order. Short rows are padded with `NULL`.
    pub fn positional_row<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let values: Vec<Operand> = values.into_iter().map(Into::into).collect();
        self.edit(|s| s.rows.push(InsertRow::Positional(values)))
    }

    /// Insert the result of `select` instead of literal rows.
    pub fn select(self, select: Select) -> Self {
        self.edit(|s| s.source = Some(Box::new(select)))
    }

    /// Set RETURNING columns.
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

    /// Number of literal rows.
    pub fn row_len(&self) -> usize {
        self.rows.len()
    }

    /// The field list the statement is emitted with.
    fn effective_fields(&self) -> Vec<String> {
        if !self.fields.is_empty() {
            return self.fields.clone();
        }
        match self.rows.first() {
            Some(InsertRow::Keyed(pairs)) => {
                let mut fields: Vec<String> = Vec::with_capacity(pairs.len());
                for (key, _) in pairs {
                    if !fields.contains(key) {
                        fields.push(key.clone());
                    }
                }
                fields
            }
            _ => Vec::new(),
        }
    }

    fn check_shapes(&self) -> QbResult<()> {
        let keyed = self.rows.iter().filter(|r| matches!(r, InsertRow::Keyed(_))).count();
        if keyed != 0 && keyed != self.rows.len() {
            return Err(QbError::build(format!(
                "INSERT INTO {}: cannot mix positional and keyed rows",
                self.table
            )));
        }
        Ok(())
    }

    fn build_values(&self, fields: &[String], bindings: &mut Bindings) -> QbResult<String> {
        let width = if fields.is_empty() {
            self.rows
                .iter()
                .map(|r| match r {
                    InsertRow::Positional(values) => values.len(),
                    InsertRow::Keyed(pairs) => pairs.len(),
                })
                .max()
                .unwrap_or(0)
        } else {
            fields.len()
        };
        if width == 0 {
            return Err(QbError::build(format!("INSERT INTO {}: rows have no values", self.table)));
        }

        let multi = self.rows.len() > 1;
        let base = |idx: usize, col: usize| {
            let field = fields.get(col).cloned().unwrap_or_else(|| format!("c{col}"));
            if multi { format!("r{idx}_{field}") } else { field }
        };

        let mut groups = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.rows.iter().enumerate() {
            let mut parts = Vec::with_capacity(width);
            match row {
                InsertRow::Keyed(pairs) => {
                    if let Some((key, _)) = pairs.iter().find(|(k, _)| !fields.contains(k)) {
                        return Err(QbError::build(format!(
                            "INSERT INTO {}: row {idx} sets '{key}' which is not in the field list",
                            self.table
                        )));
                    }
                    for (col, field) in fields.iter().enumerate() {
                        // last occurrence of a key wins
                        match pairs.iter().rev().find(|(k, _)| k == field) {
                            Some((_, operand)) => parts.push(operand.render(&base(idx, col), bindings)),
                            None => parts.push("NULL".to_string()),
                        }
                    }
                }
                InsertRow::Positional(values) => {
                    if values.len() > width {
                        return Err(QbError::build(format!(
                            "INSERT INTO {}: row {idx} has {} values for {width} fields",
                            self.table,
                            values.len()
                        )));
                    }
                    for col in 0..width {
                        match values.get(col) {
                            Some(operand) => parts.push(operand.render(&base(idx, col), bindings)),
                            None => parts.push("NULL".to_string()),
                        }
                    }
                }
            }
            groups.push(format!("({})", parts.join(", ")));
        }
        Ok(groups.join(", "))
    }
}

impl QueryBuilder for Insert {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        if self.table.trim().is_empty() {
            return Err(QbError::build("INSERT has no table"));
        }
        self.check_shapes()?;
        let fields = self.effective_fields();

        let mut sql = format!("INSERT INTO {}", self.table);
        if !fields.is_empty() {
            sql.push_str(&format!(" ({})", fields.join(", ")));
        }

        match (&self.source, self.rows.is_empty()) {
            (Some(_), false) => {
                return Err(QbError::build(format!(
                    "INSERT INTO {}: literal rows and a source SELECT are exclusive",
                    self.table
                )));
            }
            (Some(source), true) => {
                sql.push(' ');
                sql.push_str(&build_subquery(source, bindings)?);
            }
            (None, true) => {
                return Err(QbError::build(format!("INSERT INTO {}: no rows to insert", self.table)));
            }
            (None, false) => {
                sql.push_str(" VALUES ");
                sql.push_str(&self.build_values(&fields, bindings)?);
            }
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

impl Mutation for Insert {}
