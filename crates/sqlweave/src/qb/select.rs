//! SELECT query builder.

use crate::binding::Bindings;
use crate::condition::{Conditional, Where, normalize_operator};
use crate::error::{QbError, QbResult};
use crate::expr::{Expr, Operand};
use crate::qb::build_subquery;
use crate::qb::statement::{Statement, StatementKind};
use crate::qb::traits::{FetchRows, QueryBuilder};
use crate::value::Value;

/// A table or derived table in FROM / JOIN position.
#[derive(Debug, Clone)]
pub enum FromSource {
    Table { name: String, alias: Option<String> },
    SubQuery { select: Box<Select>, alias: String },
}

impl FromSource {
    pub fn table(name: impl Into<String>) -> Self {
        FromSource::Table {
            name: name.into(),
            alias: None,
        }
    }

    pub fn table_as(name: impl Into<String>, alias: impl Into<String>) -> Self {
        FromSource::Table {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn sub_query(select: Select, alias: impl Into<String>) -> Self {
        FromSource::SubQuery {
            select: Box::new(select),
            alias: alias.into(),
        }
    }

    fn write(&self, sql: &mut String, bindings: &mut Bindings) -> QbResult<()> {
        match self {
            FromSource::Table { name, alias } => {
                sql.push_str(name);
                if let Some(alias) = alias {
                    sql.push_str(" AS ");
                    sql.push_str(alias);
                }
            }
            FromSource::SubQuery { select, alias } => {
                if alias.trim().is_empty() {
                    return Err(QbError::build("a sub-select source needs an alias"));
                }
                sql.push('(');
                sql.push_str(&build_subquery(select, bindings)?);
                sql.push_str(") AS ");
                sql.push_str(alias);
            }
        }
        Ok(())
    }

    /// Table name, for table sources.
    pub(crate) fn table_name(&self) -> Option<&str> {
        match self {
            FromSource::Table { name, .. } => Some(name),
            FromSource::SubQuery { .. } => None,
        }
    }
}

impl From<&str> for FromSource {
    fn from(name: &str) -> Self {
        FromSource::table(name)
    }
}

impl From<String> for FromSource {
    fn from(name: String) -> Self {
        FromSource::table(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Right-hand side of one join predicate.
#[derive(Debug, Clone)]
enum JoinRhs {
    Column(String),
    Bound { name: String, operand: Operand },
}

#[derive(Debug, Clone)]
struct JoinPredicate {
    left: String,
    op: String,
    right: JoinRhs,
}

/// The ON clause of a join.
///
/// Built from:
/// - `(left, op, right)`: a column comparison
/// - a list or array of such tuples, ANDed together
/// - `(left, op, name, value)` tuples: `left op :name` with `value` bound
///   (or emitted verbatim when it is an [`Expr`])
/// - an [`Expr`], emitted verbatim
#[derive(Debug, Clone)]
pub struct JoinOn(JoinOnKind);

#[derive(Debug, Clone)]
enum JoinOnKind {
    Predicates(Vec<JoinPredicate>),
    Raw(Expr),
    None,
}

impl JoinOn {
    /// No ON clause (CROSS JOIN).
    pub fn none() -> Self {
        JoinOn(JoinOnKind::None)
    }

    fn write(&self, table: &str, sql: &mut String, bindings: &mut Bindings) -> QbResult<()> {
        match &self.0 {
            JoinOnKind::None => Ok(()),
            JoinOnKind::Raw(expr) => {
                if expr.as_str().trim().is_empty() {
                    return Err(QbError::build(format!("empty join condition for '{table}'")));
                }
                sql.push_str(" ON ");
                sql.push_str(expr.as_str());
                Ok(())
            }
            JoinOnKind::Predicates(predicates) => {
                if predicates.is_empty() {
                    return Err(QbError::build(format!("empty join condition for '{table}'")));
                }
                sql.push_str(" ON ");
                for (i, p) in predicates.iter().enumerate() {
                    let incomplete = p.left.trim().is_empty()
                        || p.op.trim().is_empty()
                        || matches!(&p.right, JoinRhs::Column(c) if c.trim().is_empty());
                    if incomplete {
                        return Err(QbError::build(format!(
                            "incomplete join condition for '{table}': ({}, {}, ...)",
                            p.left, p.op
                        )));
                    }
                    let op = normalize_operator(&p.op)?;
                    if i > 0 {
                        sql.push_str(" AND ");
                    }
                    let right = match &p.right {
                        JoinRhs::Column(c) => c.clone(),
                        JoinRhs::Bound { name, operand } => operand.render(name, bindings),
                    };
                    sql.push_str(&format!("{} {op} {right}", p.left));
                }
                Ok(())
            }
        }
    }
}

fn column_predicate(left: String, op: String, right: String) -> JoinPredicate {
    JoinPredicate {
        left,
        op,
        right: JoinRhs::Column(right),
    }
}

fn bound_predicate(left: String, op: String, name: String, operand: Operand) -> JoinPredicate {
    JoinPredicate {
        left,
        op,
        right: JoinRhs::Bound { name, operand },
    }
}

impl From<Expr> for JoinOn {
    fn from(expr: Expr) -> Self {
        JoinOn(JoinOnKind::Raw(expr))
    }
}

impl<A, B, C> From<(A, B, C)> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
{
    fn from((l, op, r): (A, B, C)) -> Self {
        JoinOn(JoinOnKind::Predicates(vec![column_predicate(
            l.into(),
            op.into(),
            r.into(),
        )]))
    }
}

impl<A, B, C> From<Vec<(A, B, C)>> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
{
    fn from(list: Vec<(A, B, C)>) -> Self {
        JoinOn(JoinOnKind::Predicates(
            list.into_iter()
                .map(|(l, op, r)| column_predicate(l.into(), op.into(), r.into()))
                .collect(),
        ))
    }
}

impl<A, B, C, const N: usize> From<[(A, B, C); N]> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
{
    fn from(list: [(A, B, C); N]) -> Self {
        JoinOn::from(Vec::from(list))
    }
}

impl<A, B, C, V> From<(A, B, C, V)> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
    V: Into<Operand>,
{
    fn from((l, op, name, value): (A, B, C, V)) -> Self {
        JoinOn(JoinOnKind::Predicates(vec![bound_predicate(
            l.into(),
            op.into(),
            name.into(),
            value.into(),
        )]))
    }
}

impl<A, B, C, V> From<Vec<(A, B, C, V)>> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
    V: Into<Operand>,
{
    fn from(list: Vec<(A, B, C, V)>) -> Self {
        JoinOn(JoinOnKind::Predicates(
            list.into_iter()
                .map(|(l, op, name, v)| bound_predicate(l.into(), op.into(), name.into(), v.into()))
                .collect(),
        ))
    }
}

impl<A, B, C, V, const N: usize> From<[(A, B, C, V); N]> for JoinOn
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
    V: Into<Operand>,
{
    fn from(list: [(A, B, C, V); N]) -> Self {
        JoinOn::from(Vec::from(list))
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    source: FromSource,
    on: JoinOn,
}

#[derive(Debug, Clone)]
enum Field {
    Column(String),
    Literal(String),
}

/// SELECT query builder.
///
/// ```ignore
/// use sqlweave::prelude::*;
///
/// let q = qb::select("users")
///     .and_where("active", true)
///     .order_by("name")
///     .limit(0, 25);
/// assert_eq!(
///     q.to_sql()?,
///     "SELECT * FROM users WHERE active = :active ORDER BY name ASC LIMIT 25 OFFSET 0"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Select {
    distinct: bool,
    fields: Vec<Field>,
    from: Vec<FromSource>,
    joins: Vec<Join>,
    conditions: Where,
    group_by: Vec<String>,
    having: Where,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    statement: Statement,
}

impl Select {
    /// An empty builder; add a source with [`from`](Self::from).
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(mut self, f: impl FnOnce(&mut Self)) -> Self {
        self.statement.reset();
        f(&mut self);
        self
    }

    // ==================== sources ====================

    /// Add a FROM source. `name` is emitted as given (`users`, `users u`).
    pub fn from(self, source: impl Into<FromSource>) -> Self {
        let source = source.into();
        self.edit(|s| s.from.push(source))
    }

    pub fn from_as(self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from(FromSource::table_as(table, alias))
    }

    /// Use a sub-select as a FROM source. Its bindings precede the outer ones.
    pub fn from_select(self, select: Select, alias: impl Into<String>) -> Self {
        self.from(FromSource::sub_query(select, alias))
    }

    /// Run on a named connection instead of the default one.
    pub fn connection(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.edit(|s| s.statement.set_connection(Some(name)))
    }

    // ==================== fields ====================

    /// Replace the field list. An empty list selects `*`.
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<Field> = fields.into_iter().map(|f| Field::Column(f.into())).collect();
        self.edit(|s| s.fields = fields)
    }

    /// Append one field (`name`, `u.name`, `COUNT(*) AS n`).
    pub fn field(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.edit(|s| s.fields.push(Field::Column(field)))
    }

    pub fn field_as(self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        let field = format!("{} AS {}", field.into(), alias.into());
        self.edit(|s| s.fields.push(Field::Column(field)))
    }

    /// Append a literal field, never treated as a column.
    pub fn field_expr(self, expr: Expr, alias: Option<&str>) -> Self {
        let field = match alias {
            Some(alias) => format!("{expr} AS {alias}"),
            None => expr.into_string(),
        };
        self.edit(|s| s.fields.push(Field::Literal(field)))
    }

    pub fn distinct(self) -> Self {
        self.edit(|s| s.distinct = true)
    }

    // ==================== joins ====================

    pub fn join(self, table: impl Into<FromSource>, on: impl Into<JoinOn>) -> Self {
        self.join_with(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: impl Into<FromSource>, on: impl Into<JoinOn>) -> Self {
        self.join_with(JoinKind::Left, table, on)
    }

    pub fn right_join(self, table: impl Into<FromSource>, on: impl Into<JoinOn>) -> Self {
        self.join_with(JoinKind::Right, table, on)
    }

    pub fn full_join(self, table: impl Into<FromSource>, on: impl Into<JoinOn>) -> Self {
        self.join_with(JoinKind::Full, table, on)
    }

    pub fn cross_join(self, table: impl Into<FromSource>) -> Self {
        self.join_with(JoinKind::Cross, table, JoinOn::none())
    }

    /// Join on a single `left op right` comparison given as separate arguments.
    ///
    /// An empty operator or right-hand side fails at compile time.
    pub fn join_on(
        self,
        kind: JoinKind,
        table: impl Into<FromSource>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.join_with(kind, table, (left.into(), op.into(), right.into()))
    }

    pub fn join_with(
        self,
        kind: JoinKind,
        source: impl Into<FromSource>,
        on: impl Into<JoinOn>,
    ) -> Self {
        let join = Join {
            kind,
            source: source.into(),
            on: on.into(),
        };
        self.edit(|s| s.joins.push(join))
    }

    // ==================== GROUP BY / HAVING ====================

    pub fn group_by<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.edit(|s| s.group_by.extend(fields))
    }

    /// `HAVING field = value`. Placeholders are named after the field and the
    /// predicate position (`:having_1_total`).
    pub fn having(self, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.having_op(field, "=", value)
    }

    pub fn having_op(
        self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        let (field, op, value) = (field.into(), op.into(), value.into());
        self.edit(|s| s.having = std::mem::take(&mut s.having).and_where_op(field, op, value))
    }

    pub fn or_having(self, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.or_having_op(field, "=", value)
    }

    pub fn or_having_op(
        self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        let (field, op, value) = (field.into(), op.into(), value.into());
        self.edit(|s| s.having = std::mem::take(&mut s.having).or_where_op(field, op, value))
    }

    /// Raw HAVING fragment; `?` markers bind `values` in order.
    pub fn having_raw<V: Into<Value>>(
        self,
        sql: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let sql = sql.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.edit(|s| s.having = std::mem::take(&mut s.having).where_raw(sql, values))
    }

    // ==================== ORDER BY ====================

    pub fn order_by(self, field: impl Into<String>) -> Self {
        let clause = format!("{} ASC", field.into());
        self.edit(|s| s.order_by.push(clause))
    }

    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        let clause = format!("{} DESC", field.into());
        self.edit(|s| s.order_by.push(clause))
    }

    /// Verbatim ORDER BY entry (`FIELD(status, 'new', 'open')`, `name NULLS LAST`).
    pub fn order_by_raw(self, expr: Expr) -> Self {
        self.edit(|s| s.order_by.push(expr.into_string()))
    }

    // ==================== LIMIT / OFFSET ====================

    /// `LIMIT count OFFSET offset`.
    pub fn limit(self, offset: u64, count: u64) -> Self {
        self.edit(|s| {
            s.offset = Some(offset);
            s.limit = Some(count);
        })
    }

    /// `LIMIT count` without an offset.
    pub fn take(self, count: u64) -> Self {
        self.edit(|s| {
            s.offset = None;
            s.limit = Some(count);
        })
    }

    /// 1-indexed page: `limit((page - 1) * per_page, per_page)`. Page 0 is page 1.
    pub fn page(self, page: u64, per_page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit(offset, per_page)
    }

    // ==================== state used by derived queries ====================

    /// Plain column names of the field list (aliases stripped, `*` and literals skipped).
    pub(crate) fn column_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                Field::Column(c) => crate::ident::column_of(c),
                Field::Literal(_) => None,
            })
            .collect()
    }

    pub(crate) fn primary_table(&self) -> Option<&str> {
        self.from.iter().find_map(FromSource::table_name)
    }

    pub(crate) fn has_group_by(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub(crate) fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Strip what a row count does not need: ordering, pagination and, unless
    /// the select is DISTINCT, the field list.
    pub(crate) fn strip_for_count(&mut self, strip_group_by: bool) {
        self.statement.reset();
        if !self.distinct {
            self.fields.clear();
        }
        self.order_by.clear();
        self.limit = None;
        self.offset = None;
        if strip_group_by {
            self.group_by.clear();
            self.having.clear();
        }
    }
}

impl Conditional for Select {
    fn conditions(&self) -> &Where {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Where {
        self.statement.reset();
        &mut self.conditions
    }
}

impl QueryBuilder for Select {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        if self.from.is_empty() {
            return Err(QbError::build("SELECT has no FROM source"));
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.fields.is_empty() {
            sql.push('*');
        } else {
            let fields: Vec<&str> = self
                .fields
                .iter()
                .map(|f| match f {
                    Field::Column(s) | Field::Literal(s) => s.as_str(),
                })
                .collect();
            sql.push_str(&fields.join(", "));
        }

        sql.push_str(" FROM ");
        for (i, source) in self.from.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            source.write(&mut sql, bindings)?;
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.keyword());
            sql.push(' ');
            let mut target = String::new();
            join.source.write(&mut target, bindings)?;
            sql.push_str(&target);
            if join.kind == JoinKind::Cross {
                continue;
            }
            if matches!(join.on.0, JoinOnKind::None) {
                return Err(QbError::build(format!(
                    "{} on '{target}' needs a join condition",
                    join.kind.keyword()
                )));
            }
            join.on.write(&target, &mut sql, bindings)?;
        }

        if self.conditions.has_where() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.build(bindings)?);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if self.having.has_where() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having.build_positional(bindings, "having")?);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
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

impl FetchRows for Select {}
