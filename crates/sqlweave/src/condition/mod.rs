//! The condition tree shared by SELECT, UPDATE and DELETE.
//!
//! A [`Where`] is an ordered list of predicates, each carrying the link
//! (`AND`/`OR`) that joins it to the predicate before it. Nested trees are the
//! only source of parentheses in the output:
//!
//! ```ignore
//! use sqlweave::{Conditional, Where};
//!
//! let w = Where::new()
//!     .and_where("active", true)
//!     .where_nested(|w| w.and_where("role", "admin").or_where("role", "owner"));
//! // active = :active AND (role = :role OR role = :role_1)
//! ```

use crate::binding::Bindings;
use crate::error::{QbError, QbResult};
use crate::expr::Operand;
use crate::qb::{Select, build_subquery};
use crate::value::Value;

#[cfg(test)]
mod tests;

/// Operators accepted by [`Conditional::and_where_op`] and friends.
const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "<=>", "LIKE", "NOT LIKE", "ILIKE", "NOT ILIKE",
    "REGEXP", "NOT REGEXP", "~", "~*", "!~", "!~*",
];

/// Escape character of generated `LIKE` patterns.
///
/// Not a backslash: MySQL reads `'\'` as an unterminated literal.
pub(crate) const LIKE_ESCAPE: char = '!';

/// Escape `LIKE` wildcards (and the escape character) in user text.
pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// How a predicate joins the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    And,
    Or,
}

impl Link {
    pub fn keyword(self) -> &'static str {
        match self {
            Link::And => "AND",
            Link::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubQueryTest {
    In,
    NotIn,
    Exists,
    NotExists,
}

#[derive(Debug, Clone)]
enum Node {
    Compare {
        field: String,
        op: String,
        operand: Operand,
    },
    In {
        field: String,
        negated: bool,
        values: Vec<Value>,
    },
    Null {
        field: String,
        negated: bool,
    },
    Between {
        field: String,
        negated: bool,
        low: Operand,
        high: Operand,
    },
    Raw {
        sql: String,
        values: Vec<Value>,
    },
    /// `{target} {op} :{base} ESCAPE '!'`, bound under the column's name
    Match {
        target: String,
        op: &'static str,
        column: String,
        pattern: Value,
    },
    Group(Where),
    SubQuery {
        field: Option<String>,
        test: SubQueryTest,
        select: Box<Select>,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    link: Link,
    node: Node,
}

/// A composable predicate list.
#[derive(Debug, Clone, Default)]
pub struct Where {
    entries: Vec<Entry>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any predicate would be emitted.
    pub fn has_where(&self) -> bool {
        self.entries.iter().any(|e| match &e.node {
            Node::Group(inner) => inner.has_where(),
            _ => true,
        })
    }

    pub fn is_empty(&self) -> bool {
        !self.has_where()
    }

    /// Number of top-level predicates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, link: Link, node: Node) {
        self.entries.push(Entry { link, node });
    }

    /// OR a `LIKE`-family match of `target` against an already escaped pattern.
    ///
    /// The placeholder is named after `column` rather than the (usually
    /// wrapped) `target` expression.
    pub(crate) fn or_where_match(
        mut self,
        target: String,
        op: &'static str,
        column: &str,
        pattern: Value,
    ) -> Self {
        self.push(
            Link::Or,
            Node::Match {
                target,
                op,
                column: column.to_string(),
                pattern,
            },
        );
        self
    }

    /// Emit the predicate list, registering bindings in appearance order.
    pub(crate) fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        self.build_named(bindings, None)
    }

    /// Like [`build`](Self::build) but placeholder names are derived from the
    /// predicate position as well as the field (`{prefix}_{n}_{field}`).
    pub(crate) fn build_positional(&self, bindings: &mut Bindings, prefix: &str) -> QbResult<String> {
        self.build_named(bindings, Some(prefix))
    }

    fn build_named(&self, bindings: &mut Bindings, prefix: Option<&str>) -> QbResult<String> {
        let mut sql = String::new();
        let mut emitted = 0usize;
        for entry in &self.entries {
            if let Node::Group(inner) = &entry.node
                && !inner.has_where()
            {
                continue;
            }
            emitted += 1;
            let base = |field: &str| match prefix {
                Some(prefix) => format!("{prefix}_{emitted}_{field}"),
                None => field.to_string(),
            };
            if emitted > 1 {
                sql.push(' ');
                sql.push_str(entry.link.keyword());
                sql.push(' ');
            }
            match &entry.node {
                Node::Compare { field, op, operand } => {
                    let op = normalize_operator(op)?;
                    if operand.is_null() && matches!(op.as_str(), "=" | "!=" | "<>") {
                        let check = if op == "=" { "IS NULL" } else { "IS NOT NULL" };
                        sql.push_str(&format!("{field} {check}"));
                    } else {
                        let rhs = operand.render(&base(field), bindings);
                        sql.push_str(&format!("{field} {op} {rhs}"));
                    }
                }
                Node::In {
                    field,
                    negated,
                    values,
                } => {
                    if values.is_empty() {
                        return Err(QbError::build(format!(
                            "empty value list for {} on '{field}'",
                            if *negated { "NOT IN" } else { "IN" }
                        )));
                    }
                    let base = base(field);
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|v| format!(":{}", bindings.make_and_set(&base, v.clone())))
                        .collect();
                    let keyword = if *negated { "NOT IN" } else { "IN" };
                    sql.push_str(&format!("{field} {keyword} ({})", placeholders.join(", ")));
                }
                Node::Null { field, negated } => {
                    let check = if *negated { "IS NOT NULL" } else { "IS NULL" };
                    sql.push_str(&format!("{field} {check}"));
                }
                Node::Between {
                    field,
                    negated,
                    low,
                    high,
                } => {
                    let base = base(field);
                    let low = low.render(&base, bindings);
                    let high = high.render(&base, bindings);
                    let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                    sql.push_str(&format!("{field} {keyword} {low} AND {high}"));
                }
                Node::Raw { sql: raw, values } => {
                    sql.push_str(&expand_raw(raw, values, &base("raw"), bindings)?);
                }
                Node::Match {
                    target,
                    op,
                    column,
                    pattern,
                } => {
                    let name = bindings.make_and_set(&base(column), pattern.clone());
                    sql.push_str(&format!("{target} {op} :{name} ESCAPE '{LIKE_ESCAPE}'"));
                }
                Node::Group(inner) => {
                    sql.push('(');
                    sql.push_str(&inner.build_named(bindings, prefix)?);
                    sql.push(')');
                }
                Node::SubQuery {
                    field,
                    test,
                    select,
                } => {
                    let sub = build_subquery(select, bindings)?;
                    let field = field.as_deref().unwrap_or_default();
                    match test {
                        SubQueryTest::In => sql.push_str(&format!("{field} IN ({sub})")),
                        SubQueryTest::NotIn => sql.push_str(&format!("{field} NOT IN ({sub})")),
                        SubQueryTest::Exists => sql.push_str(&format!("EXISTS ({sub})")),
                        SubQueryTest::NotExists => sql.push_str(&format!("NOT EXISTS ({sub})")),
                    }
                }
            }
        }
        Ok(sql)
    }
}

/// Uppercase and collapse whitespace, then check against the allow-list.
pub(crate) fn normalize_operator(op: &str) -> QbResult<String> {
    let normalized = op.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    if OPERATORS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(QbError::build(format!("unsupported operator '{op}'")))
    }
}

/// Replace each `?` marker outside string literals with a generated placeholder.
///
/// A fragment without values is emitted verbatim, so Postgres operators such
/// as `?|` stay usable in value-less fragments.
pub(crate) fn expand_raw(
    sql: &str,
    values: &[Value],
    base: &str,
    bindings: &mut Bindings,
) -> QbResult<String> {
    if values.is_empty() {
        return Ok(sql.to_string());
    }
    let mismatch = || {
        QbError::build(format!(
            "raw fragment '{sql}' does not have one '?' marker per value ({} values)",
            values.len()
        ))
    };
    let mut out = String::with_capacity(sql.len() + values.len() * 4);
    let mut pending = values.iter();
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                let value = pending.next().ok_or_else(mismatch)?;
                out.push(':');
                out.push_str(&bindings.make_and_set(base, value.clone()));
            }
            _ => out.push(ch),
        }
    }
    if pending.next().is_some() {
        return Err(mismatch());
    }
    Ok(out)
}

/// Predicate-building methods shared by [`Where`] and the builders that own one.
///
/// Every method appends; nothing here replaces an existing predicate.
pub trait Conditional: Sized {
    fn conditions(&self) -> &Where;

    /// Mutable access to the condition tree. Builders reset their compiled
    /// state here, so every predicate added invalidates a previous compile.
    fn conditions_mut(&mut self) -> &mut Where;

    fn has_where(&self) -> bool {
        self.conditions().has_where()
    }

    // ==================== comparisons ====================

    /// `field = value`. An [`Expr`](crate::Expr) is emitted verbatim; `NULL` becomes `IS NULL`.
    fn and_where(self, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.and_where_op(field, "=", value)
    }

    /// `field <op> value`, `op` from a fixed allow-list (checked at compile time).
    fn and_where_op(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        self.conditions_mut().push(
            Link::And,
            Node::Compare {
                field: field.into(),
                op: op.into(),
                operand: value.into(),
            },
        );
        self
    }

    fn or_where(self, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.or_where_op(field, "=", value)
    }

    fn or_where_op(
        mut self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        self.conditions_mut().push(
            Link::Or,
            Node::Compare {
                field: field.into(),
                op: op.into(),
                operand: value.into(),
            },
        );
        self
    }

    // ==================== IN ====================

    /// `field IN (...)`, one binding per element. An empty list fails at compile time.
    fn where_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        push_in(self, Link::And, field.into(), false, values)
    }

    fn where_not_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        push_in(self, Link::And, field.into(), true, values)
    }

    fn or_where_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        push_in(self, Link::Or, field.into(), false, values)
    }

    fn or_where_not_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        push_in(self, Link::Or, field.into(), true, values)
    }

    // ==================== NULL ====================

    fn where_null(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.conditions_mut().push(Link::And, Node::Null { field, negated: false });
        self
    }

    fn where_not_null(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.conditions_mut().push(Link::And, Node::Null { field, negated: true });
        self
    }

    fn or_where_null(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.conditions_mut().push(Link::Or, Node::Null { field, negated: false });
        self
    }

    fn or_where_not_null(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.conditions_mut().push(Link::Or, Node::Null { field, negated: true });
        self
    }

    // ==================== BETWEEN ====================

    fn where_between(
        self,
        field: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        push_between(self, Link::And, field.into(), false, low.into(), high.into())
    }

    fn where_not_between(
        self,
        field: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        push_between(self, Link::And, field.into(), true, low.into(), high.into())
    }

    fn or_where_between(
        self,
        field: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        push_between(self, Link::Or, field.into(), false, low.into(), high.into())
    }

    // ==================== raw ====================

    /// A verbatim fragment; each `?` outside string literals binds the next value.
    fn where_raw<V: Into<Value>>(
        mut self,
        sql: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let node = Node::Raw {
            sql: sql.into(),
            values: values.into_iter().map(Into::into).collect(),
        };
        self.conditions_mut().push(Link::And, node);
        self
    }

    fn or_where_raw<V: Into<Value>>(
        mut self,
        sql: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let node = Node::Raw {
            sql: sql.into(),
            values: values.into_iter().map(Into::into).collect(),
        };
        self.conditions_mut().push(Link::Or, node);
        self
    }

    // ==================== nesting ====================

    /// Append `group` as one parenthesized predicate.
    fn where_group(mut self, group: Where) -> Self {
        self.conditions_mut().push(Link::And, Node::Group(group));
        self
    }

    fn or_where_group(mut self, group: Where) -> Self {
        self.conditions_mut().push(Link::Or, Node::Group(group));
        self
    }

    /// Build a parenthesized group in place.
    fn where_nested(self, build: impl FnOnce(Where) -> Where) -> Self {
        self.where_group(build(Where::new()))
    }

    fn or_where_nested(self, build: impl FnOnce(Where) -> Where) -> Self {
        self.or_where_group(build(Where::new()))
    }

    // ==================== sub-selects ====================

    /// `field IN (SELECT ...)`.
    fn where_in_select(self, field: impl Into<String>, select: Select) -> Self {
        push_subquery(self, Some(field.into()), SubQueryTest::In, select)
    }

    fn where_not_in_select(self, field: impl Into<String>, select: Select) -> Self {
        push_subquery(self, Some(field.into()), SubQueryTest::NotIn, select)
    }

    /// `EXISTS (SELECT ...)`; correlate by referencing outer columns with [`Expr`](crate::Expr).
    fn where_exists(self, select: Select) -> Self {
        push_subquery(self, None, SubQueryTest::Exists, select)
    }

    fn where_not_exists(self, select: Select) -> Self {
        push_subquery(self, None, SubQueryTest::NotExists, select)
    }
}

fn push_in<C: Conditional, V: Into<Value>>(
    mut target: C,
    link: Link,
    field: String,
    negated: bool,
    values: impl IntoIterator<Item = V>,
) -> C {
    let values = values.into_iter().map(Into::into).collect();
    target.conditions_mut().push(
        link,
        Node::In {
            field,
            negated,
            values,
        },
    );
    target
}

fn push_between<C: Conditional>(
    mut target: C,
    link: Link,
    field: String,
    negated: bool,
    low: Operand,
    high: Operand,
) -> C {
    target.conditions_mut().push(
        link,
        Node::Between {
            field,
            negated,
            low,
            high,
        },
    );
    target
}

fn push_subquery<C: Conditional>(
    mut target: C,
    field: Option<String>,
    test: SubQueryTest,
    select: Select,
) -> C {
    target.conditions_mut().push(
        Link::And,
        Node::SubQuery {
            field,
            test,
            select: Box::new(select),
        },
    );
    target
}

impl Conditional for Where {
    fn conditions(&self) -> &Where {
        self
    }

    fn conditions_mut(&mut self) -> &mut Where {
        self
    }
}
