//! The compiled statement: SQL text with named placeholders plus ordered bindings.
//!
//! Builders always emit `:name` placeholders. Drivers that bind positionally get
//! their own syntax from [`Query::to_positional`]; since bindings are registered
//! in the order their placeholders appear, the n-th binding becomes the n-th
//! positional parameter without any parsing of the statement.

use crate::binding::{Binding, Bindings};
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// Positional placeholder syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `:name` (left untouched)
    Named,
    /// `$1, $2, ...` (Postgres)
    Dollar,
    /// `?1, ?2, ...` (SQLite)
    NumberedQuestion,
    /// `?, ?, ...` (MySQL-family)
    Question,
}

/// An immutable compiled statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    sql: String,
    bindings: Vec<Binding>,
    connection: Option<String>,
}

impl Query {
    pub fn new(sql: impl Into<String>, bindings: Bindings, connection: Option<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: bindings.into_vec(),
            connection,
        }
    }

    /// Statement text with named placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bindings in placeholder order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Values in placeholder order, for positional drivers.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.bindings.iter().map(Binding::value)
    }

    /// Connection name the statement should run on (`None` = default).
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Rewrite the statement for a driver that binds positionally.
    pub fn to_positional(&self, style: PlaceholderStyle) -> String {
        rewrite(&self.sql, &self.bindings, |idx, _| match style {
            PlaceholderStyle::Named => None,
            PlaceholderStyle::Dollar => Some(format!("${}", idx + 1)),
            PlaceholderStyle::NumberedQuestion => Some(format!("?{}", idx + 1)),
            PlaceholderStyle::Question => Some("?".to_string()),
        })
    }

    /// Statement with every placeholder replaced by its literal value.
    ///
    /// For logs and debugging only; never send this to a database.
    pub fn debug_sql(&self) -> String {
        rewrite(&self.sql, &self.bindings, |_, b| Some(b.value().to_sql_literal()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_sql())
    }
}

/// Replace the placeholders of `bindings`, in order, with whatever `render` returns.
///
/// Each binding's `:name` is searched from the end of the previous match.
/// Text inside quoted literals and quoted identifiers is never matched.
fn rewrite(
    sql: &str,
    bindings: &[Binding],
    mut render: impl FnMut(usize, &Binding) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for (idx, binding) in bindings.iter().enumerate() {
        let Some(pos) = find_placeholder(sql, binding.name(), cursor) else {
            continue;
        };
        let end = pos + binding.name().len() + 1;
        out.push_str(&sql[cursor..pos]);
        match render(idx, binding) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&sql[pos..end]),
        }
        cursor = end;
    }
    out.push_str(&sql[cursor..]);
    out
}

/// Rename placeholders in `sql` according to `(old, new)` pairs.
///
/// Pairs are applied last to first: a later pair's `old` may equal an earlier
/// pair's `new`, never the other way round.
pub(crate) fn rename_placeholders(sql: &str, renames: &[(String, String)]) -> String {
    let mut out = sql.to_string();
    for (old, new) in renames.iter().rev() {
        let mut result = String::with_capacity(out.len());
        let mut cursor = 0;
        while let Some(pos) = find_placeholder(&out, old, cursor) {
            result.push_str(&out[cursor..pos]);
            result.push(':');
            result.push_str(new);
            cursor = pos + old.len() + 1;
        }
        result.push_str(&out[cursor..]);
        out = result;
    }
    out
}

/// Byte offset of the next `:name` at or after `from`, honoring word boundaries.
///
/// `::name` (a Postgres cast), `:name_more` and anything between `'...'`,
/// `"..."` or `` `...` `` never match `:name`. `from` must lie outside quotes.
fn find_placeholder(sql: &str, name: &str, from: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut quote: Option<u8> = None;
    for (pos, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None if matches!(b, b'\'' | b'"' | b'`') => quote = Some(b),
            None if b == b':' => {
                let end = pos + 1 + name.len();
                let named = sql.get(pos + 1..end) == Some(name);
                let before_ok = pos == 0 || bytes[pos - 1] != b':';
                let after_ok = bytes
                    .get(end)
                    .is_none_or(|c| !(c.is_ascii_alphanumeric() || *c == b'_'));
                if named && before_ok && after_ok {
                    return Some(pos);
                }
            }
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sql: &str, values: &[(&str, Value)]) -> Query {
        let mut b = Bindings::new();
        for (name, value) in values {
            b.make_and_set(name, value.clone());
        }
        Query::new(sql, b, None)
    }

    #[test]
    fn test_to_positional_styles() {
        let q = query(
            "SELECT * FROM t WHERE a = :a AND b = :b",
            &[("a", Value::Int(1)), ("b", Value::from("x"))],
        );
        assert_eq!(
            q.to_positional(PlaceholderStyle::Dollar),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            q.to_positional(PlaceholderStyle::NumberedQuestion),
            "SELECT * FROM t WHERE a = ?1 AND b = ?2"
        );
        assert_eq!(
            q.to_positional(PlaceholderStyle::Question),
            "SELECT * FROM t WHERE a = ? AND b = ?"
        );
        assert_eq!(q.to_positional(PlaceholderStyle::Named), q.sql());
    }

    #[test]
    fn test_prefix_names_do_not_match() {
        let q = query(
            "SELECT * FROM t WHERE a = :id_1 AND b = :id",
            &[("id_1", Value::Int(1)), ("id", Value::Int(2))],
        );
        assert_eq!(
            q.to_positional(PlaceholderStyle::Dollar),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn test_cast_is_not_a_placeholder() {
        let q = query("SELECT a::text FROM t WHERE text = :text", &[("text", Value::from("x"))]);
        assert_eq!(
            q.to_positional(PlaceholderStyle::Dollar),
            "SELECT a::text FROM t WHERE text = $1"
        );
    }

    #[test]
    fn test_quoted_text_is_not_a_placeholder() {
        let q = query(
            r#"SELECT ":name" FROM t WHERE note = ':name' AND name = :name"#,
            &[("name", Value::from("x"))],
        );
        assert_eq!(
            q.to_positional(PlaceholderStyle::Dollar),
            r#"SELECT ":name" FROM t WHERE note = ':name' AND name = $1"#
        );
        assert_eq!(
            q.debug_sql(),
            r#"SELECT ":name" FROM t WHERE note = ':name' AND name = 'x'"#
        );
        assert_eq!(
            rename_placeholders("note = ':id' OR id = :id", &[("id".to_string(), "id_1".to_string())]),
            "note = ':id' OR id = :id_1"
        );
    }

    #[test]
    fn test_debug_sql_inlines_values() {
        let q = query(
            "UPDATE t SET name = :name WHERE active = :active",
            &[("name", Value::from("O'Neil")), ("active", Value::Bool(true))],
        );
        assert_eq!(q.debug_sql(), "UPDATE t SET name = 'O''Neil' WHERE active = TRUE");
        assert_eq!(q.to_string(), q.debug_sql());
    }

    #[test]
    fn test_rename_placeholders() {
        let renamed = rename_placeholders(
            "a = :id OR b = :id_x",
            &[("id".to_string(), "id_1".to_string())],
        );
        assert_eq!(renamed, "a = :id_1 OR b = :id_x");
    }

    #[test]
    fn test_chained_renames() {
        let mut child = Bindings::new();
        child.make_and_set("id", Value::Int(1));
        child.make_and_set("id_1", Value::Int(2));
        let mut parent = Bindings::new();
        parent.make_and_set("id", Value::Int(0));

        let renames = parent.add_from(&child);
        assert_eq!(
            rename_placeholders("a = :id AND b = :id_1", &renames),
            "a = :id_1 AND b = :id_1_1"
        );
    }
}
