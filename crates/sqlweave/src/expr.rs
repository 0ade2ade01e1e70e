//! Raw SQL literals and the value-or-literal operand used by every builder.

use crate::binding::Bindings;
use crate::value::Value;
use std::fmt;

/// A fragment of SQL emitted verbatim, never escaped and never bound.
///
/// Use it for function calls (`NOW()`), column arithmetic (`visits + 1`) or
/// column-to-column comparisons. The caller is responsible for its safety.
///
/// ```ignore
/// use sqlweave::{expr, qb};
///
/// let q = qb::update("posts").set("updated_at", expr("NOW()"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr(String);

impl Expr {
    pub fn new(sql: impl Into<String>) -> Self {
        Expr(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Expr::new`].
pub fn expr(sql: impl Into<String>) -> Expr {
    Expr::new(sql)
}

/// Right-hand side of a predicate or an assignment: either a value to bind
/// or a literal to emit as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Expr(Expr),
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Operand::Expr(e) => Some(e),
            Operand::Value(_) => None,
        }
    }

    /// SQL for this operand: the literal itself, or a fresh placeholder
    /// registered under `base`.
    pub(crate) fn render(&self, base: &str, bindings: &mut Bindings) -> String {
        match self {
            Operand::Expr(e) => e.as_str().to_string(),
            Operand::Value(v) => format!(":{}", bindings.make_and_set(base, v.clone())),
        }
    }
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Expr(e)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Value(v.into())
    }
}

macro_rules! operand_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )+
    };
}

operand_from!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    String,
    &str,
    &String,
    char,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    uuid::Uuid,
    serde_json::Value,
);
