//! Row mapping traits and utilities

use crate::error::{QbError, QbResult};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// A result row, independent of the driver that produced it.
///
/// Column names are shared between all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value by position or column name.
    pub fn get(&self, idx: impl ColumnIndex) -> Option<&Value> {
        idx.position(&self.columns).and_then(|i| self.values.get(i))
    }

    /// Typed value by position or column name.
    pub fn try_get<T: FromValue>(&self, idx: impl ColumnIndex) -> QbResult<T> {
        let value = self
            .get(&idx)
            .ok_or_else(|| QbError::decode(idx.describe(), "no such column"))?;
        T::from_value(value).map_err(|message| QbError::decode(idx.describe(), message))
    }

    /// The row as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A way to address a column: by position or by name.
pub trait ColumnIndex {
    fn position(&self, columns: &[String]) -> Option<usize>;

    fn describe(&self) -> String;
}

impl ColumnIndex for usize {
    fn position(&self, columns: &[String]) -> Option<usize> {
        (*self < columns.len()).then_some(*self)
    }

    fn describe(&self) -> String {
        format!("#{self}")
    }
}

impl ColumnIndex for str {
    fn position(&self, columns: &[String]) -> Option<usize> {
        columns.iter().position(|c| c == self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl ColumnIndex for String {
    fn position(&self, columns: &[String]) -> Option<usize> {
        self.as_str().position(columns)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl<T: ColumnIndex + ?Sized> ColumnIndex for &T {
    fn position(&self, columns: &[String]) -> Option<usize> {
        (**self).position(columns)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Conversion from a single column value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_i64()
            .ok_or_else(|| format!("expected integer, got {value:?}"))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|e| e.to_string())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_f64()
            .ok_or_else(|| format!("expected number, got {value:?}"))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_bool()
            .ok_or_else(|| format!("expected boolean, got {value:?}"))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err("unexpected NULL".to_string()),
            other => Ok(other.to_string()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Trait for types that can be constructed from a result [`Row`].
///
/// # Example
///
/// ```ignore
/// use sqlweave::{FromRow, QbResult, Row};
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> QbResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             name: row.try_get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> QbResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QbResult<Self> {
        Ok(row.clone())
    }
}

macro_rules! tuple_from_row {
    ($($idx:tt => $t:ident),+) => {
        impl<$($t: FromValue),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> QbResult<Self> {
                Ok(($(row.try_get::<$t>($idx as usize)?,)+))
            }
        }
    };
}

tuple_from_row!(0 => A);
tuple_from_row!(0 => A, 1 => B);
tuple_from_row!(0 => A, 1 => B, 2 => C);
tuple_from_row!(0 => A, 1 => B, 2 => C, 3 => D);

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            Arc::from(vec!["id".to_string(), "name".to_string(), "bio".to_string()]),
            vec![Value::Int(7), Value::from("Alice"), Value::Null],
        )
    }

    #[test]
    fn test_get_by_name_and_position() {
        let r = row();
        assert_eq!(r.get("name"), Some(&Value::from("Alice")));
        assert_eq!(r.get(0usize), Some(&Value::Int(7)));
        assert_eq!(r.get("missing"), None);
    }

    #[test]
    fn test_try_get_typed() {
        let r = row();
        assert_eq!(r.try_get::<i64>("id").expect("id"), 7);
        assert_eq!(r.try_get::<Option<String>>("bio").expect("bio"), None);
        let err = r.try_get::<bool>("name").expect_err("not a bool");
        assert!(matches!(err, QbError::Decode { ref column, .. } if column == "name"));
    }

    #[test]
    fn test_tuple_from_row() {
        let (id, name): (i64, String) = FromRow::from_row(&row()).expect("tuple");
        assert_eq!((id, name.as_str()), (7, "Alice"));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            row().to_json(),
            serde_json::json!({"id": 7, "name": "Alice", "bio": null})
        );
    }
}
