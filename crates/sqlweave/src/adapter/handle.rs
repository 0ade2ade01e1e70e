use crate::row::Row;
use crate::value::Value;
use futures_core::Stream;
use std::collections::VecDeque;
use std::sync::Arc;

/// The result of one executed statement.
///
/// Rows are buffered by the adapter and consumed with cursor semantics: every
/// row is handed out once, whichever of [`fetch`](Self::fetch),
/// [`fetch_all`](Self::fetch_all), [`rows`](Self::rows) or
/// [`stream`](Self::stream) takes it.
#[derive(Debug, Clone)]
pub struct StatementHandle {
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
    affected: u64,
}

impl StatementHandle {
    /// A handle over result rows; `affected` is what the driver reported.
    pub fn new(columns: Arc<[String]>, rows: Vec<Row>, affected: u64) -> Self {
        Self {
            columns,
            rows: rows.into(),
            affected,
        }
    }

    /// A handle for a statement that produced no result set.
    pub fn empty(affected: u64) -> Self {
        Self::new(Arc::from(Vec::new()), Vec::new(), affected)
    }

    /// Build a handle from raw values; every row must have one value per column.
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let affected = rows.len() as u64;
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        Self::new(columns, rows, affected)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows affected (DML) or returned (queries), as reported by the driver.
    pub fn row_count(&self) -> u64 {
        self.affected
    }

    /// Rows not yet fetched.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Next row, if any.
    pub fn fetch(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Every row not yet fetched.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Lazily iterate the rows not yet fetched.
    pub fn rows(&mut self) -> impl Iterator<Item = Row> + '_ {
        std::iter::from_fn(move || self.rows.pop_front())
    }

    /// Stream the rows not yet fetched.
    pub fn stream(&mut self) -> impl Stream<Item = Row> + Send + '_ {
        futures_util::stream::iter(self.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn handle() -> StatementHandle {
        StatementHandle::from_values(
            vec!["id".to_string()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
        )
    }

    #[test]
    fn test_cursor_semantics() {
        let mut h = handle();
        assert_eq!(h.row_count(), 3);
        assert_eq!(h.fetch().and_then(|r| r.get(0usize).cloned()), Some(Value::Int(1)));
        assert_eq!(h.fetch_all().len(), 2);
        assert!(h.fetch().is_none());
        assert!(h.fetch_all().is_empty());
        assert_eq!(h.row_count(), 3);
    }

    #[test]
    fn test_rows_iterator_is_lazy() {
        let mut h = handle();
        let first: Vec<Row> = h.rows().take(1).collect();
        assert_eq!(first.len(), 1);
        assert_eq!(h.remaining(), 2);
    }

    #[tokio::test]
    async fn test_stream_remaining_rows() {
        let mut h = handle();
        h.fetch();
        let ids: Vec<i64> = h
            .stream()
            .map(|row| row.try_get::<i64>(0usize).expect("id"))
            .collect()
            .await;
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_empty_handle() {
        let h = StatementHandle::empty(4);
        assert!(h.columns().is_empty());
        assert_eq!(h.row_count(), 4);
        assert_eq!(h.remaining(), 0);
    }
}
