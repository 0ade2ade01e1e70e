//! Trait definitions for query builders.

use crate::adapter::{Adapter, AdapterResolver, StatementHandle};
use crate::binding::Bindings;
use crate::error::{QbError, QbResult};
use crate::qb::statement::{self, Statement, StatementKind};
use crate::query::Query;
use crate::row::{FromRow, Row};
use crate::value::Value;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::future::Future;
use tracing::trace;

/// Base trait for all query builders.
///
/// Implementors emit SQL through [`build`](Self::build); compiling, debug
/// rendering and execute-once semantics are provided on top of it.
pub trait QueryBuilder: Send + Sync {
    fn kind(&self) -> StatementKind;

    /// Emit the statement, registering every bound value in `bindings` in the
    /// order its placeholder appears.
    fn build(&self, bindings: &mut Bindings) -> QbResult<String>;

    fn statement(&self) -> &Statement;

    fn statement_mut(&mut self) -> &mut Statement;

    /// Compile into a [`Query`]. Memoized until the builder is edited.
    fn compile(&self) -> QbResult<&Query> {
        self.statement().memoize(|| {
            let mut bindings = Bindings::new();
            let sql = self.build(&mut bindings)?;
            trace!(
                target: "sqlweave.sql",
                query_type = %self.kind(),
                param_count = bindings.len(),
                sql = %sql,
                "compiled statement"
            );
            Ok(Query::new(
                sql,
                bindings,
                self.statement().connection().map(String::from),
            ))
        })
    }

    /// Statement text with named placeholders.
    fn to_sql(&self) -> QbResult<String> {
        Ok(self.compile()?.sql().to_string())
    }

    /// Statement text with bindings inlined. For display only.
    fn debug_sql(&self) -> QbResult<String> {
        Ok(self.compile()?.debug_sql())
    }

    fn was_executed(&self) -> bool {
        self.statement().was_executed()
    }

    /// Drop the compiled query and execution handle so the next `exec` runs again.
    fn reset(&mut self) {
        self.statement_mut().reset();
    }

    /// Hook run with the resolved adapter before the first compile of an execution.
    fn prepare<'a>(
        &'a mut self,
        _adapter: &'a dyn Adapter,
    ) -> impl Future<Output = QbResult<()>> + Send {
        std::future::ready(Ok(()))
    }

    /// Execute once and return the handle; later calls reuse it.
    fn exec<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<&'a mut StatementHandle>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move {
            if !self.statement().was_executed() {
                let adapter = resolver.adapter(self.statement().connection())?;
                self.prepare(adapter.as_ref()).await?;
                let config = resolver.config();
                let handle = {
                    let query = self.compile()?;
                    statement::run(query, self.kind(), adapter.as_ref(), &config).await?
                };
                self.statement_mut().store(handle);
            }
            self.statement_mut()
                .handle_mut()
                .ok_or_else(|| QbError::build("statement was not executed"))
        }
    }
}

/// Row fetching for SELECT builders.
///
/// Every fetch goes through [`QueryBuilder::exec`], so the statement runs once
/// and later fetches continue from the same result cursor.
pub trait FetchRows: QueryBuilder {
    /// All rows not yet fetched.
    fn fetch_all<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Vec<Row>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move { Ok(self.exec(resolver).await?.fetch_all()) }
    }

    /// The next row, if any.
    fn fetch_first<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Option<Row>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move { Ok(self.exec(resolver).await?.fetch()) }
    }

    /// The next row; [`QbError::NotFound`] when there is none.
    fn fetch_one<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Row>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move {
            self.exec(resolver)
                .await?
                .fetch()
                .ok_or_else(|| QbError::not_found("query returned no rows"))
        }
    }

    fn fetch_all_as<'a, T, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Vec<T>>> + Send
    where
        T: FromRow + Send,
        R: AdapterResolver + ?Sized,
    {
        async move {
            let rows = self.fetch_all(resolver).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    fn fetch_first_as<'a, T, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Option<T>>> + Send
    where
        T: FromRow + Send,
        R: AdapterResolver + ?Sized,
    {
        async move {
            let row = self.fetch_first(resolver).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    fn fetch_one_as<'a, T, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<T>> + Send
    where
        T: FromRow + Send,
        R: AdapterResolver + ?Sized,
    {
        async move {
            let row = self.fetch_one(resolver).await?;
            T::from_row(&row)
        }
    }

    /// First column of the next row.
    fn fetch_value<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Option<Value>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move {
            let row = self.fetch_first(resolver).await?;
            Ok(row.and_then(|r| r.into_values().into_iter().next()))
        }
    }

    /// First column of every remaining row.
    fn fetch_column<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Vec<Value>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move {
            let rows = self.fetch_all(resolver).await?;
            Ok(rows
                .into_iter()
                .filter_map(|r| r.into_values().into_iter().next())
                .collect())
        }
    }

    /// Stream the remaining rows.
    fn stream<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<BoxStream<'a, Row>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move { Ok(self.exec(resolver).await?.stream().boxed()) }
    }
}

/// Affected-row and `RETURNING` access for INSERT/UPDATE/DELETE builders.
pub trait Mutation: QueryBuilder {
    /// Rows affected, executing the statement if it has not run yet.
    fn row_count<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<u64>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move { Ok(self.exec(resolver).await?.row_count()) }
    }

    /// Rows produced by a `RETURNING` clause.
    fn fetch_returning<'a, R>(
        &'a mut self,
        resolver: &'a R,
    ) -> impl Future<Output = QbResult<Vec<Row>>> + Send
    where
        R: AdapterResolver + ?Sized,
    {
        async move { Ok(self.exec(resolver).await?.fetch_all()) }
    }
}
