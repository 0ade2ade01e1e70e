//! Statement builders for sqlweave.
//!
//! Builders are plain values: every chained call consumes and returns the
//! builder, nothing touches a database until `exec` (or a fetch / row-count
//! method built on it) is awaited with an [`AdapterResolver`](crate::AdapterResolver).
//!
//! # Features
//!
//! - **Named placeholders**: every bound value gets a generated `:name`; positional
//!   drivers receive `$n` / `?n` rewritten from the same binding order
//! - **Literals stay literal**: [`Expr`](crate::Expr) values are emitted verbatim, never bound
//! - **Nested statements**: sub-selects in FROM, JOIN, `IN (...)` and `EXISTS (...)`
//!   carry their bindings into the parent without collisions
//! - **Execute once**: the compiled statement and result handle are kept until the
//!   builder is edited, cloned or reset
//!
//! # Usage
//!
//! ```ignore
//! use sqlweave::prelude::*;
//!
//! // SELECT
//! let mut q = qb::select("users")
//!     .fields(["id", "name"])
//!     .and_where("active", true)
//!     .order_by("name")
//!     .page(1, 25);
//! let users = q.fetch_all_as::<(i64, String)>(&connections).await?;
//!
//! // INSERT
//! let mut q = qb::insert("users")
//!     .row([("name", "Alice")])
//!     .row([("name", "Bob")]);
//! q.row_count(&connections).await?;
//!
//! // UPDATE
//! let mut q = qb::update("users")
//!     .set("name", "Jane")
//!     .increment("logins", 1)
//!     .and_where("id", 5);
//! q.row_count(&connections).await?;
//!
//! // DELETE
//! let mut q = qb::delete("sessions").and_where_op("expires_at", "<", expr("NOW()"));
//! q.row_count(&connections).await?;
//! ```

mod delete;
mod insert;
mod search;
mod select;
mod statement;
mod traits;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use search::{CountAdjust, Page, SearchableSelect};
pub use select::{FromSource, JoinKind, JoinOn, Select};
pub use statement::{Statement, StatementKind};
pub use traits::{FetchRows, Mutation, QueryBuilder};
pub use update::Update;

use crate::binding::Bindings;
use crate::error::QbResult;
use crate::query::rename_placeholders;

/// Create a SELECT builder reading from `table`.
///
/// # Example
/// ```ignore
/// let q = sqlweave::qb::select("users u").and_where("u.id", 1);
/// ```
pub fn select(table: &str) -> Select {
    Select::new().from(table)
}

/// Create an INSERT builder for `table`.
pub fn insert(table: &str) -> Insert {
    Insert::new(table)
}

/// Create an UPDATE builder for `table`.
pub fn update(table: &str) -> Update {
    Update::new(table)
}

/// Create a DELETE builder for `table`.
///
/// Without conditions the statement deletes every row.
pub fn delete(table: &str) -> Delete {
    Delete::new(table)
}

/// Wrap a SELECT in a searchable, countable result set.
pub fn searchable(select: Select) -> SearchableSelect {
    SearchableSelect::new(select)
}

/// Compile `select` as a nested statement of the one owning `bindings`.
///
/// The sub-select binds into a scoped registry, whose names are then merged
/// into the parent ahead of any binding the parent generates afterwards.
pub(crate) fn build_subquery(select: &Select, bindings: &mut Bindings) -> QbResult<String> {
    let mut scoped = bindings.scoped();
    let sql = select.build(&mut scoped)?;
    let renames = bindings.add_from(&scoped);
    if renames.is_empty() {
        Ok(sql)
    } else {
        Ok(rename_placeholders(&sql, &renames))
    }
}

macro_rules! display_as_debug_sql {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    match self.debug_sql() {
                        Ok(sql) => f.write_str(&sql),
                        Err(e) => write!(f, "/* invalid {} statement: {e} */", self.kind()),
                    }
                }
            }
        )+
    };
}

display_as_debug_sql!(Select, Insert, Update, Delete, SearchableSelect);
