//! # sqlweave
//!
//! Composable SQL statement builders with named parameter binding.
//!
//! ## Features
//!
//! - **Values are always bound**: every literal gets a generated `:name` placeholder;
//!   only [`Expr`] fragments are emitted verbatim
//! - **One binding order**: bindings are registered in the order their placeholders
//!   appear, so positional drivers (`$1`, `?1`, `?`) get the same statement
//! - **Composable conditions**: AND/OR chains, nested groups, `IN`, `BETWEEN`,
//!   raw fragments and sub-selects through the [`Conditional`] trait
//! - **Execute once**: builders compile lazily, run once and keep the result
//!   handle until they are edited, cloned or reset
//! - **Search and count**: [`SearchableSelect`] adds multi-field free-text search,
//!   a derived `COUNT(*)` query and pagination
//! - **Adapters**: Postgres via `tokio-postgres` (optionally pooled with
//!   `deadpool-postgres`), SQLite via `rusqlite` (feature `sqlite`)
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use sqlweave::prelude::*;
//! use std::sync::Arc;
//!
//! let connections = Connections::single(Arc::new(PgAdapter::new(client)));
//!
//! // SELECT
//! let mut q = qb::select("users")
//!     .and_where("active", true)
//!     .order_by("name")
//!     .limit(0, 25);
//! let rows = q.fetch_all(&connections).await?;
//!
//! // INSERT
//! qb::insert("users")
//!     .row([("name", "Alice")])
//!     .row([("name", "Bob")])
//!     .row_count(&connections)
//!     .await?;
//!
//! // UPDATE
//! qb::update("users")
//!     .set("name", "Jane")
//!     .and_where("id", 5)
//!     .row_count(&connections)
//!     .await?;
//!
//! // searchable listing
//! let mut listing = qb::searchable(qb::select("companies").fields(["name", "email"]))
//!     .search("acme");
//! let page = listing.paginate::<Row, _>(&connections, 1, 20).await?;
//! ```

pub mod adapter;
pub mod binding;
pub mod condition;
pub mod config;
pub mod error;
pub mod expr;
pub mod ident;
pub mod prelude;
pub mod qb;
pub mod query;
pub mod row;
pub mod value;

pub use adapter::{
    Adapter, AdapterResolver, Connections, Dialect, PgAdapter, StatementHandle,
};
pub use binding::{Binding, Bindings};
pub use condition::{Conditional, Link, Where};
pub use config::ExecConfig;
pub use error::{BoxError, DriverError, ExecutionError, QbError, QbResult};
pub use expr::{Expr, Operand, expr};
pub use ident::Ident;
pub use query::{PlaceholderStyle, Query};
pub use row::{ColumnIndex, FromRow, FromValue, Row};
pub use value::{TypeHint, Value};

// Re-export qb builders for easy access
pub use qb::{
    Delete, FetchRows, FromSource, Insert, JoinKind, JoinOn, Mutation, Page, QueryBuilder,
    SearchableSelect, Select, Update,
};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use adapter::PgPoolAdapter;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "sqlite")]
pub use adapter::SqliteAdapter;
