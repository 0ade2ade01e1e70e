//! Convenient imports for typical `sqlweave` usage.
//!
//! ```ignore
//! use sqlweave::prelude::*;
//! ```

pub use crate::qb;
pub use crate::{
    Adapter, AdapterResolver, Conditional, Connections, Dialect, ExecConfig, Expr, FetchRows,
    FromRow, FromValue, Mutation, Page, PgAdapter, QbError, QbResult, QueryBuilder,
    Row, SearchableSelect, Select, Value, Where, expr,
};

#[cfg(feature = "pool")]
pub use crate::{PgPoolAdapter, create_pool, create_pool_with_config};

#[cfg(feature = "sqlite")]
pub use crate::SqliteAdapter;
