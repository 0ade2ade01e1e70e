//! Database adapters and connection resolution.
//!
//! Builders never open connections. At execution time they ask an
//! [`AdapterResolver`] for the adapter registered under their connection name
//! (or the default one) and hand it the compiled [`Query`].

mod handle;
#[cfg(test)]
pub(crate) mod mock;
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use handle::StatementHandle;
#[cfg(feature = "pool")]
pub use postgres::PgPoolAdapter;
pub use postgres::PgAdapter;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAdapter;

use crate::config::ExecConfig;
use crate::error::{DriverError, QbError, QbResult};
use crate::query::{PlaceholderStyle, Query};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// SQL dialect family of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Whether the dialect has a native case-insensitive pattern operator (`ILIKE`).
    pub fn supports_native_case_insensitive_match(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Placeholder syntax the dialect's drivers bind with.
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::MySql => PlaceholderStyle::Question,
            Dialect::Postgres => PlaceholderStyle::Dollar,
            Dialect::Sqlite => PlaceholderStyle::NumberedQuestion,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A prepared-statement driver for one connection.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Whether pattern searches can use a native case-insensitive operator.
    ///
    /// Defaults to the dialect's capability.
    fn supports_native_case_insensitive_match(&self) -> bool {
        self.dialect().supports_native_case_insensitive_match()
    }

    /// Prepare `query`, bind its values in order and run it.
    ///
    /// Drivers report whether the failure happened before or after the
    /// statement was prepared through [`DriverError::prepared`].
    async fn prepare_and_execute(&self, query: &Query) -> Result<StatementHandle, DriverError>;

    /// Column names of `table`, in declaration order.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DriverError> {
        Err(DriverError::unprepared(format!(
            "{} adapter cannot list the columns of '{table}'",
            self.dialect()
        )))
    }
}

/// Resolves connection names to adapters.
pub trait AdapterResolver: Send + Sync {
    /// The adapter for `connection`, or the default adapter when `None`.
    fn adapter(&self, connection: Option<&str>) -> QbResult<Arc<dyn Adapter>>;

    fn config(&self) -> ExecConfig {
        ExecConfig::default()
    }
}

/// A single adapter resolves every connection name to itself.
impl AdapterResolver for Arc<dyn Adapter> {
    fn adapter(&self, _connection: Option<&str>) -> QbResult<Arc<dyn Adapter>> {
        Ok(Arc::clone(self))
    }
}

/// Named connections with a default.
///
/// The first registered connection becomes the default unless
/// [`Connections::with_default`] says otherwise.
///
/// ```ignore
/// let connections = Connections::new()
///     .with("main", Arc::new(PgAdapter::new(client)))
///     .with("reporting", Arc::new(PgPoolAdapter::new(pool)))
///     .with_config(ExecConfig::new().with_slow_query_threshold(Duration::from_millis(200)));
/// ```
#[derive(Clone, Default)]
pub struct Connections {
    default: Option<String>,
    adapters: HashMap<String, Arc<dyn Adapter>>,
    config: ExecConfig,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding one adapter under the name `default`.
    pub fn single(adapter: Arc<dyn Adapter>) -> Self {
        Self::new().with("default", adapter)
    }

    /// Register an adapter under `name`, replacing any previous one.
    pub fn with(mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        let name = name.into();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.adapters.insert(name, adapter);
        self
    }

    /// Use `name` when a builder does not name a connection.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

impl AdapterResolver for Connections {
    fn adapter(&self, connection: Option<&str>) -> QbResult<Arc<dyn Adapter>> {
        let name = match connection.or(self.default.as_deref()) {
            Some(name) => name,
            None => return Err(QbError::Connection("no default connection configured".into())),
        };
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| QbError::Connection(format!("no connection named '{name}'")))
    }

    fn config(&self) -> ExecConfig {
        self.config.clone()
    }
}

impl fmt::Debug for Connections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Connections")
            .field("default", &self.default)
            .field("adapters", &names)
            .field("config", &self.config)
            .finish()
    }
}
