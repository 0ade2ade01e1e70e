//! Searchable, countable result sets on top of [`Select`].

use crate::adapter::{Adapter, AdapterResolver, Dialect};
use crate::binding::Bindings;
use crate::condition::{Conditional, Where, escape_like};
use crate::error::{ExecutionError, QbError, QbResult};
use crate::expr::expr;
use crate::qb::select::Select;
use crate::qb::statement::{Statement, StatementKind};
use crate::qb::traits::{FetchRows, QueryBuilder};
use crate::row::FromRow;
use crate::value::Value;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Hook applied to the derived count query before it runs.
pub type CountAdjust = Arc<dyn Fn(Select) -> Select + Send + Sync>;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A [`Select`] with free-text search over a set of fields and a derived
/// `COUNT(*)` query.
///
/// The search is one parenthesized OR group of pattern matches, ANDed with
/// the select's own conditions. Each field is cast to text first, so numeric
/// and timestamp columns can be searched too. Postgres adapters match with
/// `ILIKE`; every other adapter (and offline compiles) use `LOWER(...) LIKE`
/// with a lowercased pattern. `%`, `_` and `!` in the search text match
/// themselves.
///
/// Without explicit [`search_fields`](Self::search_fields) the plain columns of
/// the field list are searched, and failing that every column of the primary
/// table as reported by the adapter.
///
/// ```ignore
/// let mut listing = qb::searchable(qb::select("companies").fields(["name", "email"]))
///     .and_where("active", true)
///     .search("acme");
/// let page = listing.paginate::<Row, _>(&connections, 2, 20).await?;
/// ```
#[derive(Clone)]
pub struct SearchableSelect {
    select: Select,
    search: Option<String>,
    search_fields: Vec<String>,
    strip_group_by: bool,
    count_adjust: Option<CountAdjust>,
    count_query: Option<Box<Select>>,
    /// Captured from the adapter on execution
    native_match: Option<bool>,
    dialect: Option<Dialect>,
    /// Columns of the primary table, when the adapter had to supply them
    table_columns: Option<Vec<String>>,
    statement: Statement,
}

impl fmt::Debug for SearchableSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchableSelect")
            .field("select", &self.select)
            .field("search", &self.search)
            .field("search_fields", &self.search_fields)
            .field("strip_group_by", &self.strip_group_by)
            .field("count_adjust", &self.count_adjust.as_ref().map(|_| "<fn>"))
            .field("count_query", &self.count_query)
            .field("native_match", &self.native_match)
            .field("dialect", &self.dialect)
            .field("table_columns", &self.table_columns)
            .finish()
    }
}

impl SearchableSelect {
    pub fn new(select: Select) -> Self {
        let statement = select.statement().clone();
        Self {
            select,
            search: None,
            search_fields: Vec::new(),
            strip_group_by: false,
            count_adjust: None,
            count_query: None,
            native_match: None,
            dialect: None,
            table_columns: None,
            statement,
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut Self)) -> Self {
        self.statement.reset();
        f(&mut self);
        self
    }

    /// Search for `text` (case-insensitive substring). Blank text disables the search.
    pub fn search(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.edit(|s| s.search = Some(text))
    }

    /// Fields the search runs over.
    pub fn search_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.edit(|s| s.search_fields = fields)
    }

    /// Drop GROUP BY and HAVING from the derived count query.
    pub fn strip_group_by_on_count(self, strip: bool) -> Self {
        self.edit(|s| s.strip_group_by = strip)
    }

    /// Adjust the derived count query before it runs.
    pub fn count_adjust(self, adjust: impl Fn(Select) -> Select + Send + Sync + 'static) -> Self {
        let adjust: CountAdjust = Arc::new(adjust);
        self.edit(|s| s.count_adjust = Some(adjust))
    }

    /// Count with `query` instead of a derived one. The search is not applied to it.
    pub fn with_count_query(self, query: Select) -> Self {
        self.edit(|s| s.count_query = Some(Box::new(query)))
    }

    /// Edit the wrapped select.
    pub fn with_select(self, f: impl FnOnce(Select) -> Select) -> Self {
        let mut this = self;
        this.statement.reset();
        this.select = f(this.select);
        this
    }

    pub fn connection(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut this = self.with_select(|s| s.connection(name.clone()));
        this.statement.set_connection(Some(name));
        this
    }

    pub fn select(&self) -> &Select {
        &self.select
    }

    /// 1-indexed page of the listing.
    pub fn page(self, page: u64, per_page: u64) -> Self {
        self.with_select(|s| s.page(page, per_page))
    }

    fn search_text(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    fn needs_table_columns(&self) -> bool {
        self.search_text().is_some()
            && self.search_fields.is_empty()
            && self.select.column_fields().is_empty()
    }

    fn fields_to_search(&self) -> QbResult<Vec<String>> {
        if !self.search_fields.is_empty() {
            return Ok(self.search_fields.clone());
        }
        let columns = self.select.column_fields();
        if !columns.is_empty() {
            return Ok(columns);
        }
        match &self.table_columns {
            Some(columns) if !columns.is_empty() => Ok(columns.clone()),
            _ => Err(QbError::build(
                "search has no fields: set search_fields, select plain columns, \
                 or execute through an adapter that can list table columns",
            )),
        }
    }

    /// The OR group matching the search text, if a search is active.
    fn search_group(&self) -> QbResult<Option<Where>> {
        let Some(text) = self.search_text() else {
            return Ok(None);
        };
        let pattern = format!("%{}%", escape_like(text));
        let native = self.native_match.unwrap_or(false);
        let text_type = match self.dialect {
            Some(Dialect::MySql) => "CHAR",
            _ => "TEXT",
        };
        let group = self
            .fields_to_search()?
            .into_iter()
            .fold(Where::new(), |w, field| {
                let cast = format!("CAST({field} AS {text_type})");
                if native {
                    w.or_where_match(cast, "ILIKE", &field, Value::from(pattern.as_str()))
                } else {
                    w.or_where_match(
                        format!("LOWER({cast})"),
                        "LIKE",
                        &field,
                        Value::from(pattern.to_lowercase()),
                    )
                }
            });
        Ok(Some(group))
    }

    /// The wrapped select with the search group applied.
    pub fn searched_select(&self) -> QbResult<Select> {
        let select = self.select.clone();
        Ok(match self.search_group()? {
            Some(group) => select.where_group(group),
            None => select,
        })
    }

    /// The query [`count`](Self::count) runs.
    pub fn count_select(&self) -> QbResult<Select> {
        let select = match &self.count_query {
            Some(query) => (**query).clone(),
            None => {
                let mut select = self.searched_select()?;
                select.strip_for_count(self.strip_group_by);
                if select.has_group_by() || select.is_distinct() {
                    // DISTINCT keeps its fields: they decide which rows are distinct
                    let inner = if select.is_distinct() {
                        select
                    } else {
                        select.field_expr(expr("1"), None)
                    };
                    let outer = Select::new()
                        .from_select(inner, "counted")
                        .field_expr(expr("COUNT(*)"), Some("total"));
                    match self.statement.connection() {
                        Some(name) => outer.connection(name),
                        None => outer,
                    }
                } else {
                    select.field_expr(expr("COUNT(*)"), Some("total"))
                }
            }
        };
        Ok(match &self.count_adjust {
            Some(adjust) => adjust(select),
            None => select,
        })
    }

    /// Capture what the search needs from `adapter`. Returns whether anything changed.
    async fn capture(&mut self, adapter: &dyn Adapter) -> QbResult<bool> {
        let native = adapter.supports_native_case_insensitive_match();
        let dialect = adapter.dialect();
        let mut changed = self.native_match != Some(native) || self.dialect != Some(dialect);
        self.native_match = Some(native);
        self.dialect = Some(dialect);

        if self.needs_table_columns()
            && self.table_columns.is_none()
            && let Some(table) = self.select.primary_table()
        {
            let table = table.split_whitespace().next().unwrap_or_default().to_string();
            let columns = adapter.table_columns(&table).await.map_err(|e| {
                QbError::from(ExecutionError {
                    sql: format!("/* columns of {table} */"),
                    bindings: Vec::new(),
                    connection: self.statement.connection().map(String::from),
                    prepared: e.prepared,
                    source: e.source,
                })
            })?;
            debug!(
                target: "sqlweave.sql",
                table = %table,
                columns = columns.len(),
                "loaded search columns"
            );
            self.table_columns = Some(columns);
            changed = true;
        }
        Ok(changed)
    }

    /// Total rows matching the select and the search, ignoring pagination.
    ///
    /// A count query that returns no row counts as 0.
    pub async fn count<R>(&mut self, resolver: &R) -> QbResult<u64>
    where
        R: AdapterResolver + ?Sized,
    {
        let adapter = resolver.adapter(self.statement.connection())?;
        if self.capture(adapter.as_ref()).await? && !self.statement.was_executed() {
            self.statement.reset();
        }
        let mut query = self.count_select()?;
        let value = query.fetch_value(resolver).await?;
        count_from(value)
    }

    /// Fetch one 1-indexed page together with the total count.
    pub async fn paginate<T, R>(&mut self, resolver: &R, page: u64, per_page: u64) -> QbResult<Page<T>>
    where
        T: FromRow + Send,
        R: AdapterResolver + ?Sized,
    {
        let page = page.max(1);
        let total = self.count(resolver).await?;
        self.select = self.select.clone().page(page, per_page);
        self.statement.reset();
        let items: Vec<T> = self.fetch_all_as(resolver).await?;
        let total_pages = if per_page == 0 { 0 } else { total.div_ceil(per_page) };
        Ok(Page {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }
}

fn count_from(value: Option<Value>) -> QbResult<u64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Int(n)) => Ok(u64::try_from(n).unwrap_or(0)),
        Some(Value::Float(x)) if x >= 0.0 => Ok(x as u64),
        Some(Value::Float(_)) => Ok(0),
        Some(Value::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| QbError::decode("total", format!("not a row count: '{s}'"))),
        Some(Value::Bool(_)) => Err(QbError::decode("total", "not a row count: boolean")),
    }
}

impl Conditional for SearchableSelect {
    fn conditions(&self) -> &Where {
        self.select.conditions()
    }

    fn conditions_mut(&mut self) -> &mut Where {
        self.statement.reset();
        self.select.conditions_mut()
    }
}

impl QueryBuilder for SearchableSelect {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build(&self, bindings: &mut Bindings) -> QbResult<String> {
        self.searched_select()?.build(bindings)
    }

    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn statement_mut(&mut self) -> &mut Statement {
        &mut self.statement
    }

    fn prepare<'a>(
        &'a mut self,
        adapter: &'a dyn Adapter,
    ) -> impl Future<Output = QbResult<()>> + Send {
        async move {
            if self.capture(adapter).await? {
                // drops a compile made before the adapter was known
                self.statement.reset();
            }
            Ok(())
        }
    }
}

impl FetchRows for SearchableSelect {}
