//! PostgreSQL adapters over `tokio-postgres`.

use super::{Adapter, Dialect, StatementHandle};
use crate::error::DriverError;
use crate::ident::Ident;
use crate::query::{PlaceholderStyle, Query};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;
use bytes::BytesMut;
use std::error::Error;
use std::sync::Arc;
use tokio_postgres::GenericClient;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// Binds a [`Value`] to whatever type the server inferred for its parameter.
///
/// Text values are parsed into the target type for JSON, UUID, date/time,
/// integer and boolean parameters, so values converted from `chrono`, `uuid`
/// and `serde_json` types round-trip into typed columns.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => Value::Int(i64::from(*b)).to_sql(ty, out),
                _ => b.to_sql(ty, out),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    i.to_string().to_sql(ty, out)
                }
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    f.to_string().to_sql(ty, out)
                }
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn text_to_sql(
    s: &str,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s)?.to_sql(ty, out),
        Type::DATE => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIMESTAMP => {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")?.to_sql(ty, out)
        }
        Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(s)?
            .with_timezone(&chrono::Utc)
            .to_sql(ty, out),
        Type::INT2 => s.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
        Type::BOOL => s.parse::<bool>()?.to_sql(ty, out),
        _ => s.to_sql(ty, out),
    }
}

/// Decode one column by its server type.
///
/// Types without a [`Value`] counterpart are read as text, which fails for
/// binary-only types (e.g. `NUMERIC`); cast those to text in the select list.
fn decode_column(row: &tokio_postgres::Row, idx: usize) -> Result<Value, tokio_postgres::Error> {
    let value = match *row.columns()[idx].type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::from),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::from),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| Value::Text(v.to_string())),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx)?.map(Value::from),
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)?
            .map(Value::from),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
            .map(Value::from),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .map(Value::from),
        _ => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Run `query` on any tokio-postgres client (plain client or transaction).
async fn run<C>(client: &C, query: &Query) -> Result<StatementHandle, DriverError>
where
    C: GenericClient + Sync,
{
    let sql = query.to_positional(PlaceholderStyle::Dollar);
    let statement = client.prepare(&sql).await.map_err(DriverError::unprepared)?;
    let params: Vec<&(dyn ToSql + Sync)> = query
        .values()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect();

    if statement.columns().is_empty() {
        let affected = client
            .execute(&statement, &params)
            .await
            .map_err(DriverError::prepared)?;
        return Ok(StatementHandle::empty(affected));
    }

    let rows = client
        .query(&statement, &params)
        .await
        .map_err(DriverError::prepared)?;
    let columns: Arc<[String]> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let values = (0..row.len())
            .map(|idx| decode_column(row, idx))
            .collect::<Result<Vec<_>, _>>()
            .map_err(DriverError::prepared)?;
        out.push(Row::new(Arc::clone(&columns), values));
    }
    let returned = out.len() as u64;
    Ok(StatementHandle::new(columns, out, returned))
}

async fn columns_of<C>(client: &C, table: &str) -> Result<Vec<String>, DriverError>
where
    C: GenericClient + Sync,
{
    let ident = Ident::parse(table).map_err(DriverError::unprepared)?;
    let rows = client
        .query(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = COALESCE($1::text, current_schema()::text) \
             AND table_name = $2::text ORDER BY ordinal_position",
            &[&ident.qualifier(), &ident.name()],
        )
        .await
        .map_err(DriverError::prepared)?;
    rows.iter()
        .map(|row| row.try_get::<_, String>(0))
        .collect::<Result<_, _>>()
        .map_err(DriverError::prepared)
}

/// Adapter over a single `tokio_postgres::Client`.
///
/// ```ignore
/// let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
/// tokio::spawn(connection);
/// let adapter: Arc<dyn Adapter> = Arc::new(PgAdapter::new(client));
/// ```
pub struct PgAdapter {
    client: tokio_postgres::Client,
}

impl PgAdapter {
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

#[async_trait]
impl Adapter for PgAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn prepare_and_execute(&self, query: &Query) -> Result<StatementHandle, DriverError> {
        run(&self.client, query).await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DriverError> {
        columns_of(&self.client, table).await
    }
}

/// Adapter that checks a client out of a `deadpool-postgres` pool per statement.
#[cfg(feature = "pool")]
pub struct PgPoolAdapter {
    pool: deadpool_postgres::Pool,
}

#[cfg(feature = "pool")]
impl PgPoolAdapter {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &deadpool_postgres::Pool {
        &self.pool
    }
}

#[cfg(feature = "pool")]
#[async_trait]
impl Adapter for PgPoolAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn prepare_and_execute(&self, query: &Query) -> Result<StatementHandle, DriverError> {
        let object = self.pool.get().await.map_err(DriverError::unprepared)?;
        let client: &tokio_postgres::Client = &object;
        run(client, query).await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DriverError> {
        let object = self.pool.get().await.map_err(DriverError::unprepared)?;
        let client: &tokio_postgres::Client = &object;
        columns_of(client, table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<Vec<u8>, Box<dyn Error + Sync + Send>> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn test_int_narrows_to_target_type() {
        assert_eq!(encode(&Value::Int(7), &Type::INT4).expect("int4"), 7i32.to_be_bytes());
        assert_eq!(encode(&Value::Int(7), &Type::INT8).expect("int8"), 7i64.to_be_bytes());
        assert!(encode(&Value::Int(i64::MAX), &Type::INT2).is_err());
    }

    #[test]
    fn test_text_parses_typed_targets() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            encode(&Value::from(id), &Type::UUID).expect("uuid"),
            id.as_bytes().to_vec()
        );
        assert!(encode(&Value::from("not-a-uuid"), &Type::UUID).is_err());
        assert_eq!(encode(&Value::from("abc"), &Type::TEXT).expect("text"), b"abc".to_vec());
    }

    #[test]
    fn test_null_is_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(Value::Null.to_sql(&Type::INT4, &mut buf), Ok(IsNull::Yes)));
    }
}
