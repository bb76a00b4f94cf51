//! [`QueryExecutor`] over a sqlx MySQL pool.
//!
//! Statements with parameters go through the binary protocol (server-side prepare, then
//! bind); sqlx has no client-side emulation mode. Statements without parameters are sent
//! as plain text queries.

use super::{with_timeout, ExecOutcome, QueryExecutor, QueryOutput};
use crate::config::{validate, DbConfig};
use crate::error::DbResult;
use crate::sql::{to_positional, Params};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Either, Executor};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct MySqlExecutor {
    pool: MySqlPool,
    statement_timeout: Option<Duration>,
}

/// Connect options from config. Empty user/password leave the driver defaults in place.
pub fn connect_options(config: &DbConfig) -> MySqlConnectOptions {
    let mut opts = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.db_name)
        .charset(&config.charset);
    if !config.user.is_empty() {
        opts = opts.username(&config.user);
    }
    if !config.password.is_empty() {
        opts = opts.password(&config.password);
    }
    opts
}

fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    let mut pool = MySqlPoolOptions::new().max_connections(config.max_connections);
    if let Some(t) = config.acquire_timeout {
        pool = pool.acquire_timeout(t);
    }
    pool
}

impl MySqlExecutor {
    /// Open the pool and establish the first connection.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        validate(config)?;
        let pool = pool_options(config)
            .connect_with(connect_options(config))
            .await?;
        tracing::info!(dsn = %config.dsn(), max_connections = config.max_connections, "connected to database");
        Ok(Self::from_pool(pool).with_statement_timeout(config.statement_timeout))
    }

    /// Build the pool without connecting; the first statement opens the connection.
    pub fn connect_lazy(config: &DbConfig) -> DbResult<Self> {
        validate(config)?;
        let pool = pool_options(config).connect_lazy_with(connect_options(config));
        tracing::debug!(dsn = %config.dsn(), "lazy database pool created");
        Ok(Self::from_pool(pool).with_statement_timeout(config.statement_timeout))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        MySqlExecutor {
            pool,
            statement_timeout: None,
        }
    }

    pub fn with_statement_timeout(mut self, limit: Option<Duration>) -> Self {
        self.statement_timeout = limit;
        self
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(&self, sql: &str, params: &Params) -> DbResult<ExecOutcome> {
        let (positional, values) = to_positional(sql, params)?;
        tracing::debug!(sql = %positional, params = ?params.keys().collect::<Vec<_>>(), "execute");
        let done = if values.is_empty() {
            with_timeout(self.statement_timeout, (&self.pool).execute(positional.as_str())).await?
        } else {
            let mut query = sqlx::query(&positional);
            for v in values {
                query = query.bind(v);
            }
            with_timeout(self.statement_timeout, query.execute(&self.pool)).await?
        };
        Ok(ExecOutcome {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn run(&self, sql: &str, params: &Params) -> DbResult<QueryOutput> {
        let (positional, values) = to_positional(sql, params)?;
        tracing::debug!(sql = %positional, params = ?params.keys().collect::<Vec<_>>(), "run");
        let collect = async {
            let mut stream = if values.is_empty() {
                (&self.pool).fetch_many(positional.as_str())
            } else {
                let mut query = sqlx::query(&positional);
                for v in values {
                    query = query.bind(v);
                }
                (&self.pool).fetch_many(query)
            };
            let mut out = QueryOutput::default();
            while let Some(item) = stream.try_next().await? {
                match item {
                    Either::Left(done) => {
                        out.rows_affected += done.rows_affected();
                        if done.last_insert_id() != 0 {
                            out.last_insert_id = done.last_insert_id();
                        }
                    }
                    Either::Right(row) => out.rows.push(row_to_json(&row)),
                }
            }
            Ok::<_, sqlx::Error>(out)
        };
        with_timeout(self.statement_timeout, collect).await
    }
}

/// Render one result row as a JSON object keyed by column name.
pub fn row_to_json(row: &MySqlRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, col.ordinal()));
    }
    Value::Object(map)
}

fn cell_to_value(row: &MySqlRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(t)) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return Value::String(t.format("%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(idx) {
        return j;
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    // DECIMAL and other types no Rust type above accepts: decode the wire text as-is.
    text_cell(raw_text(row, idx).as_deref())
}

fn raw_text(row: &MySqlRow, idx: usize) -> Option<String> {
    use sqlx::{Decode, Row, ValueRef};
    let raw = row.try_get_raw(idx).ok()?;
    if raw.is_null() {
        return None;
    }
    <&str as Decode<MySql>>::decode(raw).ok().map(str::to_owned)
}

/// Text kept verbatim so DECIMAL values keep their full precision.
fn text_cell(text: Option<&str>) -> Value {
    text.map_or(Value::Null, |s| Value::String(s.to_string()))
}
