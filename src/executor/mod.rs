//! The execution seam: anything that can prepare, bind and run a statement with named parameters.

mod mysql;

pub use mysql::{connect_options, row_to_json, MySqlExecutor};

use crate::error::{DbError, DbResult};
use crate::sql::Params;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of a write statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Auto-increment id generated by an INSERT; 0 when none was generated.
    pub last_insert_id: u64,
}

/// Result of an arbitrary statement: returned rows as JSON objects plus write counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Value>,
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Runs SQL containing `:name` placeholders against a database.
///
/// Implementations must bind every parameter through the driver, never by splicing
/// text, and must surface driver errors unchanged as [`DbError::Execution`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &Params) -> DbResult<ExecOutcome>;

    async fn run(&self, sql: &str, params: &Params) -> DbResult<QueryOutput>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    async fn execute(&self, sql: &str, params: &Params) -> DbResult<ExecOutcome> {
        (**self).execute(sql, params).await
    }

    async fn run(&self, sql: &str, params: &Params) -> DbResult<QueryOutput> {
        (**self).run(sql, params).await
    }
}

/// Await `fut`, giving up after `limit` when one is set.
pub async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> DbResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| DbError::Timeout(limit))?
            .map_err(DbError::from),
        None => Ok(fut.await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_fires_on_slow_statement() {
        let limit = Duration::from_millis(10);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(1)
        };
        let err = with_timeout(Some(limit), slow).await.unwrap_err();
        assert!(matches!(err, DbError::Timeout(d) if d == limit));
    }

    #[tokio::test]
    async fn driver_errors_pass_through() {
        let err = with_timeout(None, async { Err::<u8, _>(sqlx::Error::RowNotFound) })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Execution(sqlx::Error::RowNotFound)));

        let ok = with_timeout(Some(Duration::from_secs(1)), async { Ok::<_, sqlx::Error>(3) }).await;
        assert_eq!(ok.unwrap(), 3);
    }
}
