//! Insert/update/run entry points over any [`QueryExecutor`].

use crate::config::DbConfig;
use crate::error::DbResult;
use crate::executor::{ExecOutcome, MySqlExecutor, QueryExecutor, QueryOutput};
use crate::sql::{build_insert, build_update, to_positional, AllowList, CompiledQuery, FieldValueMap, Params, WhereClause};

/// Database handle. Build one explicitly and pass it where it is needed;
/// [`crate::state::shared`] offers a lazily-created process-wide instance.
#[derive(Clone, Debug)]
pub struct Db<E = MySqlExecutor> {
    executor: E,
}

impl Db<MySqlExecutor> {
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        Ok(Db::new(MySqlExecutor::connect(config).await?))
    }

    pub fn connect_lazy(config: &DbConfig) -> DbResult<Self> {
        Ok(Db::new(MySqlExecutor::connect_lazy(config)?))
    }
}

impl<E: QueryExecutor> Db<E> {
    pub fn new(executor: E) -> Self {
        Db { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Insert one row from the allowed fields of `data`. Returns the generated id (0 if the table has none).
    pub async fn insert(&self, table: &str, data: &FieldValueMap, allowed: &AllowList) -> DbResult<u64> {
        warn_if_unrestricted(table, allowed);
        let q = build_insert(table, data, allowed)?;
        let outcome = self.execute(&q).await?;
        tracing::debug!(table, id = outcome.last_insert_id, "row inserted");
        Ok(outcome.last_insert_id)
    }

    /// Update rows matching `conditions` with the allowed fields of `data`. Returns the affected row count.
    pub async fn update(
        &self,
        table: &str,
        data: &FieldValueMap,
        conditions: &WhereClause,
        allowed: &AllowList,
    ) -> DbResult<u64> {
        warn_if_unrestricted(table, allowed);
        if conditions.is_empty() && conditions.allows_all_rows() {
            tracing::warn!(table, "updating every row: no WHERE condition");
        }
        let q = build_update(table, data, conditions, allowed)?;
        let outcome = self.execute(&q).await?;
        tracing::debug!(table, rows = outcome.rows_affected, "rows updated");
        Ok(outcome.rows_affected)
    }

    /// Run a compiled statement after checking its placeholders against its parameters.
    pub async fn execute(&self, query: &CompiledQuery) -> DbResult<ExecOutcome> {
        // Guards executors that bind without validating placeholders themselves.
        to_positional(&query.sql, &query.params)?;
        tracing::debug!(sql = %query.sql, params = ?query.params.keys().collect::<Vec<_>>(), "query");
        self.executor.execute(&query.sql, &query.params).await
    }

    /// Run arbitrary SQL. With no params it is sent as-is; otherwise it is prepared and bound.
    pub async fn run(&self, sql: &str, params: &Params) -> DbResult<QueryOutput> {
        self.executor.run(sql, params).await
    }
}

fn warn_if_unrestricted(table: &str, allowed: &AllowList) {
    if matches!(allowed, AllowList::AllFields) {
        tracing::warn!(table, "writing with AllowList::AllFields: every submitted field is writable");
    }
}
