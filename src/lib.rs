//! safedb: allow-listed, parameterized INSERT/UPDATE for MySQL.
//!
//! The builder in [`sql`] turns an untrusted field map into SQL with `:name`
//! placeholders; [`Db`] runs it through a [`QueryExecutor`].

pub mod config;
pub mod error;
pub mod executor;
pub mod service;
pub mod sql;
pub mod state;

pub use config::DbConfig;
pub use error::{BindingError, ConfigError, DbError, DbResult};
pub use executor::{ExecOutcome, MySqlExecutor, QueryExecutor, QueryOutput};
pub use service::Db;
pub use sql::{
    build_insert, build_set_clause, build_update, build_where_clause, field_map, fields_from_json,
    resolve_allowed_fields, AllowList, BindValue, CompareOp, CompiledQuery, FieldValueMap, Fragment, Params,
    WhereClause, WhereCondition,
};
pub use state::{init_shared, shared};
