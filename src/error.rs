//! Typed errors for configuration, parameter binding and execution.

use std::time::Duration;
use thiserror::Error;

/// Programmer errors: bad identifiers, missing allow-lists, bad connection settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid table name: '{0}'")]
    InvalidTable(String),
    #[error("invalid column name: '{0}'")]
    InvalidColumn(String),
    #[error("allow-list is empty; pass the writable fields or opt into AllowList::AllFields")]
    EmptyAllowList,
    #[error("update of `{0}` has no WHERE condition; use WhereClause::all_rows() to update every row")]
    UnscopedUpdate(String),
    #[error("update of `{0}` has no writable field")]
    NothingToUpdate(String),
    #[error("unsupported driver: {0} (expected mysql)")]
    UnsupportedDriver(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Mismatch between the placeholders in a SQL string and the supplied parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("placeholder :{0} has no bound parameter")]
    Unbound(String),
    #[error("parameter :{0} does not appear in the statement")]
    Unused(String),
    #[error("placeholder :{0} appears more than once")]
    Repeated(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("database: {0}")]
    Execution(#[from] sqlx::Error),
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
}

pub type DbResult<T> = Result<T, DbError>;
