//! Identifier quoting for MySQL. Values never pass through here; only table and column names.

use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

fn table_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$")
            .expect("table name pattern is valid")
    })
}

/// Quote one identifier with backticks, doubling any embedded backtick.
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

/// Quote a column name. Any character is allowed except NUL; empty names are rejected.
pub fn quoted_column(name: &str) -> Result<String, ConfigError> {
    if name.is_empty() || name.contains('\0') {
        return Err(ConfigError::InvalidColumn(name.to_string()));
    }
    Ok(quoted(name))
}

/// Validate and quote a table name, optionally schema-qualified (`shop.users` -> `` `shop`.`users` ``).
pub fn quoted_table(table: &str) -> Result<String, ConfigError> {
    if !table_pattern().is_match(table) {
        return Err(ConfigError::InvalidTable(table.to_string()));
    }
    Ok(table.split('.').map(quoted).collect::<Vec<_>>().join("."))
}
