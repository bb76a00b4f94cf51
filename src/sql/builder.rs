//! Builds parameterized INSERT and UPDATE statements from untrusted field maps.
//!
//! Values only ever reach the `params` map; the SQL text holds quoted identifiers,
//! fixed keywords and `:name` placeholders.

use crate::error::ConfigError;
use crate::sql::ident::{quoted_column, quoted_table};
use crate::sql::params::{BindValue, FieldValueMap, Params};
use std::collections::HashSet;

/// Which submitted fields may be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowList {
    /// Every key present in the submitted data is writable. Unsafe for untrusted input.
    AllFields,
    /// Only these columns, in this order.
    Only(Vec<String>),
}

impl AllowList {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Only(fields.into_iter().map(Into::into).collect())
    }
}

/// Comparison used by a WHERE condition. A closed set: operators are never caller text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompareOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

impl std::str::FromStr for CompareOp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Ok(CompareOp::Eq),
            "<>" | "!=" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            "LIKE" => Ok(CompareOp::Like),
            _ => Err(ConfigError::Validation(format!("unsupported operator: {}", s))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhereCondition {
    pub column: String,
    pub op: CompareOp,
    pub value: BindValue,
}

/// Ordered conditions joined with AND.
///
/// An empty clause only compiles into an UPDATE when built with [`WhereClause::all_rows`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<WhereCondition>,
    all_rows: bool,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit opt-in for statements that touch every row when no condition is added.
    pub fn all_rows() -> Self {
        WhereClause {
            conditions: Vec::new(),
            all_rows: true,
        }
    }

    /// Equality conditions from `(column, value)` pairs, in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BindValue>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |w, (k, v)| w.eq(k, v))
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.cmp(column, CompareOp::Eq, value)
    }

    pub fn cmp(mut self, column: impl Into<String>, op: CompareOp, value: impl Into<BindValue>) -> Self {
        self.conditions.push(WhereCondition {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn allows_all_rows(&self) -> bool {
        self.all_rows
    }
}

/// A SQL piece plus the parameters its placeholders refer to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Params,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Statement ready for a [`crate::QueryExecutor`]: SQL with `:name` placeholders and their values.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Params,
}

/// Hands out placeholder names unique within one statement.
#[derive(Default)]
struct ParamNamer {
    used: HashSet<String>,
}

impl ParamNamer {
    /// Bare column name when free, else `<name>_<namespace>`, then `<name>_<namespace>2`, ...
    fn allocate(&mut self, column: &str, namespace: &str) -> String {
        let base = placeholder_base(column);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = if n == 1 {
                format!("{}_{}", base, namespace)
            } else {
                format!("{}_{}{}", base, namespace, n)
            };
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Placeholder-safe spelling of a column name: `[A-Za-z_][A-Za-z0-9_]*`.
fn placeholder_base(column: &str) -> String {
    let mut s: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert_str(0, "p_");
    }
    s
}

/// Fields that may be written for this call, in write order.
pub fn resolve_allowed_fields(data: &FieldValueMap, allowed: &AllowList) -> Result<Vec<String>, ConfigError> {
    match allowed {
        AllowList::AllFields => Ok(data.keys().cloned().collect()),
        AllowList::Only(fields) if fields.is_empty() => Err(ConfigError::EmptyAllowList),
        AllowList::Only(fields) => Ok(fields.clone()),
    }
}

/// `` `a` = :a, `b` = :b `` for every allowed field present in `data`. Missing fields are skipped.
pub fn build_set_clause(data: &FieldValueMap, allowed_fields: &[String]) -> Result<Fragment, ConfigError> {
    set_clause(data, allowed_fields, &mut ParamNamer::default())
}

/// `` WHERE `a` = :a AND `b` > :b ``; empty when there are no conditions.
pub fn build_where_clause(conditions: &WhereClause) -> Result<Fragment, ConfigError> {
    where_clause(conditions, &mut ParamNamer::default())
}

fn set_clause(data: &FieldValueMap, allowed_fields: &[String], namer: &mut ParamNamer) -> Result<Fragment, ConfigError> {
    let mut out = Fragment::default();
    let mut seen = HashSet::new();
    let mut sets = Vec::new();
    for field in allowed_fields {
        let Some(value) = data.get(field) else { continue };
        if !seen.insert(field.as_str()) {
            continue;
        }
        let col = quoted_column(field)?;
        let name = namer.allocate(field, "set");
        sets.push(format!("{} = :{}", col, name));
        out.params.insert(name, value.clone());
    }
    out.sql = sets.join(", ");
    Ok(out)
}

fn where_clause(conditions: &WhereClause, namer: &mut ParamNamer) -> Result<Fragment, ConfigError> {
    let mut out = Fragment::default();
    let mut parts = Vec::new();
    for cond in conditions.conditions() {
        let col = quoted_column(&cond.column)?;
        let name = namer.allocate(&cond.column, "where");
        parts.push(format!("{} {} :{}", col, cond.op.as_sql(), name));
        out.params.insert(name, cond.value.clone());
    }
    if !parts.is_empty() {
        out.sql = format!("WHERE {}", parts.join(" AND "));
    }
    Ok(out)
}

/// `` INSERT INTO `t` SET ... ``. With nothing writable, a defaults-only row: `` INSERT INTO `t` () VALUES () ``.
pub fn build_insert(table: &str, data: &FieldValueMap, allowed: &AllowList) -> Result<CompiledQuery, ConfigError> {
    let table_q = quoted_table(table)?;
    let fields = resolve_allowed_fields(data, allowed)?;
    let set = build_set_clause(data, &fields)?;
    let sql = if set.is_empty() {
        format!("INSERT INTO {} () VALUES ()", table_q)
    } else {
        format!("INSERT INTO {} SET {}", table_q, set.sql)
    };
    Ok(CompiledQuery { sql, params: set.params })
}

/// `` UPDATE `t` SET ... WHERE ... ``. SET placeholders win bare names; WHERE ones get a `_where` suffix on collision.
pub fn build_update(
    table: &str,
    data: &FieldValueMap,
    conditions: &WhereClause,
    allowed: &AllowList,
) -> Result<CompiledQuery, ConfigError> {
    let table_q = quoted_table(table)?;
    if conditions.is_empty() && !conditions.allows_all_rows() {
        return Err(ConfigError::UnscopedUpdate(table.to_string()));
    }
    let fields = resolve_allowed_fields(data, allowed)?;
    let mut namer = ParamNamer::default();
    let set = set_clause(data, &fields, &mut namer)?;
    if set.is_empty() {
        return Err(ConfigError::NothingToUpdate(table.to_string()));
    }
    let filter = where_clause(conditions, &mut namer)?;

    let mut sql = format!("UPDATE {} SET {}", table_q, set.sql);
    if !filter.is_empty() {
        sql.push(' ');
        sql.push_str(&filter.sql);
    }
    let mut params = set.params;
    params.extend(filter.params);
    Ok(CompiledQuery { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::field_map;
    use crate::sql::positional::to_positional;

    fn keys(p: &Params) -> Vec<&str> {
        p.keys().map(String::as_str).collect()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn allow_list_filters_columns() {
        let data = field_map([("a", 1), ("b", 2), ("c", 3)]);
        let q = build_insert("t", &data, &AllowList::only(["a", "b"])).unwrap();
        assert_eq!(q.sql, "INSERT INTO `t` SET `a` = :a, `b` = :b");
        assert_eq!(keys(&q.params), ["a", "b"]);
        assert!(!q.sql.contains("`c`"));
    }

    #[test]
    fn all_fields_mode_writes_every_key() {
        let data = field_map([("a", 1), ("b", 2)]);
        assert_eq!(resolve_allowed_fields(&data, &AllowList::AllFields).unwrap(), ["a", "b"]);
        let q = build_insert("t", &data, &AllowList::AllFields).unwrap();
        assert_eq!(q.sql, "INSERT INTO `t` SET `a` = :a, `b` = :b");
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let data = field_map([("a", 1)]);
        assert_eq!(
            resolve_allowed_fields(&data, &AllowList::Only(vec![])),
            Err(ConfigError::EmptyAllowList)
        );
        assert_eq!(
            build_insert("t", &data, &AllowList::Only(vec![])),
            Err(ConfigError::EmptyAllowList)
        );
    }

    #[test]
    fn allowed_order_drives_set_order_and_missing_fields_are_skipped() {
        let data = field_map([("a", 1), ("b", 2)]);
        let set = build_set_clause(&data, &cols(&["b", "zzz", "a", "b"])).unwrap();
        assert_eq!(set.sql, "`b` = :b, `a` = :a");
        assert_eq!(keys(&set.params), ["b", "a"]);
    }

    #[test]
    fn explicit_null_is_written() {
        let data = field_map([("note", BindValue::Null)]);
        let set = build_set_clause(&data, &cols(&["note"])).unwrap();
        assert_eq!(set.sql, "`note` = :note");
        assert_eq!(set.params["note"], BindValue::Null);
    }

    #[test]
    fn no_matching_field_gives_empty_set() {
        let data = field_map([("a", 1)]);
        let set = build_set_clause(&data, &cols(&["b"])).unwrap();
        assert!(set.is_empty());
        assert!(set.params.is_empty());

        let q = build_insert("t", &data, &AllowList::only(["b"])).unwrap();
        assert_eq!(q.sql, "INSERT INTO `t` () VALUES ()");
        assert!(q.params.is_empty());

        assert_eq!(
            build_update("t", &data, &WhereClause::new().eq("id", 1), &AllowList::only(["b"])),
            Err(ConfigError::NothingToUpdate("t".into()))
        );
    }

    #[test]
    fn backtick_in_column_is_doubled() {
        let data = field_map([("foo`bar", "v")]);
        let set = build_set_clause(&data, &cols(&["foo`bar"])).unwrap();
        assert_eq!(set.sql, "`foo``bar` = :foo_bar");
        assert_eq!(keys(&set.params), ["foo_bar"]);
    }

    #[test]
    fn where_clause_keeps_input_order() {
        let w = WhereClause::from_pairs([("id", BindValue::from(5)), ("status", BindValue::from("x"))]);
        let f = build_where_clause(&w).unwrap();
        assert_eq!(f.sql, "WHERE `id` = :id AND `status` = :status");
        assert_eq!(f.params["id"], BindValue::I64(5));
        assert_eq!(f.params["status"], BindValue::String("x".into()));
        assert_eq!(keys(&f.params), ["id", "status"]);
    }

    #[test]
    fn empty_where_has_no_keyword() {
        let f = build_where_clause(&WhereClause::new()).unwrap();
        assert_eq!(f, Fragment::default());

        let data = field_map([("a", 1)]);
        let q = build_update("t", &data, &WhereClause::all_rows(), &AllowList::only(["a"])).unwrap();
        assert_eq!(q.sql, "UPDATE `t` SET `a` = :a");
        assert!(!q.sql.contains("WHERE"));
    }

    #[test]
    fn update_without_where_needs_opt_in() {
        let data = field_map([("a", 1)]);
        assert_eq!(
            build_update("t", &data, &WhereClause::new(), &AllowList::only(["a"])),
            Err(ConfigError::UnscopedUpdate("t".into()))
        );
    }

    #[test]
    fn update_scenario() {
        let data = field_map([("email", "b@x.com")]);
        let q = build_update("users", &data, &WhereClause::new().eq("id", 7), &AllowList::only(["email"])).unwrap();
        assert_eq!(q.sql, "UPDATE `users` SET `email` = :email WHERE `id` = :id");
        assert_eq!(q.params["email"], BindValue::from("b@x.com"));
        assert_eq!(q.params["id"], BindValue::I64(7));
    }

    #[test]
    fn same_column_in_set_and_where_gets_distinct_placeholders() {
        let data = field_map([("status", "archived")]);
        let w = WhereClause::new()
            .eq("status", "active")
            .cmp("status", CompareOp::Ne, "deleted");
        let q = build_update("t", &data, &w, &AllowList::only(["status"])).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE `t` SET `status` = :status WHERE `status` = :status_where AND `status` <> :status_where2"
        );
        assert_eq!(q.params["status"], BindValue::from("archived"));
        assert_eq!(q.params["status_where"], BindValue::from("active"));
        assert_eq!(q.params["status_where2"], BindValue::from("deleted"));
    }

    #[test]
    fn sanitised_names_that_clash_are_disambiguated() {
        let data = field_map([("a-b", 1), ("a_b", 2), ("9lives", 3)]);
        let q = build_insert("t", &data, &AllowList::AllFields).unwrap();
        assert_eq!(q.sql, "INSERT INTO `t` SET `a-b` = :a_b, `a_b` = :a_b_set, `9lives` = :p_9lives");
    }

    #[test]
    fn operators_render_from_closed_set() {
        let w = WhereClause::new()
            .cmp("age", CompareOp::Ge, 18)
            .cmp("name", CompareOp::Like, "A%");
        let f = build_where_clause(&w).unwrap();
        assert_eq!(f.sql, "WHERE `age` >= :age AND `name` LIKE :name");
        assert_eq!("!=".parse::<CompareOp>().unwrap(), CompareOp::Ne);
        assert_eq!(" like ".parse::<CompareOp>().unwrap(), CompareOp::Like);
        assert!("; DROP".parse::<CompareOp>().is_err());
    }

    #[test]
    fn values_never_reach_sql_text() {
        let nasty = [
            "x'; DROP TABLE users; --",
            "\" OR \"1\"=\"1",
            "a /* c */ b",
            "# comment",
            "`id` = 1",
            ":id",
        ];
        for v in nasty {
            let data = field_map([("name", v), ("bio", v)]);
            let ins = build_insert("users", &data, &AllowList::AllFields).unwrap();
            let upd = build_update(
                "users",
                &data,
                &WhereClause::new().eq("name", v),
                &AllowList::only(["name", "bio"]),
            )
            .unwrap();
            for q in [&ins, &upd] {
                assert!(!q.sql.contains(v), "{v:?} leaked into {}", q.sql);
                assert!(q.params.values().all(|p| *p == BindValue::from(v)));
            }
        }
    }

    #[test]
    fn invalid_identifiers_fail_before_building() {
        let data = field_map([("a", 1)]);
        assert_eq!(
            build_insert("users; --", &data, &AllowList::AllFields),
            Err(ConfigError::InvalidTable("users; --".into()))
        );
        assert_eq!(
            build_insert("", &data, &AllowList::AllFields),
            Err(ConfigError::InvalidTable(String::new()))
        );
        let w = WhereClause::new().eq("", 1);
        assert_eq!(build_where_clause(&w), Err(ConfigError::InvalidColumn(String::new())));
    }

    #[test]
    fn every_compiled_query_binds_cleanly() {
        let data = field_map([
            ("id", BindValue::from(1)),
            ("a-b", BindValue::from("x")),
            ("a_b", BindValue::from(true)),
            ("weird`col", BindValue::Null),
        ]);
        let w = WhereClause::new()
            .eq("id", 1)
            .eq("a_b", false)
            .cmp("id", CompareOp::Lt, 10);
        let queries = [
            build_insert("t", &data, &AllowList::AllFields).unwrap(),
            build_update("s.t", &data, &w, &AllowList::AllFields).unwrap(),
            build_update("t", &data, &WhereClause::all_rows(), &AllowList::only(["id"])).unwrap(),
        ];
        for q in &queries {
            let (sql, values) = to_positional(&q.sql, &q.params).unwrap();
            assert_eq!(values.len(), q.params.len(), "{}", q.sql);
            assert_eq!(sql.matches('?').count(), q.params.len(), "{sql}");
        }
    }
}
