//! Bindable values and the named-parameter maps built from them.

use indexmap::IndexMap;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::mysql::{MySql, MySqlTypeInfo};
use sqlx::{Database, Type};

/// A value that can be bound to a MySQL statement. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    /// Arrays and objects; bound as JSON text.
    Json(Value),
}

/// Column name -> value, in submission order.
pub type FieldValueMap = IndexMap<String, BindValue>;

/// Placeholder name (without the leading `:`) -> value, in placeholder order.
pub type Params = IndexMap<String, BindValue>;

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    BindValue::U64(u)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => BindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }
}

/// Build a field map from a JSON object body, keeping key order.
pub fn fields_from_json(obj: &serde_json::Map<String, Value>) -> FieldValueMap {
    obj.iter()
        .map(|(k, v)| (k.clone(), BindValue::from_json(v)))
        .collect()
}

/// Build a field map from `(name, value)` pairs.
pub fn field_map<I, K, V>(pairs: I) -> FieldValueMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<BindValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl From<Value> for BindValue {
    fn from(v: Value) -> Self {
        BindValue::from_json(&v)
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::String(s)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl From<i32> for BindValue {
    fn from(n: i32) -> Self {
        BindValue::I64(n.into())
    }
}

impl From<i64> for BindValue {
    fn from(n: i64) -> Self {
        BindValue::I64(n)
    }
}

impl From<u64> for BindValue {
    fn from(n: u64) -> Self {
        BindValue::U64(n)
    }
}

impl From<f64> for BindValue {
    fn from(n: f64) -> Self {
        BindValue::F64(n)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BindValue::Null)
    }
}

impl<'q> Encode<'q, MySql> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <MySql as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            BindValue::Null => <Option<i64> as Encode<MySql>>::encode_by_ref(&None, buf)?,
            BindValue::Bool(b) => <bool as Encode<MySql>>::encode_by_ref(b, buf)?,
            BindValue::I64(n) => <i64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            BindValue::U64(n) => <u64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            BindValue::F64(n) => <f64 as Encode<MySql>>::encode_by_ref(n, buf)?,
            BindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<MySql>>::encode_by_ref(&s_ref, buf)?
            }
            BindValue::Json(v) => {
                let text = v.to_string();
                <&str as Encode<MySql>>::encode_by_ref(&text.as_str(), buf)?
            }
        })
    }

    fn produces(&self) -> Option<MySqlTypeInfo> {
        Some(match self {
            BindValue::Null | BindValue::String(_) | BindValue::Json(_) => {
                <str as Type<MySql>>::type_info()
            }
            BindValue::Bool(_) => <bool as Type<MySql>>::type_info(),
            BindValue::I64(_) => <i64 as Type<MySql>>::type_info(),
            BindValue::U64(_) => <u64 as Type<MySql>>::type_info(),
            BindValue::F64(_) => <f64 as Type<MySql>>::type_info(),
        })
    }
}

impl Type<MySql> for BindValue {
    fn type_info() -> MySqlTypeInfo {
        <str as Type<MySql>>::type_info()
    }
}
