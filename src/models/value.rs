use chrono::NaiveDateTime;
use serde_json::Value;

/// 绑定到 `?` 占位符上的值
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// 按 MySQL 字面量的写法渲染，只用于日志和 `last_sql`
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "true".into() } else { "false".into() },
            SqlValue::Int(v) => v.to_string(),
            SqlValue::UInt(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => quote_str(s),
            SqlValue::DateTime(t) => quote_str(&t.format(crate::utils::TIME_FORMAT).to_string()),
        }
    }
}

fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty, $($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self { SqlValue::$variant(v as $target) }
        })*
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64, isize);
impl_from_int!(UInt, u64, u8, u16, u32, u64, usize);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self { SqlValue::Float(v as f64) }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self { SqlValue::Float(v) }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self { SqlValue::Bool(v) }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self { SqlValue::Text(v.to_string()) }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self { SqlValue::Text(v) }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self { SqlValue::Text(v.clone()) }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self { SqlValue::DateTime(v) }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UInt(u)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => SqlValue::Text(s),
            // 数组和对象按 JSON 文本存储
            other => SqlValue::Text(other.to_string()),
        }
    }
}

impl From<&Value> for SqlValue {
    fn from(v: &Value) -> Self {
        SqlValue::from(v.clone())
    }
}
