use serde_json::{Map, Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, ValueRef};

use crate::utils::TIME_FORMAT;

/// 把一行数据转成以列名为键的 JSON 对象
pub(crate) fn row_to_json(row: &MySqlRow) -> Value {
    let mut map = Map::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), cell_to_json(row, i));
    }
    Value::Object(map)
}

fn cell_to_json(row: &MySqlRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }
    if let Ok(v) = row.try_get::<i64, _>(index) { return Value::from(v); }
    if let Ok(v) = row.try_get::<u64, _>(index) { return Value::from(v); }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return Number::from_f64(v as f64).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<String, _>(index) { return Value::String(v); }
    if let Ok(v) = row.try_get::<bool, _>(index) { return Value::Bool(v); }
    if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) { return Value::String(v.format(TIME_FORMAT).to_string()); }
    if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) { return Value::String(v.format("%Y-%m-%d").to_string()); }
    if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) { return Value::String(v.format("%H:%M:%S").to_string()); }
    if let Ok(v) = row.try_get::<Value, _>(index) { return v; }
    // DECIMAL、BLOB 等按文本返回
    if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        return Value::String(String::from_utf8_lossy(&v).to_string());
    }
    Value::Null
}
