use quarry_data::{DataError, Row, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row as _, ValueRef};

use crate::error::{SqlxErrorExt, SqlxResult};

/// Bind generated parameters in placeholder order.
pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: Vec<Value>,
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::Float(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Bytes(v) => query.bind(v),
        };
    }
    query
}

/// Decode every column of `row` by name.
pub(crate) fn decode_row(row: &AnyRow) -> SqlxResult<Row> {
    let mut decoded = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        decoded.insert(column.name().to_string(), decode_value(row, idx, column.name())?);
    }
    Ok(decoded)
}

fn decode_value(row: &AnyRow, idx: usize, name: &str) -> SqlxResult<Value> {
    let raw = row.try_get_raw(idx).map_err(SqlxErrorExt::into_data_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Ok(Value::Float(v));
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return Ok(Value::Bool(v));
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(Value::Text(v));
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return Ok(Value::Bytes(v));
    }
    Err(DataError::Other(format!("column '{name}' has a type with no value mapping")))
}

/// Read a `COUNT(*)` result.
pub(crate) fn decode_count(row: &AnyRow) -> SqlxResult<u64> {
    let total: i64 = row.try_get(0).map_err(SqlxErrorExt::into_data_error)?;
    Ok(u64::try_from(total).unwrap_or(0))
}
