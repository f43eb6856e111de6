//! Column decoding and parameter encoding shared by the repositories

use libsql::{Row, Value};

use crate::error::{Error, Result};

pub fn text(row: &Row, idx: i32) -> Result<String> {
    opt_text(row, idx)?.ok_or_else(|| Error::Database(format!("column {idx} is unexpectedly NULL")))
}

pub fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "column {idx}: expected text, found {other:?}"
        ))),
    }
}

pub fn opt_int(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "column {idx}: expected integer, found {other:?}"
        ))),
    }
}

pub fn int(row: &Row, idx: i32) -> Result<i64> {
    opt_int(row, idx)?.ok_or_else(|| Error::Database(format!("column {idx} is unexpectedly NULL")))
}

pub fn text_param(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.to_string()))
}

pub fn int_param(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

/// Parse a stored enum name, reporting corrupt rows as database errors.
pub fn parse_column<T: std::str::FromStr>(raw: &str, column: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid {column} value: {raw}")))
}
