//! Value conversion between sea-query and may_postgres.
//!
//! Outbound, sea-query `Value`s become `ToSql` parameters. Inbound, result
//! columns are decoded by their PostgreSQL type into `Value`s.

use crate::error::ThroughError;
use may_postgres::types::{ToSql, Type};
use may_postgres::Row;
use sea_query::{Value, ValueType};

/// Whether a sea-query value is one of the `…(None)` variants
pub fn is_null_value(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none(),
        Value::TinyInt(v) => v.is_none(),
        Value::SmallInt(v) => v.is_none(),
        Value::Int(v) => v.is_none(),
        Value::BigInt(v) => v.is_none(),
        Value::TinyUnsigned(v) => v.is_none(),
        Value::SmallUnsigned(v) => v.is_none(),
        Value::Unsigned(v) => v.is_none(),
        Value::BigUnsigned(v) => v.is_none(),
        Value::Float(v) => v.is_none(),
        Value::Double(v) => v.is_none(),
        Value::String(v) => v.is_none(),
        Value::Bytes(v) => v.is_none(),
        Value::Char(v) => v.is_none(),
        Value::Json(v) => v.is_none(),
        Value::Uuid(v) => v.is_none(),
        Value::ChronoDate(v) => v.is_none(),
        Value::ChronoTime(v) => v.is_none(),
        Value::ChronoDateTime(v) => v.is_none(),
        Value::ChronoDateTimeUtc(v) => v.is_none(),
        Value::ChronoDateTimeLocal(v) => v.is_none(),
        Value::ChronoDateTimeWithTimeZone(v) => v.is_none(),
        _ => false,
    }
}

/// Owned parameter storage, one entry per bound value
///
/// NULLs keep the Rust type of their variant, so a `BigInt(None)` still
/// binds against an `INT8` placeholder.
enum Param {
    Bool(Option<bool>),
    Int(Option<i32>),
    BigInt(Option<i64>),
    Float(Option<f32>),
    Double(Option<f64>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Json(Option<serde_json::Value>),
    Uuid(Option<uuid::Uuid>),
    Timestamp(Option<chrono::NaiveDateTime>),
    TimestampTz(Option<chrono::DateTime<chrono::Utc>>),
    Date(Option<chrono::NaiveDate>),
}

impl Param {
    fn from_value(value: &Value) -> Result<Self, ThroughError> {
        let param = match value {
            Value::Bool(b) => Param::Bool(*b),
            Value::TinyInt(i) => Param::Int(i.map(i32::from)),
            Value::SmallInt(i) => Param::Int(i.map(i32::from)),
            Value::Int(i) => Param::Int(*i),
            Value::BigInt(i) => Param::BigInt(*i),
            Value::TinyUnsigned(u) => Param::Int(u.map(i32::from)),
            Value::SmallUnsigned(u) => Param::Int(u.map(i32::from)),
            Value::Unsigned(u) => Param::BigInt(u.map(i64::from)),
            Value::BigUnsigned(None) => Param::BigInt(None),
            Value::BigUnsigned(Some(u)) => {
                let v = i64::try_from(*u).map_err(|_| {
                    ThroughError::QueryError(format!(
                        "BigUnsigned value {} exceeds i64::MAX ({}), cannot be safely cast to i64",
                        u,
                        i64::MAX
                    ))
                })?;
                Param::BigInt(Some(v))
            }
            Value::Float(f) => Param::Float(*f),
            Value::Double(d) => Param::Double(*d),
            Value::String(s) => Param::Text(s.as_ref().map(|s| s.to_string())),
            Value::Char(c) => Param::Text(c.map(|c| c.to_string())),
            Value::Bytes(b) => Param::Bytes(b.as_ref().map(|b| b.to_vec())),
            Value::Json(None) => Param::Json(None),
            Value::Uuid(None) => Param::Uuid(None),
            Value::ChronoDateTime(None) => Param::Timestamp(None),
            Value::ChronoDateTimeUtc(None) => Param::TimestampTz(None),
            Value::ChronoDate(None) => Param::Date(None),
            other => Self::from_typed(other.clone())?,
        };
        Ok(param)
    }

    /// Non-null feature-gated variants, extracted through sea-query's `ValueType`
    fn from_typed(value: Value) -> Result<Self, ThroughError> {
        if let Ok(json) = <serde_json::Value as ValueType>::try_from(value.clone()) {
            return Ok(Param::Json(Some(json)));
        }
        if let Ok(id) = <uuid::Uuid as ValueType>::try_from(value.clone()) {
            return Ok(Param::Uuid(Some(id)));
        }
        if let Ok(ts) = <chrono::NaiveDateTime as ValueType>::try_from(value.clone()) {
            return Ok(Param::Timestamp(Some(ts)));
        }
        if let Ok(ts) = <chrono::DateTime<chrono::Utc> as ValueType>::try_from(value.clone()) {
            return Ok(Param::TimestampTz(Some(ts)));
        }
        if let Ok(date) = <chrono::NaiveDate as ValueType>::try_from(value.clone()) {
            return Ok(Param::Date(Some(date)));
        }
        Err(ThroughError::QueryError(format!(
            "Unsupported value type in query: {value:?}"
        )))
    }

    fn as_sql(&self) -> &dyn ToSql {
        match self {
            Param::Bool(v) => v,
            Param::Int(v) => v,
            Param::BigInt(v) => v,
            Param::Float(v) => v,
            Param::Double(v) => v,
            Param::Text(v) => v,
            Param::Bytes(v) => v,
            Param::Json(v) => v,
            Param::Uuid(v) => v,
            Param::Timestamp(v) => v,
            Param::TimestampTz(v) => v,
            Param::Date(v) => v,
        }
    }
}

/// Convert sea-query values to may_postgres `ToSql` parameters.
///
/// Values are first collected into owned storage, then borrowed for the
/// duration of `f`, so the references stay valid inside the closure.
///
/// # Errors
///
/// Returns `ThroughError::QueryError` if a value cannot be bound.
pub fn with_converted_params<F, R>(values: &sea_query::Values, f: F) -> Result<R, ThroughError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, ThroughError>,
{
    let storage = values
        .iter()
        .map(Param::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = storage.iter().map(Param::as_sql).collect();
    f(&params)
}

/// Decode column `index` of `row` into a sea-query value by its PostgreSQL type
pub fn column_value(row: &Row, index: usize) -> Result<Value, ThroughError> {
    let column = &row.columns()[index];
    let ty = column.type_();
    let decode_error = |e: may_postgres::Error| {
        ThroughError::ParseError(format!("Failed to decode column '{}': {e}", column.name()))
    };

    let value = if *ty == Type::BOOL {
        Value::from(row.try_get::<_, Option<bool>>(index).map_err(decode_error)?)
    } else if *ty == Type::INT2 {
        Value::from(row.try_get::<_, Option<i16>>(index).map_err(decode_error)?)
    } else if *ty == Type::INT4 {
        Value::from(row.try_get::<_, Option<i32>>(index).map_err(decode_error)?)
    } else if *ty == Type::INT8 {
        Value::from(row.try_get::<_, Option<i64>>(index).map_err(decode_error)?)
    } else if *ty == Type::FLOAT4 {
        Value::from(row.try_get::<_, Option<f32>>(index).map_err(decode_error)?)
    } else if *ty == Type::FLOAT8 {
        Value::from(row.try_get::<_, Option<f64>>(index).map_err(decode_error)?)
    } else if *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
    {
        Value::from(row.try_get::<_, Option<String>>(index).map_err(decode_error)?)
    } else if *ty == Type::BYTEA {
        Value::from(row.try_get::<_, Option<Vec<u8>>>(index).map_err(decode_error)?)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        Value::from(row.try_get::<_, Option<serde_json::Value>>(index).map_err(decode_error)?)
    } else if *ty == Type::UUID {
        Value::from(row.try_get::<_, Option<uuid::Uuid>>(index).map_err(decode_error)?)
    } else if *ty == Type::TIMESTAMP {
        Value::from(row.try_get::<_, Option<chrono::NaiveDateTime>>(index).map_err(decode_error)?)
    } else if *ty == Type::TIMESTAMPTZ {
        Value::from(
            row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(index)
                .map_err(decode_error)?,
        )
    } else if *ty == Type::DATE {
        Value::from(row.try_get::<_, Option<chrono::NaiveDate>>(index).map_err(decode_error)?)
    } else {
        return Err(ThroughError::ParseError(format!(
            "Unsupported column type '{}' for column '{}'",
            ty.name(),
            column.name()
        )));
    };
    Ok(value)
}
