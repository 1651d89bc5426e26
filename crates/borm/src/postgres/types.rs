//! [`Value`] ↔ PostgreSQL wire types.

use crate::error::{OrmError, OrmResult};
use crate::value::{Value, parse_time};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ => Value::Int(i64::from(*b)).to_sql(ty, out),
            },
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::TIMESTAMPTZ | Type::TIMESTAMP => {
                    let t = parse_time(s).ok_or_else(|| format!("cannot parse {s:?} as a time"))?;
                    Value::Time(t).to_sql(ty, out)
                }
                _ => s.as_str().to_sql(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql(ty, out),
            Value::Time(t) => match *ty {
                Type::TIMESTAMP => t.naive_utc().to_sql(ty, out),
                Type::DATE => t.date_naive().to_sql(ty, out),
                Type::INT8 => t.timestamp().to_sql(ty, out),
                _ => t.to_sql(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::OID => u32::try_from(i)?.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::BOOL => (i != 0).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
        Type::TIMESTAMPTZ | Type::TIMESTAMP => {
            let t = DateTime::from_timestamp(i, 0).ok_or("timestamp out of range")?;
            Value::Time(t).to_sql(ty, out)
        }
        _ => i.to_sql(ty, out),
    }
}

/// Decode every column of `row`.
pub(super) fn decode_row(row: &Row) -> OrmResult<Vec<Value>> {
    (0..row.len()).map(|i| decode(row, i)).collect()
}

fn decode(row: &Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let mapping = |e: tokio_postgres::Error| OrmError::mapping(column.name(), e.to_string());

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(mapping)?.map(Value::Bool),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(mapping)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(mapping)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(mapping)?.map(Value::from),
        Type::OID => row.try_get::<_, Option<u32>>(idx).map_err(mapping)?.map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(mapping)?.map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(mapping)?.map(Value::from),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => row
            .try_get::<_, Option<String>>(idx)
            .map_err(mapping)?
            .map(Value::Text),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(mapping)?.map(Value::Bytes),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(mapping)?
            .map(Value::Time),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(mapping)?
            .map(Value::from),
        _ => {
            return Err(OrmError::mapping(
                column.name(),
                format!("unsupported column type {ty}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
