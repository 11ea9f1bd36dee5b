//! Dynamic row records and row-to-struct mapping.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::types::Type;
use uuid::Uuid;

/// An ordered column-name → [`Value`] record produced by a query.
///
/// Column order matches the select list, so positional access works for
/// single-column shapes like aggregates and `SELECT EXISTS(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row from name/value pairs.
    pub fn from_pairs<N: Into<String>>(pairs: Vec<(N, Value)>) -> Self {
        let mut columns = Vec::with_capacity(pairs.len());
        let mut values = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            columns.push(name.into());
            values.push(value);
        }
        Self { columns, values }
    }

    /// Convert a driver row, dispatching on the declared column type.
    pub(crate) fn from_pg(row: &tokio_postgres::Row) -> DbResult<Self> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (idx, col) in row.columns().iter().enumerate() {
            columns.push(col.name().to_string());
            values.push(decode_cell(row, idx, col.name(), col.type_())?);
        }
        Ok(Self { columns, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in select-list order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Iterate `(column, value)` pairs in select-list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Positional cell access.
    pub fn value_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Cell by column name: exact match first, then case-insensitive.
    pub fn get(&self, column: &str) -> Option<&Value> {
        if let Some(pos) = self.columns.iter().position(|c| c == column) {
            return Some(&self.values[pos]);
        }
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|pos| &self.values[pos])
    }

    /// Cell by column name; a missing column is a decode error.
    pub fn try_get(&self, column: &str) -> DbResult<&Value> {
        self.get(column)
            .ok_or_else(|| DbError::decode(column, "column not present in row"))
    }

    /// Typed cell access through [`FromValue`].
    pub fn try_get_as<T: FromValue>(&self, column: &str) -> DbResult<T> {
        let value = self.try_get(column)?;
        T::from_value(value)
            .ok_or_else(|| DbError::decode(column, format!("cannot read {value:?} as requested type")))
    }

    /// Typed cell access where an absent column or mismatched cell yields the
    /// type's default. Struct mapping uses this so partial select lists leave
    /// unmapped fields at their zero value.
    pub fn get_or_default<T: FromValue + Default>(&self, column: &str) -> T {
        self.get(column)
            .and_then(T::from_value)
            .unwrap_or_default()
    }
}

impl std::ops::Index<&str> for Row {
    type Output = Value;

    fn index(&self, column: &str) -> &Value {
        match self.get(column) {
            Some(value) => value,
            None => panic!("no column named '{column}' in row"),
        }
    }
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize, name: &str, ty: &Type) -> DbResult<Value> {
    fn read<'a, T>(row: &'a tokio_postgres::Row, idx: usize, name: &str) -> DbResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx)
            .map_err(|e| DbError::decode(name, e.to_string()))
    }

    let value = if *ty == Type::BOOL {
        read::<bool>(row, idx, name)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        read::<i16>(row, idx, name)?.map(|v| Value::Int(v as i64))
    } else if *ty == Type::INT4 {
        read::<i32>(row, idx, name)?.map(|v| Value::Int(v as i64))
    } else if *ty == Type::INT8 {
        read::<i64>(row, idx, name)?.map(Value::Int)
    } else if *ty == Type::FLOAT4 {
        read::<f32>(row, idx, name)?.map(|v| Value::Float(v as f64))
    } else if *ty == Type::FLOAT8 {
        read::<f64>(row, idx, name)?.map(Value::Float)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        read::<String>(row, idx, name)?.map(Value::Text)
    } else if *ty == Type::TIMESTAMP {
        read::<chrono::NaiveDateTime>(row, idx, name)?.map(|v| Value::Timestamp(v.and_utc()))
    } else if *ty == Type::TIMESTAMPTZ {
        read::<DateTime<Utc>>(row, idx, name)?.map(Value::Timestamp)
    } else if *ty == Type::DATE {
        read::<NaiveDate>(row, idx, name)?.map(Value::Date)
    } else if *ty == Type::UUID {
        read::<Uuid>(row, idx, name)?.map(Value::Uuid)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        read::<serde_json::Value>(row, idx, name)?.map(Value::Json)
    } else {
        return Err(DbError::decode(
            name,
            format!("unsupported column type {ty}"),
        ));
    };

    Ok(value.unwrap_or(Value::Null))
}

/// Conversion from a dynamic cell into a concrete Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Json(j) => Some(j.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Map a [`Row`] into a concrete type.
///
/// Implementations typically use [`Row::get_or_default`] per field so that
/// columns missing from the select list fall back to the field's default.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> DbResult<Self>;
}
