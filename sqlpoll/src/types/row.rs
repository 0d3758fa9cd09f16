//! Ephemeral row model between the database driver and row mappers.
//!
//! A [`RawRow`] maps column names to scalar [`SqlValue`]s. Rows are produced
//! by one query execution (or synthesized in simulation mode), consumed
//! exactly once by a mapper, and discarded.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::{ErrorKind, PollResult};
use crate::{bail, poll_error};

/// A scalar value decoded from one source column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }
}

/// One raw source row as a mapping from column name to scalar value.
#[derive(Debug, Clone, Default)]
pub struct RawRow(HashMap<String, SqlValue>);

impl RawRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Inserts or replaces one column value.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.0.insert(column.into(), value);
    }

    /// Returns the number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, column: &str) -> PollResult<&SqlValue> {
        self.0.get(column).ok_or_else(|| {
            poll_error!(
                ErrorKind::InvalidData,
                "missing column",
                format!("column '{column}' not present in row")
            )
        })
    }

    /// Returns the value of a numeric column as `f64`, upcasting integers.
    pub fn get_f64(&self, column: &str) -> PollResult<f64> {
        match self.get(column)? {
            SqlValue::Float(value) => Ok(*value),
            SqlValue::Int(value) => Ok(*value as f64),
            other => Err(wrong_type(column, "float", other)),
        }
    }

    /// Returns the value of an integer column.
    pub fn get_i64(&self, column: &str) -> PollResult<i64> {
        match self.get(column)? {
            SqlValue::Int(value) => Ok(*value),
            other => Err(wrong_type(column, "int", other)),
        }
    }

    /// Returns the value of a timestamp column.
    pub fn get_timestamp(&self, column: &str) -> PollResult<DateTime<Utc>> {
        match self.get(column)? {
            SqlValue::Timestamp(value) => Ok(*value),
            other => Err(wrong_type(column, "timestamp", other)),
        }
    }

    /// Returns the value of a text column.
    pub fn get_text(&self, column: &str) -> PollResult<&str> {
        match self.get(column)? {
            SqlValue::Text(value) => Ok(value),
            other => Err(wrong_type(column, "text", other)),
        }
    }
}

impl FromIterator<(String, SqlValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn wrong_type(column: &str, expected: &str, actual: &SqlValue) -> crate::error::PollError {
    poll_error!(
        ErrorKind::InvalidData,
        "unexpected column type",
        format!(
            "column '{column}' holds {} where {expected} was expected",
            actual.type_name()
        )
    )
}

/// Converts one Postgres row into a [`RawRow`], decoding by column type.
///
/// Timestamps without a timezone are interpreted as UTC, matching the source
/// databases this client targets. Any column of an unsupported Postgres type
/// fails the conversion rather than silently dropping data.
pub fn from_pg_row(row: &PgRow) -> PollResult<RawRow> {
    let mut raw = RawRow::new();

    for column in row.columns() {
        let name = column.name();
        let ordinal = column.ordinal();

        let value = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(ordinal)?.map(SqlValue::Bool),
            "INT2" => row
                .try_get::<Option<i16>, _>(ordinal)?
                .map(|v| SqlValue::Int(i64::from(v))),
            "INT4" => row
                .try_get::<Option<i32>, _>(ordinal)?
                .map(|v| SqlValue::Int(i64::from(v))),
            "INT8" => row.try_get::<Option<i64>, _>(ordinal)?.map(SqlValue::Int),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(ordinal)?
                .map(|v| SqlValue::Float(f64::from(v))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(ordinal)?.map(SqlValue::Float),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(ordinal)?
                .map(SqlValue::Text),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(ordinal)?
                .map(SqlValue::Timestamp),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(ordinal)?
                .map(|naive| SqlValue::Timestamp(Utc.from_utc_datetime(&naive))),
            other => {
                bail!(
                    ErrorKind::ConversionError,
                    "unsupported column type",
                    format!("column '{name}' has unsupported type {other}")
                )
            }
        };

        raw.insert(name, value.unwrap_or(SqlValue::Null));
    }

    Ok(raw)
}
