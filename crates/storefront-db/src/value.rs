//! # Driver-Independent Values
//!
//! `SqlValue` is what repositories bind, `Record` is what they scan.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Values Across the Seam                            │
//! │                                                                         │
//! │  Entity::bind_fields()          Executor            Entity::scan()     │
//! │  ─────────────────────          ────────            ──────────────     │
//! │  Vec<SqlValue>  ───────────►  $1..$n binds                             │
//! │                               PgRow columns  ───────►  Record          │
//! │                                                                         │
//! │  Every SqlValue carries its type even when NULL, so PostgreSQL can     │
//! │  type a NULL argument without a cast in the SQL text.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use storefront_core::{EntityId, FieldValue};

use crate::error::{DbError, DbResult};

// =============================================================================
// SqlValue
// =============================================================================

/// A typed, nullable scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Bytes(Option<Vec<u8>>),
    Timestamp(Option<DateTime<Utc>>),
}

impl SqlValue {
    /// Converts a store id into a BIGINT argument.
    pub fn id(id: EntityId) -> DbResult<Self> {
        i64::try_from(id)
            .map(|id| SqlValue::BigInt(Some(id)))
            .map_err(|_| DbError::Encode(format!("id {id} does not fit in BIGINT")))
    }

    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::BigInt(v) => v.is_none(),
            SqlValue::Double(v) => v.is_none(),
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::Bytes(v) => v.is_none(),
            SqlValue::Timestamp(v) => v.is_none(),
        }
    }

    /// PostgreSQL name of the carried type, `NULL` for a null value.
    fn describe(&self) -> &'static str {
        if self.is_null() {
            return "NULL";
        }
        match self {
            SqlValue::BigInt(_) => "BIGINT",
            SqlValue::Double(_) => "DOUBLE PRECISION",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Bool(_) => "BOOLEAN",
            SqlValue::Bytes(_) => "BYTEA",
            SqlValue::Timestamp(_) => "TIMESTAMPTZ",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(Some(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(Some(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(Some(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Some(v))
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<&FieldValue> for SqlValue {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Bool(b) => SqlValue::Bool(Some(*b)),
            FieldValue::Int(n) => SqlValue::BigInt(Some(*n)),
            FieldValue::Float(f) => SqlValue::Double(Some(*f)),
            FieldValue::Timestamp(t) => SqlValue::Timestamp(Some(*t)),
            FieldValue::Text(s) => SqlValue::Text(Some(s.clone())),
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// One result row: column names mapped to values, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Record::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The value of `column`, or a Decode error if the row lacks it.
    pub fn value(&self, column: &str) -> DbResult<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| DbError::decode(column, "column not found"))
    }

    // =========================================================================
    // Typed Accessors
    // =========================================================================

    pub fn i64(&self, column: &str) -> DbResult<i64> {
        match self.value(column)? {
            SqlValue::BigInt(Some(n)) => Ok(*n),
            other => Err(mismatch(column, "BIGINT", other)),
        }
    }

    /// A store id: BIGINT, never negative.
    pub fn id(&self, column: &str) -> DbResult<EntityId> {
        let raw = self.i64(column)?;
        EntityId::try_from(raw).map_err(|_| DbError::decode(column, format!("negative id {raw}")))
    }

    pub fn f64(&self, column: &str) -> DbResult<f64> {
        match self.value(column)? {
            SqlValue::Double(Some(f)) => Ok(*f),
            other => Err(mismatch(column, "DOUBLE PRECISION", other)),
        }
    }

    pub fn bool(&self, column: &str) -> DbResult<bool> {
        match self.value(column)? {
            SqlValue::Bool(Some(b)) => Ok(*b),
            other => Err(mismatch(column, "BOOLEAN", other)),
        }
    }

    pub fn string(&self, column: &str) -> DbResult<String> {
        match self.value(column)? {
            SqlValue::Text(Some(s)) => Ok(s.clone()),
            other => Err(mismatch(column, "TEXT", other)),
        }
    }

    pub fn bytes(&self, column: &str) -> DbResult<Vec<u8>> {
        match self.value(column)? {
            SqlValue::Bytes(Some(b)) => Ok(b.clone()),
            other => Err(mismatch(column, "BYTEA", other)),
        }
    }

    pub fn timestamp(&self, column: &str) -> DbResult<DateTime<Utc>> {
        match self.value(column)? {
            SqlValue::Timestamp(Some(t)) => Ok(*t),
            other => Err(mismatch(column, "TIMESTAMPTZ", other)),
        }
    }

    /// A nullable timestamp (`updated_on`, `archived_on`, ...).
    pub fn opt_timestamp(&self, column: &str) -> DbResult<Option<DateTime<Utc>>> {
        match self.value(column)? {
            SqlValue::Timestamp(t) => Ok(*t),
            other => Err(mismatch(column, "TIMESTAMPTZ", other)),
        }
    }

    // =========================================================================
    // Scalar Reads
    // =========================================================================

    fn first(&self) -> DbResult<(&str, &SqlValue)> {
        self.columns
            .first()
            .map(|(name, value)| (name.as_str(), value))
            .ok_or_else(|| DbError::decode("?column?", "empty row"))
    }

    /// First column as a boolean (`SELECT EXISTS(...)`).
    pub fn scalar_bool(&self) -> DbResult<bool> {
        let (column, _) = self.first()?;
        self.bool(column)
    }

    /// First column as an integer (`SELECT count(...)`).
    pub fn scalar_i64(&self) -> DbResult<i64> {
        let (column, _) = self.first()?;
        self.i64(column)
    }
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> DbError {
    DbError::decode(
        column,
        format!("expected {expected}, found {}", found.describe()),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
