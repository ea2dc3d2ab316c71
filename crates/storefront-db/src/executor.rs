//! # Executor Abstraction
//!
//! The capability every repository operation runs through.
//!
//! ## Why a Trait
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Repository, Many Scopes                         │
//! │                                                                         │
//! │  UserRepository::get(&mut exec, id)                                    │
//! │       │                                                                 │
//! │       ├── exec = PgPool                 → autocommit, any connection   │
//! │       ├── exec = PgConnection           → autocommit, this connection  │
//! │       └── exec = Transaction<Postgres>  → inside the caller's tx       │
//! │                                                                         │
//! │  The repository never begins, commits or rolls back. Whoever owns     │
//! │  the executor owns the transaction.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Conversion
//! Rows are turned into [`Record`]s by column type:
//!
//! | PostgreSQL                        | SqlValue      |
//! |-----------------------------------|---------------|
//! | `INT8`, `INT4`, `INT2`            | `BigInt`      |
//! | `FLOAT8`, `FLOAT4`                | `Double`      |
//! | `TEXT`, `VARCHAR`, `BPCHAR`, `NAME` | `Text`      |
//! | `BOOL`                            | `Bool`        |
//! | `BYTEA`                           | `Bytes`       |
//! | `TIMESTAMPTZ`, `TIMESTAMP`        | `Timestamp`   |

use std::future::Future;

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, PgPool, Postgres, Row, Transaction, TypeInfo};

use crate::error::{DbError, DbResult};
use crate::value::{Record, SqlValue};

// =============================================================================
// Statement
// =============================================================================

/// SQL text with `$1..$n` placeholders plus the arguments, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Statement {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Statement {
            sql: sql.into(),
            args,
        }
    }

    /// Appends an argument.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends an argument and returns its placeholder (`$n`).
    pub(crate) fn placeholder(&mut self, value: SqlValue) -> String {
        self.args.push(value);
        format!("${}", self.args.len())
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Something a statement can run on.
///
/// All three methods are a single round trip; a failure anywhere fails the
/// whole call.
pub trait Executor: Send {
    /// At most one row. `None` means the statement matched nothing.
    fn fetch_optional(
        &mut self,
        stmt: &Statement,
    ) -> impl Future<Output = DbResult<Option<Record>>> + Send;

    /// Every row, drained eagerly.
    fn fetch_all(&mut self, stmt: &Statement)
        -> impl Future<Output = DbResult<Vec<Record>>> + Send;

    /// No result rows; returns the number of rows affected.
    fn execute(&mut self, stmt: &Statement) -> impl Future<Output = DbResult<u64>> + Send;
}

impl Executor for PgConnection {
    async fn fetch_optional(&mut self, stmt: &Statement) -> DbResult<Option<Record>> {
        let row = prepare(stmt).fetch_optional(&mut *self).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn fetch_all(&mut self, stmt: &Statement) -> DbResult<Vec<Record>> {
        let rows = prepare(stmt).fetch_all(&mut *self).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn execute(&mut self, stmt: &Statement) -> DbResult<u64> {
        let result = prepare(stmt).execute(&mut *self).await?;
        Ok(result.rows_affected())
    }
}

impl Executor for Transaction<'_, Postgres> {
    async fn fetch_optional(&mut self, stmt: &Statement) -> DbResult<Option<Record>> {
        <PgConnection as Executor>::fetch_optional(&mut **self, stmt).await
    }

    async fn fetch_all(&mut self, stmt: &Statement) -> DbResult<Vec<Record>> {
        <PgConnection as Executor>::fetch_all(&mut **self, stmt).await
    }

    async fn execute(&mut self, stmt: &Statement) -> DbResult<u64> {
        <PgConnection as Executor>::execute(&mut **self, stmt).await
    }
}

impl Executor for PgPool {
    async fn fetch_optional(&mut self, stmt: &Statement) -> DbResult<Option<Record>> {
        let row = prepare(stmt).fetch_optional(&*self).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn fetch_all(&mut self, stmt: &Statement) -> DbResult<Vec<Record>> {
        let rows = prepare(stmt).fetch_all(&*self).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn execute(&mut self, stmt: &Statement) -> DbResult<u64> {
        let result = prepare(stmt).execute(&*self).await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// sqlx Glue
// =============================================================================

fn prepare(stmt: &Statement) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&stmt.sql);
    for arg in &stmt.args {
        query = match arg {
            SqlValue::BigInt(v) => query.bind(*v),
            SqlValue::Double(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn record_from_row(row: &PgRow) -> DbResult<Record> {
    let mut record = Record::with_capacity(row.len());

    for column in row.columns() {
        let name = column.name();
        let idx = column.ordinal();

        let value = match column.type_info().name() {
            "INT8" => SqlValue::BigInt(row.try_get::<Option<i64>, _>(idx)?),
            "INT4" => SqlValue::BigInt(row.try_get::<Option<i32>, _>(idx)?.map(i64::from)),
            "INT2" => SqlValue::BigInt(row.try_get::<Option<i16>, _>(idx)?.map(i64::from)),
            "FLOAT8" => SqlValue::Double(row.try_get::<Option<f64>, _>(idx)?),
            "FLOAT4" => SqlValue::Double(row.try_get::<Option<f32>, _>(idx)?.map(f64::from)),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                SqlValue::Text(row.try_get::<Option<String>, _>(idx)?)
            }
            "BOOL" => SqlValue::Bool(row.try_get::<Option<bool>, _>(idx)?),
            "BYTEA" => SqlValue::Bytes(row.try_get::<Option<Vec<u8>>, _>(idx)?),
            "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get::<Option<DateTime<Utc>>, _>(idx)?),
            "TIMESTAMP" => SqlValue::Timestamp(
                row.try_get::<Option<NaiveDateTime>, _>(idx)?
                    .map(|t| t.and_utc()),
            ),
            other => {
                return Err(DbError::decode(
                    name,
                    format!("unsupported column type {other}"),
                ))
            }
        };

        record.push(name, value);
    }

    Ok(record)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_numbered_in_bind_order() {
        let mut stmt = Statement::new("SELECT 1");
        assert_eq!(stmt.placeholder(SqlValue::from(1_i64)), "$1");
        assert_eq!(stmt.placeholder(SqlValue::from("x")), "$2");
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn test_bind_appends() {
        let stmt = Statement::new("SELECT $1, $2").bind(true).bind("name");
        assert_eq!(
            stmt.args,
            vec![SqlValue::Bool(Some(true)), SqlValue::Text(Some("name".to_string()))]
        );
    }
}
