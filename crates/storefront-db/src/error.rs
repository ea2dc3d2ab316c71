//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL error (sqlx::Error, SQLSTATE)   ValidationError (core)     │
//! │       │                                           │                     │
//! │       ▼                                           ▼                     │
//! │  DbError (this module) ← categorized by SQLSTATE / wrapped as-is       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  API layer ← maps NotFound → 404, UniqueViolation → 409, ...           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## SQLSTATE Mapping
//! | Code    | Meaning                | Variant                  |
//! |---------|------------------------|--------------------------|
//! | `23505` | unique_violation       | `UniqueViolation`        |
//! | `23503` | foreign_key_violation  | `ForeignKeyViolation`    |
//! | other   |                        | `QueryFailed`            |

use storefront_core::ValidationError;
use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Database operation errors.
///
/// The single error type of this crate: driver failures, bootstrap failures
/// and rejected input all end up here.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `get` finds no live row for the id
    /// - `update` / `archive` matches no row
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (SQLSTATE 23505).
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate username
    /// - Inserting a duplicate SKU prefix
    #[error("Duplicate value violates unique constraint '{constraint}'")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation (SQLSTATE 23503).
    ///
    /// ## When This Occurs
    /// - Creating an option for a product root that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The database never became reachable during bootstrap.
    #[error("Database unreachable after {attempts} attempts: {last_error}")]
    ConnectTimeout { attempts: u32, last_error: String },

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Malformed embedded migration set
    /// - A migration script fails
    /// - Requested target version does not exist
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A row did not have the shape the entity expects.
    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// A value could not be bound as a statement argument.
    #[error("Cannot encode argument: {0}")]
    Encode(String),

    /// `create` was handed an entity that already has an id.
    #[error("{entity} already has id {id}")]
    IdAlreadyAssigned { entity: String, id: u64 },

    /// The entity failed validation before any SQL ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bootstrap configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Decode error for a column.
    pub fn decode(column: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::Decode {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// True for the "no such row" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound       → DbError::NotFound
/// sqlx::Error::Database          → by SQLSTATE (see module docs)
/// Io / Tls / Pool* / WorkerCrash → DbError::ConnectionFailed
/// ColumnDecode / ColumnNotFound  → DbError::Decode
/// Encode                         → DbError::Encode
/// Other                          → DbError::QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("record", "unknown"),

            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => DbError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                },
                Some(FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation {
                    message: db_err.message().to_string(),
                },
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },

            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::ConnectionFailed(err.to_string()),

            sqlx::Error::ColumnDecode { index, source } => DbError::decode(index, source.to_string()),

            sqlx::Error::ColumnNotFound(column) => DbError::decode(column, "column not found"),

            sqlx::Error::Encode(source) => DbError::Encode(source.to_string()),

            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pool_errors_map_to_connection_failed() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::ConnectionFailed(_)
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_column_not_found_maps_to_decode() {
        let err = DbError::from(sqlx::Error::ColumnNotFound("sku_prefix".to_string()));
        match err {
            DbError::Decode { column, .. } => assert_eq!(column, "sku_prefix"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_is_wrapped() {
        let err: DbError = ValidationError::required("username").into();
        assert_eq!(err.to_string(), "username is required");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = DbError::not_found("product option", 42);
        assert_eq!(err.to_string(), "product option not found: 42");

        let err = DbError::ConnectTimeout {
            attempts: 25,
            last_error: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database unreachable after 25 attempts: connection refused"
        );
    }
}
