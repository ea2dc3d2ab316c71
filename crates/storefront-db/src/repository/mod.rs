//! # Repository Module
//!
//! One generic repository, instantiated per entity.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Generic Repository                                   │
//! │                                                                         │
//! │  API handler                                                           │
//! │       │                                                                 │
//! │       │  ProductOptionRepository::new().list(&mut tx, Some(&filter))   │
//! │       ▼                                                                 │
//! │  Repository<T: Entity>                                                 │
//! │  ├── exists / get / list / count                                       │
//! │  ├── create / update / archive                                         │
//! │  └── archive_by_parent            (T: ChildEntity only)                │
//! │       │                                                                 │
//! │       │  Statement (SQL + $n args)                                     │
//! │       ▼                                                                 │
//! │  Executor (pool, connection or caller's transaction)                   │
//! │                                                                         │
//! │  Each entity supplies only what differs: its table, its mutable        │
//! │  columns, how to bind them and how to scan a row back.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Users, plus lookup by username
//! - [`ProductRootRepository`] - Product roots, plus cascading archive
//! - [`ProductOptionRepository`] - Options of a product root
//! - [`ProductOptionValueRepository`] - Values of a product option

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use storefront_core::{EntityId, ProductOption, ProductOptionValue, ProductRoot, QueryFilter, User, ValidationError};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::executor::{Executor, Statement};
use crate::query::{compile_count, compile_list};
use crate::value::{Record, SqlValue};

pub mod product_option;
pub mod product_option_value;
pub mod product_root;
pub mod user;

pub use product_root::ArchiveSummary;

/// Repository for users.
pub type UserRepository = Repository<User>;
/// Repository for product roots.
pub type ProductRootRepository = Repository<ProductRoot>;
/// Repository for product options.
pub type ProductOptionRepository = Repository<ProductOption>;
/// Repository for product option values.
pub type ProductOptionValueRepository = Repository<ProductOptionValue>;

// =============================================================================
// Entity Capability
// =============================================================================

/// Store-owned columns every table carries after its own fields.
const TIMESTAMP_COLUMNS: [&str; 3] = ["created_on", "updated_on", "archived_on"];

/// What the generic repository needs to know about an entity.
pub trait Entity: Sized + Send + Sync {
    /// Human-readable name used in errors and logs.
    const NAME: &'static str;

    /// Table the entity lives in.
    const TABLE: &'static str;

    /// Caller-writable columns, in the order [`Entity::bind_fields`]
    /// produces values.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> EntityId;

    /// Values for [`Entity::FIELDS`], same order.
    fn bind_fields(&self) -> DbResult<Vec<SqlValue>>;

    /// Builds the entity from a row selected with [`read_columns`].
    fn scan(record: &Record) -> DbResult<Self>;

    fn validate(&self) -> Result<(), ValidationError>;
}

/// An entity owned by a parent row.
pub trait ChildEntity: Entity {
    /// Column holding the parent's id.
    const PARENT_COLUMN: &'static str;
}

/// `id`, the entity's fields, then the store-owned timestamps.
pub fn read_columns<T: Entity>() -> Vec<&'static str> {
    std::iter::once("id")
        .chain(T::FIELDS.iter().copied())
        .chain(TIMESTAMP_COLUMNS)
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Persistence operations for one entity type.
///
/// Holds no state: the executor is passed to every call and stays owned by
/// the caller.
///
/// ## Usage
/// ```rust,ignore
/// let options = ProductOptionRepository::new();
///
/// let mut tx = pool.begin().await?;
/// let (id, created_on) = options.create(&mut tx, &option).await?;
/// let stored = options.get(&mut tx, id).await?;
/// tx.commit().await?;
/// ```
pub struct Repository<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T> Repository<T> {
    pub const fn new() -> Self {
        Repository {
            _entity: PhantomData,
        }
    }
}

impl<T> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Repository<T> {}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("table", &T::TABLE).finish()
    }
}

impl<T: Entity> Repository<T> {
    /// True if a live row with this id exists.
    ///
    /// A miss is `Ok(false)`, never an error.
    pub async fn exists<E: Executor>(&self, exec: &mut E, id: EntityId) -> DbResult<bool> {
        let stmt = Statement::new(format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND archived_on IS NULL)",
            T::TABLE
        ))
        .bind(SqlValue::id(id)?);

        debug!(table = T::TABLE, id, "Checking existence");

        match exec.fetch_optional(&stmt).await {
            Ok(Some(record)) => record.scalar_bool(),
            Ok(None) => Ok(false),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetches one live row.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if no live row has this id
    pub async fn get<E: Executor>(&self, exec: &mut E, id: EntityId) -> DbResult<T> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE id = $1 AND archived_on IS NULL",
            read_columns::<T>().join(", "),
            T::TABLE
        ))
        .bind(SqlValue::id(id)?);

        debug!(table = T::TABLE, id, "Fetching row");

        match exec.fetch_optional(&stmt).await {
            Ok(Some(record)) => T::scan(&record),
            Ok(None) => Err(DbError::not_found(T::NAME, id)),
            Err(err) if err.is_not_found() => Err(DbError::not_found(T::NAME, id)),
            Err(err) => Err(err),
        }
    }

    /// Lists rows matching `filter` (the default filter when `None`).
    ///
    /// Fails closed: if any row cannot be scanned, no rows are returned.
    pub async fn list<E: Executor>(
        &self,
        exec: &mut E,
        filter: Option<&QueryFilter>,
    ) -> DbResult<Vec<T>> {
        let default = QueryFilter::default();
        let filter = filter.unwrap_or(&default);
        let stmt = compile_list(T::TABLE, &read_columns::<T>(), filter);
        self.fetch_many(exec, &stmt).await
    }

    /// Counts rows matching `filter` (the default filter when `None`).
    pub async fn count<E: Executor>(
        &self,
        exec: &mut E,
        filter: Option<&QueryFilter>,
    ) -> DbResult<u64> {
        let default = QueryFilter::default();
        let filter = filter.unwrap_or(&default);
        let stmt = compile_count(T::TABLE, &read_columns::<T>(), filter);

        let count = match exec.fetch_optional(&stmt).await? {
            Some(record) => record.scalar_i64()?,
            None => 0,
        };

        debug!(table = T::TABLE, count, "Counted rows");
        u64::try_from(count).map_err(|_| DbError::decode("count", format!("negative count {count}")))
    }

    /// Inserts a new row.
    ///
    /// Returns the store-assigned id and creation time.
    ///
    /// ## Errors
    /// - `DbError::IdAlreadyAssigned` if the entity already has an id
    /// - `DbError::Validation` if the entity fails validation
    /// - `DbError::UniqueViolation` / `ForeignKeyViolation` from the store
    pub async fn create<E: Executor>(
        &self,
        exec: &mut E,
        entity: &T,
    ) -> DbResult<(EntityId, DateTime<Utc>)> {
        if entity.id() != 0 {
            return Err(DbError::IdAlreadyAssigned {
                entity: T::NAME.to_string(),
                id: entity.id(),
            });
        }
        entity.validate()?;

        let args = entity.bind_fields()?;
        let placeholders: Vec<String> = (1..=args.len()).map(|n| format!("${n}")).collect();
        let stmt = Statement::with_args(
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING id, created_on",
                T::TABLE,
                T::FIELDS.join(", "),
                placeholders.join(", ")
            ),
            args,
        );

        let record = exec.fetch_optional(&stmt).await?.ok_or_else(|| {
            DbError::QueryFailed(format!("insert into {} returned no row", T::TABLE))
        })?;

        let id = record.id("id")?;
        let created_on = record.timestamp("created_on")?;

        debug!(table = T::TABLE, id, "Created row");
        Ok((id, created_on))
    }

    /// Rewrites every field of an existing row and stamps `updated_on`.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if no row has the entity's id
    pub async fn update<E: Executor>(&self, exec: &mut E, entity: &T) -> DbResult<DateTime<Utc>> {
        entity.validate()?;

        let mut stmt = Statement::new(format!("UPDATE {} SET ", T::TABLE));
        let mut assignments = Vec::with_capacity(T::FIELDS.len() + 1);
        for (column, value) in T::FIELDS.iter().zip(entity.bind_fields()?) {
            let placeholder = stmt.placeholder(value);
            assignments.push(format!("{column} = {placeholder}"));
        }
        assignments.push("updated_on = now()".to_string());
        let id_placeholder = stmt.placeholder(SqlValue::id(entity.id())?);

        stmt.sql.push_str(&assignments.join(", "));
        stmt.sql
            .push_str(&format!(" WHERE id = {id_placeholder} RETURNING updated_on"));

        let id = entity.id();
        debug!(table = T::TABLE, id, "Updating row");

        match exec.fetch_optional(&stmt).await? {
            Some(record) => record.timestamp("updated_on"),
            None => Err(DbError::not_found(T::NAME, id)),
        }
    }

    /// Soft-deletes a row by stamping `archived_on`.
    ///
    /// Archiving an already archived row stamps it again.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if no row has this id
    pub async fn archive<E: Executor>(&self, exec: &mut E, id: EntityId) -> DbResult<DateTime<Utc>> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET archived_on = now() WHERE id = $1 RETURNING archived_on",
            T::TABLE
        ))
        .bind(SqlValue::id(id)?);

        debug!(table = T::TABLE, id, "Archiving row");

        match exec.fetch_optional(&stmt).await? {
            Some(record) => record.timestamp("archived_on"),
            None => Err(DbError::not_found(T::NAME, id)),
        }
    }

    /// Runs a select over [`read_columns`] and scans every row.
    pub(crate) async fn fetch_many<E: Executor>(
        &self,
        exec: &mut E,
        stmt: &Statement,
    ) -> DbResult<Vec<T>> {
        let records = exec.fetch_all(stmt).await?;
        let entities = records.iter().map(T::scan).collect::<DbResult<Vec<T>>>()?;

        debug!(table = T::TABLE, count = entities.len(), "Listed rows");
        Ok(entities)
    }

    /// `SELECT EXISTS(...)` over live rows matching `column = value` for
    /// each pair.
    pub(crate) async fn exists_where<E: Executor>(
        &self,
        exec: &mut E,
        conditions: &[(&str, SqlValue)],
    ) -> DbResult<bool> {
        let mut stmt = Statement::new(String::new());
        let mut predicates = Vec::with_capacity(conditions.len() + 1);
        for (column, value) in conditions {
            let placeholder = stmt.placeholder(value.clone());
            predicates.push(format!("{column} = {placeholder}"));
        }
        predicates.push("archived_on IS NULL".to_string());
        stmt.sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
            T::TABLE,
            predicates.join(" AND ")
        );

        match exec.fetch_optional(&stmt).await {
            Ok(Some(record)) => record.scalar_bool(),
            Ok(None) => Ok(false),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl<T: ChildEntity> Repository<T> {
    /// Archives every live child of `parent_id`.
    ///
    /// Returns how many rows were archived.
    pub async fn archive_by_parent<E: Executor>(
        &self,
        exec: &mut E,
        parent_id: EntityId,
    ) -> DbResult<u64> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET archived_on = now() WHERE {} = $1 AND archived_on IS NULL",
            T::TABLE,
            T::PARENT_COLUMN
        ))
        .bind(SqlValue::id(parent_id)?);

        let count = exec.execute(&stmt).await?;
        debug!(table = T::TABLE, parent_id, count, "Archived children");
        Ok(count)
    }

    /// Live children of `parent_id`, oldest first.
    pub async fn list_by_parent<E: Executor>(
        &self,
        exec: &mut E,
        parent_id: EntityId,
    ) -> DbResult<Vec<T>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE {} = $1 AND archived_on IS NULL ORDER BY id ASC",
            read_columns::<T>().join(", "),
            T::TABLE,
            T::PARENT_COLUMN
        ))
        .bind(SqlValue::id(parent_id)?);

        self.fetch_many(exec, &stmt).await
    }
}
