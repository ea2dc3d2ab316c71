//! # storefront-db: Persistence Layer for the Storefront
//!
//! This crate provides database access for the storefront.
//! It talks to PostgreSQL through sqlx, behind a small executor trait.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  API handler (list_product_options)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐    │   │
//! │  │  │ Repositories │──►│    query     │   │    migrations    │    │   │
//! │  │  │ Repository<T>│   │ QueryFilter  │   │  MigrationSet    │    │   │
//! │  │  │  UserRepo    │   │   → SQL      │   │  Bootstrapper    │    │   │
//! │  │  │  ProductRoot │   └──────────────┘   │  0001_users ...  │    │   │
//! │  │  │  Option(Val) │                      └────────┬─────────┘    │   │
//! │  │  └──────┬───────┘                               │              │   │
//! │  │         │ Statement                             │              │   │
//! │  │  ┌──────▼───────────────────────────────────────▼─────────┐    │   │
//! │  │  │   Executor: PgPool | PgConnection | Transaction        │    │   │
//! │  │  └────────────────────────────────────────────────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     PostgreSQL                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`executor`] - The `Executor` trait and its sqlx implementations
//! - [`value`] - `SqlValue` arguments and `Record` rows
//! - [`query`] - Query filter compiler
//! - [`repository`] - Generic entity repository and per-entity mappings
//! - [`migrations`] - Embedded migrations and the bootstrapper
//! - [`config`] - Bootstrap configuration
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{migrate, BootstrapConfig, ProductOptionRepository};
//!
//! // Bring the schema up to date
//! let config = BootstrapConfig::load(None)?;
//! migrate(&config).await?;
//!
//! // Use repositories inside a transaction the caller owns
//! let pool = sqlx::PgPool::connect(&config.database_url).await?;
//! let mut tx = pool.begin().await?;
//! let options = ProductOptionRepository::new().list_for_root(&mut tx, 3).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod executor;
pub mod migrations;
pub mod query;
pub mod repository;
pub mod value;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::BootstrapConfig;
pub use error::{DbError, DbResult};
pub use executor::{Executor, Statement};
pub use migrations::{
    downgrade, migrate, Bootstrapper, MigrationReport, MigrationSet, RetryPolicy,
};
pub use value::{Record, SqlValue};

// Repository re-exports for convenience
pub use repository::{
    ChildEntity, Entity, ProductOptionRepository, ProductOptionValueRepository,
    ProductRootRepository, Repository, UserRepository,
};
