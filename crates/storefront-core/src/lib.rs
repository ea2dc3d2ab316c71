//! # storefront-core: Entity Models for the Storefront Store
//!
//! This crate holds the types every layer of the storefront agrees on.
//! It has zero I/O dependencies: nothing here touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP / API layer                             │   │
//! │  │    parses requests into entities and QueryFilters              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │  filter   │  │ validation│                  │   │
//! │  │   │   User    │  │QueryFilter│  │   rules   │                  │   │
//! │  │   │ProductRoot│  │FieldValue │  │  checks   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-db (Persistence Layer)                  │   │
//! │  │       filter compiler, repositories, migration bootstrapper     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity models (User, ProductRoot, ProductOption, ProductOptionValue)
//! - [`filter`] - The `QueryFilter` value object for list and count reads
//! - [`error`] - Validation error types
//! - [`validation`] - Entity validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::filter::{QueryFilter, SortDirection};
//!
//! let filter = QueryFilter::new()
//!     .page(2)
//!     .limit(10)
//!     .sort_by("name", SortDirection::Descending);
//!
//! assert_eq!(filter.offset(), 10);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use filter::{FieldValue, QueryFilter, QueryFilterParams, Sort, SortDirection};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page a filter starts on when the caller does not say.
pub const DEFAULT_PAGE: u32 = 1;

/// Rows per page when the caller does not say (or asks for zero).
pub const DEFAULT_LIMIT: u32 = 25;

/// Upper bound on rows per page.
///
/// Requests above this are clamped, so no list read is ever unbounded.
pub const MAX_LIMIT: u32 = 100;
