//! # Entity Models
//!
//! One struct per table of the storefront schema.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Models                                   │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │      User       │   (no parent)                                     │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   ProductRoot   │◄──│  ProductOption  │◄──│ ProductOptionValue  │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  sku_prefix     │   │  product_root_id│   │  product_option_id  │   │
//! │  │  cost_cents     │   │  name           │   │  value              │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  Arrows point from child to parent. Parents hold no back-collection:   │
//! │  children are looked up by parent id.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Store-Owned Columns
//! Every entity carries four columns the database owns:
//! - `id`: assigned on insert (BIGSERIAL), `0` until then
//! - `created_on`: assigned on insert, immutable
//! - `updated_on`: stamped on every update
//! - `archived_on`: `None` while live, stamped once when archived

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Store-assigned row identifier.
///
/// `0` means "not assigned yet"; the database never hands it out.
pub type EntityId = u64;

// =============================================================================
// User
// =============================================================================

/// A person who can sign in to the storefront.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    /// Store-assigned identifier.
    pub id: EntityId,

    pub first_name: String,
    pub last_name: String,

    /// Login name, unique among live users.
    pub username: String,

    pub email: String,

    /// Password hash (never the plaintext).
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub password: String,

    /// Per-user salt for the password hash.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub salt: Vec<u8>,

    pub is_admin: bool,

    #[ts(as = "Option<String>")]
    pub password_last_changed_on: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_on: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_on: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub archived_on: Option<DateTime<Utc>>,
}

// =============================================================================
// Product Root
// =============================================================================

/// The shared definition behind a family of product variants.
///
/// Options (size, color, ...) hang off a root; the root carries the
/// catalogue and shipping data common to every variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRoot {
    pub id: EntityId,

    /// Display name.
    pub name: String,
    pub subtitle: String,
    pub description: String,

    /// Prefix shared by the SKUs of every variant.
    pub sku_prefix: String,

    pub manufacturer: String,
    pub brand: String,
    pub taxable: bool,

    /// Unit cost in cents (smallest currency unit).
    pub cost_cents: i64,

    pub product_weight: f64,
    pub product_height: f64,
    pub product_width: f64,
    pub product_length: f64,

    pub package_weight: f64,
    pub package_height: f64,
    pub package_width: f64,
    pub package_length: f64,

    pub quantity_per_package: i64,

    /// When the product goes on sale.
    #[ts(as = "String")]
    pub available_on: DateTime<Utc>,

    #[ts(as = "String")]
    pub created_on: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_on: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub archived_on: Option<DateTime<Utc>>,
}

// =============================================================================
// Product Option
// =============================================================================

/// A configurable dimension of a product root (e.g. "size").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductOption {
    pub id: EntityId,

    pub name: String,

    /// Owning product root.
    pub product_root_id: EntityId,

    #[ts(as = "String")]
    pub created_on: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_on: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub archived_on: Option<DateTime<Utc>>,
}

// =============================================================================
// Product Option Value
// =============================================================================

/// One allowed value of a product option (e.g. "XL").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductOptionValue {
    pub id: EntityId,

    /// Owning product option.
    pub product_option_id: EntityId,

    pub value: String,

    #[ts(as = "String")]
    pub created_on: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub updated_on: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub archived_on: Option<DateTime<Utc>>,
}

// =============================================================================
// Lifecycle Helpers
// =============================================================================

macro_rules! impl_lifecycle {
    ($($entity:ty),+ $(,)?) => {
        $(
            impl $entity {
                /// True once the row has been soft-deleted.
                #[inline]
                pub fn is_archived(&self) -> bool {
                    self.archived_on.is_some()
                }

                /// True once the store has assigned an id.
                #[inline]
                pub fn is_persisted(&self) -> bool {
                    self.id != 0
                }
            }
        )+
    };
}

impl_lifecycle!(User, ProductRoot, ProductOption, ProductOptionValue);

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_helpers() {
        let mut option = ProductOption {
            name: "size".to_string(),
            product_root_id: 7,
            ..Default::default()
        };
        assert!(!option.is_persisted());
        assert!(!option.is_archived());

        option.id = 1;
        option.archived_on = Some(Utc::now());
        assert!(option.is_persisted());
        assert!(option.is_archived());
    }

    #[test]
    fn test_user_secrets_not_serialized() {
        let user = User {
            username: "frank".to_string(),
            password: "hash".to_string(),
            salt: vec![1, 2, 3],
            ..Default::default()
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"username\":\"frank\""));
        assert!(!json.contains("password\""));
        assert!(!json.contains("salt"));
    }
}
