//! # Validation Module
//!
//! Validation rules applied to entities before they are written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer                                                    │
//! │  └── Deserialization, request-shape checks                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository create/update                                     │
//! │  └── THIS MODULE: field rules, before any SQL is issued                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                        │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_sku_prefix, validate_email};
//!
//! validate_sku_prefix("TSHIRT").unwrap();
//! assert!(validate_email("not-an-email").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{ProductOption, ProductOptionValue, ProductRoot, User};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_SKU_PREFIX_LEN: usize = 50;
const MAX_USERNAME_LEN: usize = 64;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required free-text field (names, option values).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a SKU prefix.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only letters, digits, hyphens and underscores
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_sku_prefix;
///
/// assert!(validate_sku_prefix("SHIRT-01").is_ok());
/// assert!(validate_sku_prefix("").is_err());
/// assert!(validate_sku_prefix("has space").is_err());
/// ```
pub fn validate_sku_prefix(sku_prefix: &str) -> ValidationResult<()> {
    let sku_prefix = sku_prefix.trim();

    if sku_prefix.is_empty() {
        return Err(ValidationError::required("sku_prefix"));
    }

    if sku_prefix.len() > MAX_SKU_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "sku_prefix".to_string(),
            max: MAX_SKU_PREFIX_LEN,
        });
    }

    if !sku_prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku_prefix".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a username.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::required("username"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LEN,
        });
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Deliberately loose: one `@` with something on both sides and a dot
/// in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    };

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected local@domain".to_string(),
        });
    }

    Ok(())
}

/// Validates that a measurement or amount is not negative.
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if value < 0.0 || value.is_nan() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates that a parent reference is set.
pub fn validate_parent(field: &str, parent_id: u64) -> ValidationResult<()> {
    if parent_id == 0 {
        return Err(ValidationError::MissingParent {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a user before it is written.
pub fn validate_user(user: &User) -> ValidationResult<()> {
    validate_username(&user.username)?;
    validate_email(&user.email)?;

    if user.password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    Ok(())
}

/// Validates a product root before it is written.
pub fn validate_product_root(root: &ProductRoot) -> ValidationResult<()> {
    validate_name("name", &root.name)?;
    validate_sku_prefix(&root.sku_prefix)?;

    if root.cost_cents < 0 {
        return Err(ValidationError::Negative {
            field: "cost_cents".to_string(),
        });
    }

    if root.quantity_per_package < 0 {
        return Err(ValidationError::Negative {
            field: "quantity_per_package".to_string(),
        });
    }

    let measurements = [
        ("product_weight", root.product_weight),
        ("product_height", root.product_height),
        ("product_width", root.product_width),
        ("product_length", root.product_length),
        ("package_weight", root.package_weight),
        ("package_height", root.package_height),
        ("package_width", root.package_width),
        ("package_length", root.package_length),
    ];
    for (field, value) in measurements {
        validate_non_negative(field, value)?;
    }

    Ok(())
}

/// Validates a product option before it is written.
pub fn validate_product_option(option: &ProductOption) -> ValidationResult<()> {
    validate_name("name", &option.name)?;
    validate_parent("product_root_id", option.product_root_id)
}

/// Validates a product option value before it is written.
pub fn validate_product_option_value(value: &ProductOptionValue) -> ValidationResult<()> {
    validate_name("value", &value.value)?;
    validate_parent("product_option_id", value.product_option_id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "T-Shirt").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_sku_prefix() {
        assert!(validate_sku_prefix("SHIRT_01").is_ok());
        assert!(validate_sku_prefix("").is_err());
        assert!(validate_sku_prefix("shirt!").is_err());
        assert!(validate_sku_prefix(&"S".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("frank").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("frank zappa").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("frank@example.com").is_ok());
        assert!(validate_email("frank").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("frank@localhost").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_validate_product_root() {
        let mut root = ProductRoot {
            name: "Shirt".to_string(),
            sku_prefix: "SHIRT".to_string(),
            cost_cents: 1250,
            ..Default::default()
        };
        assert!(validate_product_root(&root).is_ok());

        root.package_weight = -1.0;
        assert_eq!(
            validate_product_root(&root),
            Err(ValidationError::Negative {
                field: "package_weight".to_string()
            })
        );
    }

    #[test]
    fn test_validate_children_need_parent() {
        let option = ProductOption {
            name: "size".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_product_option(&option),
            Err(ValidationError::MissingParent { .. })
        ));

        let value = ProductOptionValue {
            product_option_id: 3,
            value: "XL".to_string(),
            ..Default::default()
        };
        assert!(validate_product_option_value(&value).is_ok());
    }

    #[test]
    fn test_validate_user() {
        let user = User {
            username: "frank".to_string(),
            email: "frank@example.com".to_string(),
            password: "hash".to_string(),
            ..Default::default()
        };
        assert!(validate_user(&user).is_ok());

        let user = User {
            password: String::new(),
            ..user
        };
        assert_eq!(
            validate_user(&user),
            Err(ValidationError::required("password"))
        );
    }
}
