//! # Product Option Value Repository
//!
//! Column mapping for `product_option_values`. Values belong to an option.

use storefront_core::validation::validate_product_option_value;
use storefront_core::{EntityId, ProductOptionValue, ValidationError};

use super::{ChildEntity, Entity, Repository};
use crate::error::DbResult;
use crate::executor::Executor;
use crate::value::{Record, SqlValue};

impl Entity for ProductOptionValue {
    const NAME: &'static str = "product option value";
    const TABLE: &'static str = "product_option_values";
    const FIELDS: &'static [&'static str] = &["product_option_id", "value"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn bind_fields(&self) -> DbResult<Vec<SqlValue>> {
        Ok(vec![
            SqlValue::id(self.product_option_id)?,
            SqlValue::from(self.value.as_str()),
        ])
    }

    fn scan(record: &Record) -> DbResult<Self> {
        Ok(ProductOptionValue {
            id: record.id("id")?,
            product_option_id: record.id("product_option_id")?,
            value: record.string("value")?,
            created_on: record.timestamp("created_on")?,
            updated_on: record.opt_timestamp("updated_on")?,
            archived_on: record.opt_timestamp("archived_on")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_product_option_value(self)
    }
}

impl ChildEntity for ProductOptionValue {
    const PARENT_COLUMN: &'static str = "product_option_id";
}

impl Repository<ProductOptionValue> {
    /// True if the option already has a live value equal to `value`.
    pub async fn value_exists_for_option<E: Executor>(
        &self,
        exec: &mut E,
        value: &str,
        product_option_id: EntityId,
    ) -> DbResult<bool> {
        self.exists_where(
            exec,
            &[
                ("value", SqlValue::from(value)),
                ("product_option_id", SqlValue::id(product_option_id)?),
            ],
        )
        .await
    }

    /// Live values of a product option. Fails closed like `list`.
    pub async fn list_for_option<E: Executor>(
        &self,
        exec: &mut E,
        product_option_id: EntityId,
    ) -> DbResult<Vec<ProductOptionValue>> {
        self.list_by_parent(exec, product_option_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::ProductOptionValueRepository;
    use crate::testing::ScriptedExecutor;
    use chrono::{TimeZone, Utc};

    fn value_row(id: i64, value: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("product_option_id", 8_i64)
            .with("value", value)
            .with("created_on", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with("updated_on", SqlValue::Timestamp(None))
            .with("archived_on", SqlValue::Timestamp(None))
    }

    #[tokio::test]
    async fn test_list_for_option() {
        let mut exec = ScriptedExecutor::new().rows(vec![value_row(1, "S"), value_row(2, "M")]);

        let values = ProductOptionValueRepository::new()
            .list_for_option(&mut exec, 8)
            .await
            .unwrap();

        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.product_option_id == 8));
        assert_eq!(exec.statements[0].args, vec![SqlValue::BigInt(Some(8))]);
    }

    #[tokio::test]
    async fn test_list_for_option_fails_closed() {
        let broken = Record::new()
            .with("id", 2_i64)
            .with("product_option_id", 8_i64)
            .with("value", SqlValue::Text(None));

        let mut exec = ScriptedExecutor::new().rows(vec![value_row(1, "S"), broken, value_row(3, "L")]);

        let result = ProductOptionValueRepository::new()
            .list_for_option(&mut exec, 8)
            .await;
        assert!(matches!(result, Err(DbError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_update_value() {
        let updated = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();
        let mut exec = ScriptedExecutor::new().row(Record::new().with("updated_on", updated));

        let value = ProductOptionValue {
            id: 2,
            product_option_id: 8,
            value: "XL".to_string(),
            ..Default::default()
        };
        let stamped = ProductOptionValueRepository::new()
            .update(&mut exec, &value)
            .await
            .unwrap();

        assert_eq!(stamped, updated);
        assert_eq!(
            exec.statements[0].sql,
            "UPDATE product_option_values SET product_option_id = $1, value = $2, \
             updated_on = now() WHERE id = $3 RETURNING updated_on"
        );
    }

    #[tokio::test]
    async fn test_value_exists_for_option() {
        let mut exec = ScriptedExecutor::new().no_row();

        let exists = ProductOptionValueRepository::new()
            .value_exists_for_option(&mut exec, "XL", 8)
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_duplicate_value_surfaces_unique_violation() {
        let mut exec = ScriptedExecutor::new().fail(DbError::UniqueViolation {
            constraint: "product_option_values_option_value_key".to_string(),
        });
        let value = ProductOptionValue {
            product_option_id: 8,
            value: "XL".to_string(),
            ..Default::default()
        };

        let err = ProductOptionValueRepository::new()
            .create(&mut exec, &value)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
