//! # Product Option Repository
//!
//! Column mapping for `product_options`. Options belong to a product root.

use storefront_core::validation::validate_product_option;
use storefront_core::{EntityId, ProductOption, ValidationError};

use super::{ChildEntity, Entity, Repository};
use crate::error::DbResult;
use crate::executor::Executor;
use crate::value::{Record, SqlValue};

impl Entity for ProductOption {
    const NAME: &'static str = "product option";
    const TABLE: &'static str = "product_options";
    const FIELDS: &'static [&'static str] = &["name", "product_root_id"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn bind_fields(&self) -> DbResult<Vec<SqlValue>> {
        Ok(vec![
            SqlValue::from(self.name.as_str()),
            SqlValue::id(self.product_root_id)?,
        ])
    }

    fn scan(record: &Record) -> DbResult<Self> {
        Ok(ProductOption {
            id: record.id("id")?,
            name: record.string("name")?,
            product_root_id: record.id("product_root_id")?,
            created_on: record.timestamp("created_on")?,
            updated_on: record.opt_timestamp("updated_on")?,
            archived_on: record.opt_timestamp("archived_on")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_product_option(self)
    }
}

impl ChildEntity for ProductOption {
    const PARENT_COLUMN: &'static str = "product_root_id";
}

impl Repository<ProductOption> {
    /// True if the product root already has a live option with this name.
    pub async fn name_exists_for_root<E: Executor>(
        &self,
        exec: &mut E,
        name: &str,
        product_root_id: EntityId,
    ) -> DbResult<bool> {
        self.exists_where(
            exec,
            &[
                ("name", SqlValue::from(name)),
                ("product_root_id", SqlValue::id(product_root_id)?),
            ],
        )
        .await
    }

    /// Live options of a product root. Fails closed like `list`.
    pub async fn list_for_root<E: Executor>(
        &self,
        exec: &mut E,
        product_root_id: EntityId,
    ) -> DbResult<Vec<ProductOption>> {
        self.list_by_parent(exec, product_root_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
