//! # Product Root Repository
//!
//! Column mapping for `product_roots` plus the SKU-prefix lookup and the
//! cascading archive.
//!
//! ## Cascading Archive
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               archive_with_descendants(root_id)                         │
//! │                                                                         │
//! │  1. product_option_values  of the root's live options  → archived      │
//! │  2. product_options        of the root                 → archived      │
//! │  3. product_roots          the root itself             → archived      │
//! │                                                                         │
//! │  Leaves go first so step 1 can still find the live options.            │
//! │  All three statements run on the caller's executor: pass a             │
//! │  transaction to make the cascade atomic.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use storefront_core::validation::validate_product_root;
use storefront_core::{EntityId, ProductOption, ProductRoot, ValidationError};
use tracing::{debug, info};

use super::{Entity, ProductOptionRepository, Repository};
use crate::error::DbResult;
use crate::executor::{Executor, Statement};
use crate::value::{Record, SqlValue};

impl Entity for ProductRoot {
    const NAME: &'static str = "product root";
    const TABLE: &'static str = "product_roots";
    const FIELDS: &'static [&'static str] = &[
        "name",
        "subtitle",
        "description",
        "sku_prefix",
        "manufacturer",
        "brand",
        "taxable",
        "cost_cents",
        "product_weight",
        "product_height",
        "product_width",
        "product_length",
        "package_weight",
        "package_height",
        "package_width",
        "package_length",
        "quantity_per_package",
        "available_on",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn bind_fields(&self) -> DbResult<Vec<SqlValue>> {
        Ok(vec![
            SqlValue::from(self.name.as_str()),
            SqlValue::from(self.subtitle.as_str()),
            SqlValue::from(self.description.as_str()),
            SqlValue::from(self.sku_prefix.as_str()),
            SqlValue::from(self.manufacturer.as_str()),
            SqlValue::from(self.brand.as_str()),
            SqlValue::from(self.taxable),
            SqlValue::from(self.cost_cents),
            SqlValue::from(self.product_weight),
            SqlValue::from(self.product_height),
            SqlValue::from(self.product_width),
            SqlValue::from(self.product_length),
            SqlValue::from(self.package_weight),
            SqlValue::from(self.package_height),
            SqlValue::from(self.package_width),
            SqlValue::from(self.package_length),
            SqlValue::from(self.quantity_per_package),
            SqlValue::from(self.available_on),
        ])
    }

    fn scan(record: &Record) -> DbResult<Self> {
        Ok(ProductRoot {
            id: record.id("id")?,
            name: record.string("name")?,
            subtitle: record.string("subtitle")?,
            description: record.string("description")?,
            sku_prefix: record.string("sku_prefix")?,
            manufacturer: record.string("manufacturer")?,
            brand: record.string("brand")?,
            taxable: record.bool("taxable")?,
            cost_cents: record.i64("cost_cents")?,
            product_weight: record.f64("product_weight")?,
            product_height: record.f64("product_height")?,
            product_width: record.f64("product_width")?,
            product_length: record.f64("product_length")?,
            package_weight: record.f64("package_weight")?,
            package_height: record.f64("package_height")?,
            package_width: record.f64("package_width")?,
            package_length: record.f64("package_length")?,
            quantity_per_package: record.i64("quantity_per_package")?,
            available_on: record.timestamp("available_on")?,
            created_on: record.timestamp("created_on")?,
            updated_on: record.opt_timestamp("updated_on")?,
            archived_on: record.opt_timestamp("archived_on")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_product_root(self)
    }
}

/// What a cascading archive touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Timestamp stamped on the root.
    pub archived_on: DateTime<Utc>,
    /// Options archived along with it.
    pub options: u64,
    /// Option values archived along with it.
    pub values: u64,
}

impl Repository<ProductRoot> {
    /// True if a live product root already uses this SKU prefix.
    pub async fn sku_prefix_exists<E: Executor>(&self, exec: &mut E, sku_prefix: &str) -> DbResult<bool> {
        self.exists_where(exec, &[("sku_prefix", SqlValue::from(sku_prefix))])
            .await
    }

    /// Archives a product root together with its live options and their
    /// live values.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if the root does not exist; the children of a
    ///   missing root are untouched since none can exist
    pub async fn archive_with_descendants<E: Executor>(
        &self,
        exec: &mut E,
        id: EntityId,
    ) -> DbResult<ArchiveSummary> {
        let values = Statement::new(
            "UPDATE product_option_values SET archived_on = now() \
             WHERE archived_on IS NULL AND product_option_id IN \
             (SELECT id FROM product_options WHERE product_root_id = $1 AND archived_on IS NULL)",
        )
        .bind(SqlValue::id(id)?);
        let values = exec.execute(&values).await?;
        debug!(id, count = values, "Archived option values of product root");

        let options = ProductOptionRepository::new()
            .archive_by_parent(exec, id)
            .await?;

        let archived_on = self.archive(exec, id).await?;

        info!(id, options, values, "Archived product root with descendants");
        Ok(ArchiveSummary {
            archived_on,
            options,
            values,
        })
    }

    /// Live options of this product root, oldest first.
    pub async fn options_of<E: Executor>(&self, exec: &mut E, id: EntityId) -> DbResult<Vec<ProductOption>> {
        ProductOptionRepository::new().list_by_parent(exec, id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::{read_columns, ProductRootRepository};
    use crate::testing::ScriptedExecutor;
    use chrono::TimeZone;
    use storefront_core::{QueryFilter, SortDirection};

    fn shirt() -> ProductRoot {
        ProductRoot {
            name: "Band T-Shirt".to_string(),
            subtitle: "Heavyweight cotton".to_string(),
            sku_prefix: "BAND-TEE".to_string(),
            brand: "Acme".to_string(),
            taxable: true,
            cost_cents: 1250,
            product_weight: 0.2,
            quantity_per_package: 1,
            available_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    fn stored(root: &ProductRoot, id: i64) -> Record {
        let mut record = Record::new().with("id", id);
        for (column, value) in ProductRoot::FIELDS.iter().zip(root.bind_fields().unwrap()) {
            record.push(*column, value);
        }
        record
            .with("created_on", Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
            .with("updated_on", SqlValue::Timestamp(None))
            .with("archived_on", SqlValue::Timestamp(None))
    }

    #[test]
    fn test_read_columns_wrap_fields() {
        let columns = read_columns::<ProductRoot>();
        assert_eq!(columns.first(), Some(&"id"));
        assert_eq!(columns.len(), ProductRoot::FIELDS.len() + 4);
        assert_eq!(&columns[columns.len() - 3..], &["created_on", "updated_on", "archived_on"]);
    }

    #[test]
    fn test_bind_and_scan_agree() {
        let root = shirt();
        let scanned = ProductRoot::scan(&stored(&root, 4)).unwrap();
        assert_eq!(scanned.id, 4);
        assert_eq!(scanned.sku_prefix, root.sku_prefix);
        assert_eq!(scanned.cost_cents, root.cost_cents);
        assert_eq!(scanned.available_on, root.available_on);
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let root = shirt();
        let mut exec = ScriptedExecutor::new().rows(vec![stored(&root, 1), stored(&root, 2)]);

        let filter = QueryFilter::new()
            .page(2)
            .limit(2)
            .sort_by("name", SortDirection::Ascending)
            .where_eq("brand", "Acme");

        let roots = ProductRootRepository::new()
            .list(&mut exec, Some(&filter))
            .await
            .unwrap();
        assert_eq!(roots.len(), 2);

        let stmt = &exec.statements[0];
        assert!(stmt.sql.starts_with("SELECT id, name, subtitle, description, sku_prefix"));
        assert!(stmt.sql.ends_with(
            "FROM product_roots WHERE archived_on IS NULL AND brand = $1 \
             ORDER BY name ASC, id ASC LIMIT 2 OFFSET 2"
        ));
        assert_eq!(stmt.args, vec![SqlValue::Text(Some("Acme".to_string()))]);
    }

    #[tokio::test]
    async fn test_create_rejects_negative_cost() {
        let mut exec = ScriptedExecutor::new();
        let root = ProductRoot {
            cost_cents: -1,
            ..shirt()
        };

        let err = ProductRootRepository::new()
            .create(&mut exec, &root)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::Negative { .. })));
    }

    #[tokio::test]
    async fn test_sku_prefix_exists() {
        let mut exec = ScriptedExecutor::new().row(Record::new().with("exists", true));

        assert!(ProductRootRepository::new()
            .sku_prefix_exists(&mut exec, "BAND-TEE")
            .await
            .unwrap());
        assert_eq!(
            exec.statements[0].args,
            vec![SqlValue::Text(Some("BAND-TEE".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_archive_with_descendants() {
        let archived = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut exec = ScriptedExecutor::new()
            .affected(5)
            .affected(2)
            .row(Record::new().with("archived_on", archived));

        let summary = ProductRootRepository::new()
            .archive_with_descendants(&mut exec, 7)
            .await
            .unwrap();

        assert_eq!(
            summary,
            ArchiveSummary {
                archived_on: archived,
                options: 2,
                values: 5,
            }
        );

        let sql = exec.sql();
        assert!(sql[0].starts_with("UPDATE product_option_values"));
        assert_eq!(
            sql[1],
            "UPDATE product_options SET archived_on = now() \
             WHERE product_root_id = $1 AND archived_on IS NULL"
        );
        assert_eq!(
            sql[2],
            "UPDATE product_roots SET archived_on = now() WHERE id = $1 RETURNING archived_on"
        );
        for stmt in &exec.statements {
            assert_eq!(stmt.args, vec![SqlValue::BigInt(Some(7))]);
        }
    }

    #[tokio::test]
    async fn test_archive_missing_root() {
        let mut exec = ScriptedExecutor::new().affected(0).affected(0).no_row();

        let err = ProductRootRepository::new()
            .archive_with_descendants(&mut exec, 99)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
