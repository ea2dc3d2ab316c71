//! Migration scripts baked into the binary with `include_str!`.
//!
//! Names follow `<version>_<description>.<up|down>.sql`; every version
//! ships both directions.

macro_rules! migration_assets {
    ($($name:literal),+ $(,)?) => {
        &[$(($name, include_str!(concat!("../../../../migrations/postgres/", $name)))),+]
    };
}

/// Every embedded script, as `(file name, SQL)`.
pub const EMBEDDED_MIGRATIONS: &[(&str, &str)] = migration_assets![
    "0001_create_users.up.sql",
    "0001_create_users.down.sql",
    "0002_create_product_roots.up.sql",
    "0002_create_product_roots.down.sql",
    "0003_create_product_options.up.sql",
    "0003_create_product_options.down.sql",
    "0004_create_product_option_values.up.sql",
    "0004_create_product_option_values.down.sql",
    "0005_example_data.up.sql",
    "0005_example_data.down.sql",
];
