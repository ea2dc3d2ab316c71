//! # Query Filter Compiler
//!
//! Turns a [`QueryFilter`] into a list or count [`Statement`].
//!
//! ## Output Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Compiled Statements                                │
//! │                                                                         │
//! │  list:                                                                 │
//! │    SELECT <columns> FROM <table>                                       │
//! │    [WHERE <predicates>]                                                │
//! │    ORDER BY <sort> <ASC|DESC>[, id ASC]                                │
//! │    LIMIT <limit> OFFSET <(page - 1) * limit>                           │
//! │                                                                         │
//! │  count:                                                                │
//! │    SELECT count(id) FROM <table> [WHERE <predicates>] LIMIT <limit>    │
//! │                                                                         │
//! │  Predicates, AND-ed, always in this order:                             │
//! │    1. archived_on IS NULL        (unless include_archived)             │
//! │    2. created_on > $n            (created_after)                       │
//! │    3. created_on < $n            (created_before)                      │
//! │    4. updated_on > $n            (updated_after)                       │
//! │    5. updated_on < $n            (updated_before)                      │
//! │    6. <column> = $n              (constraints, by column name)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Limit and offset are integers owned by the filter and rendered inline;
//! every caller-supplied value travels as a positional argument. Column
//! names from the filter are only ever emitted if they appear in the
//! entity's own column list.

use storefront_core::QueryFilter;
use tracing::debug;

use crate::executor::Statement;
use crate::value::SqlValue;

const DEFAULT_ORDER: &str = "id ASC";

/// Compiles a paginated list read.
///
/// ## Example
/// ```rust
/// use storefront_core::QueryFilter;
/// use storefront_db::query::compile_list;
///
/// let stmt = compile_list("product_options", &["id", "name"], &QueryFilter::default());
/// assert_eq!(
///     stmt.sql,
///     "SELECT id, name FROM product_options WHERE archived_on IS NULL \
///      ORDER BY id ASC LIMIT 25 OFFSET 0"
/// );
/// ```
pub fn compile_list(table: &str, columns: &[&str], filter: &QueryFilter) -> Statement {
    let mut stmt = Statement::new(format!("SELECT {} FROM {}", columns.join(", "), table));
    push_where(&mut stmt, table, columns, filter);

    let order = match filter.sort() {
        Some(sort) if sort.column == "id" => format!("id {}", sort.direction.as_sql()),
        Some(sort) if columns.contains(&sort.column.as_str()) => format!(
            "{} {}, {}",
            sort.column,
            sort.direction.as_sql(),
            DEFAULT_ORDER
        ),
        Some(sort) => {
            debug!(table, column = %sort.column, "Ignoring sort on unknown column");
            DEFAULT_ORDER.to_string()
        }
        None => DEFAULT_ORDER.to_string(),
    };

    stmt.sql.push_str(&format!(
        " ORDER BY {} LIMIT {} OFFSET {}",
        order,
        filter.page_size(),
        filter.offset()
    ));
    stmt
}

/// Compiles a count over the rows a list read would page through.
///
/// Keeps the `LIMIT`; carries no ordering and no offset.
pub fn compile_count(table: &str, columns: &[&str], filter: &QueryFilter) -> Statement {
    let mut stmt = Statement::new(format!("SELECT count(id) FROM {}", table));
    push_where(&mut stmt, table, columns, filter);
    stmt.sql.push_str(&format!(" LIMIT {}", filter.page_size()));
    stmt
}

fn push_where(stmt: &mut Statement, table: &str, columns: &[&str], filter: &QueryFilter) {
    let mut predicates: Vec<String> = Vec::new();

    if !filter.includes_archived() {
        predicates.push("archived_on IS NULL".to_string());
    }

    let bounds = [
        ("created_on", ">", filter.created_after_bound()),
        ("created_on", "<", filter.created_before_bound()),
        ("updated_on", ">", filter.updated_after_bound()),
        ("updated_on", "<", filter.updated_before_bound()),
    ];
    for (column, op, bound) in bounds {
        if let Some(at) = bound {
            let placeholder = stmt.placeholder(SqlValue::from(at));
            predicates.push(format!("{column} {op} {placeholder}"));
        }
    }

    for (column, value) in filter.constraints() {
        if !columns.contains(&column.as_str()) {
            debug!(table, column = %column, "Omitting constraint on unknown column");
            continue;
        }
        let placeholder = stmt.placeholder(SqlValue::from(value));
        predicates.push(format!("{column} = {placeholder}"));
    }

    if !predicates.is_empty() {
        stmt.sql.push_str(" WHERE ");
        stmt.sql.push_str(&predicates.join(" AND "));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storefront_core::SortDirection;

    const USER_COLUMNS: &[&str] = &[
        "id",
        "first_name",
        "last_name",
        "username",
        "email",
        "is_admin",
        "created_on",
        "updated_on",
        "archived_on",
    ];

    #[test]
    fn test_default_count_matches_known_query() {
        let stmt = compile_count("users", USER_COLUMNS, &QueryFilter::default());
        assert_eq!(
            stmt.sql,
            "SELECT count(id) FROM users WHERE archived_on IS NULL LIMIT 25"
        );
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_default_list() {
        let stmt = compile_list("users", &["id", "username"], &QueryFilter::default());
        assert_eq!(
            stmt.sql,
            "SELECT id, username FROM users WHERE archived_on IS NULL ORDER BY id ASC LIMIT 25 OFFSET 0"
        );
    }

    #[test]
    fn test_predicate_order_and_placeholders() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let filter = QueryFilter::new()
            .page(3)
            .limit(10)
            .updated_before(t2)
            .created_after(t1)
            .where_eq("username", "frank")
            .where_eq("is_admin", true);

        let stmt = compile_list("users", USER_COLUMNS, &filter);
        assert!(stmt.sql.ends_with(
            "WHERE archived_on IS NULL AND created_on > $1 AND updated_on < $2 \
             AND is_admin = $3 AND username = $4 ORDER BY id ASC LIMIT 10 OFFSET 20"
        ));
        assert_eq!(
            stmt.args,
            vec![
                SqlValue::Timestamp(Some(t1)),
                SqlValue::Timestamp(Some(t2)),
                SqlValue::Bool(Some(true)),
                SqlValue::Text(Some("frank".to_string())),
            ]
        );
    }

    #[test]
    fn test_include_archived_drops_archive_predicate() {
        let filter = QueryFilter::new().include_archived(true);
        let stmt = compile_count("users", USER_COLUMNS, &filter);
        assert_eq!(stmt.sql, "SELECT count(id) FROM users LIMIT 25");
    }

    #[test]
    fn test_unknown_constraint_is_omitted() {
        let filter = QueryFilter::new()
            .where_eq("username", "frank")
            .where_eq("1=1 OR password", "x");

        let stmt = compile_list("users", USER_COLUMNS, &filter);
        assert!(!stmt.sql.contains("password"));
        assert!(stmt.sql.contains("username = $1"));
        assert_eq!(stmt.args.len(), 1);
    }

    #[test]
    fn test_sort_with_tie_breaker() {
        let filter = QueryFilter::new().sort_by("username", SortDirection::Descending);
        let stmt = compile_list("users", USER_COLUMNS, &filter);
        assert!(stmt.sql.contains("ORDER BY username DESC, id ASC LIMIT"));

        let filter = QueryFilter::new().sort_by("id", SortDirection::Descending);
        let stmt = compile_list("users", USER_COLUMNS, &filter);
        assert!(stmt.sql.contains("ORDER BY id DESC LIMIT"));
    }

    #[test]
    fn test_unknown_sort_falls_back_to_id() {
        let filter = QueryFilter::new().sort_by("salt; DROP TABLE users", SortDirection::Ascending);
        let stmt = compile_list("users", USER_COLUMNS, &filter);
        assert!(stmt.sql.contains("ORDER BY id ASC LIMIT"));
        assert!(!stmt.sql.contains("DROP"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let filter = QueryFilter::new()
            .where_eq("username", "frank")
            .where_eq("email", "frank@example.com")
            .where_eq("first_name", "Frank");

        let first = compile_list("users", USER_COLUMNS, &filter);
        let second = compile_list("users", USER_COLUMNS, &filter);
        assert_eq!(first, second);
    }
}
