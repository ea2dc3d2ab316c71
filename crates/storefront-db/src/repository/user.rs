//! # User Repository
//!
//! Column mapping for `users` plus the username lookups sign-in needs.

use storefront_core::validation::validate_user;
use storefront_core::{EntityId, User, ValidationError};
use tracing::debug;

use super::{read_columns, Entity, Repository};
use crate::error::{DbError, DbResult};
use crate::executor::{Executor, Statement};
use crate::value::{Record, SqlValue};

impl Entity for User {
    const NAME: &'static str = "user";
    const TABLE: &'static str = "users";
    const FIELDS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "username",
        "email",
        "password",
        "salt",
        "is_admin",
        "password_last_changed_on",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn bind_fields(&self) -> DbResult<Vec<SqlValue>> {
        Ok(vec![
            SqlValue::from(self.first_name.as_str()),
            SqlValue::from(self.last_name.as_str()),
            SqlValue::from(self.username.as_str()),
            SqlValue::from(self.email.as_str()),
            SqlValue::from(self.password.as_str()),
            SqlValue::from(self.salt.clone()),
            SqlValue::from(self.is_admin),
            SqlValue::from(self.password_last_changed_on),
        ])
    }

    fn scan(record: &Record) -> DbResult<Self> {
        Ok(User {
            id: record.id("id")?,
            first_name: record.string("first_name")?,
            last_name: record.string("last_name")?,
            username: record.string("username")?,
            email: record.string("email")?,
            password: record.string("password")?,
            salt: record.bytes("salt")?,
            is_admin: record.bool("is_admin")?,
            password_last_changed_on: record.opt_timestamp("password_last_changed_on")?,
            created_on: record.timestamp("created_on")?,
            updated_on: record.opt_timestamp("updated_on")?,
            archived_on: record.opt_timestamp("archived_on")?,
        })
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_user(self)
    }
}

impl Repository<User> {
    /// Fetches the live user with this username.
    ///
    /// ## Errors
    /// - `DbError::NotFound` if no live user has this username
    pub async fn get_by_username<E: Executor>(&self, exec: &mut E, username: &str) -> DbResult<User> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM users WHERE username = $1 AND archived_on IS NULL",
            read_columns::<User>().join(", ")
        ))
        .bind(username);

        debug!(username = %username, "Fetching user by username");

        match exec.fetch_optional(&stmt).await? {
            Some(record) => User::scan(&record),
            None => Err(DbError::not_found(User::NAME, username)),
        }
    }

    /// True if a live user already has this username.
    pub async fn username_exists<E: Executor>(&self, exec: &mut E, username: &str) -> DbResult<bool> {
        self.exists_where(exec, &[("username", SqlValue::from(username))])
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
