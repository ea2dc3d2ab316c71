//! # Migration Bootstrapper
//!
//! Brings the schema up to date once at process start.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bootstrap Sequence                                 │
//! │                                                                         │
//! │  BootstrapConfig                                                       │
//! │       │  validate, build RetryPolicy                                   │
//! │       ▼                                                                 │
//! │  MigrationSet::embedded(load_example_data)                             │
//! │       │  malformed set? fail before touching the network               │
//! │       ▼                                                                 │
//! │  wait_for_database                                                     │
//! │       │  attempt 1 ✗ ── sleep(interval) ──► attempt 2 ✗ ──► ...        │
//! │       │  attempt n ✓                                                   │
//! │       │  max_attempts ✗ → DbError::ConnectTimeout                      │
//! │       ▼                                                                 │
//! │  up / down / migrate_to(version)                                       │
//! │       │  already there → Ok, nothing applied                           │
//! │       ▼                                                                 │
//! │  Application starts serving                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use super::{MigrationReport, MigrationSet, MigrationTarget};
use crate::config::BootstrapConfig;
use crate::error::{DbError, DbResult};

// =============================================================================
// Retry Policy
// =============================================================================

/// How long to wait for a database that is still starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts before giving up.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 25,
            interval: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            interval,
        }
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Opens a connection the migration engine can run on.
pub trait Connector: Send + Sync {
    type Conn: MigrationTarget;

    /// One attempt; the bootstrapper does the retrying.
    fn connect(&self) -> impl Future<Output = DbResult<Self::Conn>> + Send;
}

/// Connects to PostgreSQL by URL and pings the server.
#[derive(Debug, Clone)]
pub struct PgConnector {
    url: String,
}

impl PgConnector {
    pub fn new(url: impl Into<String>) -> Self {
        PgConnector { url: url.into() }
    }
}

impl Connector for PgConnector {
    type Conn = PgConnection;

    async fn connect(&self) -> DbResult<PgConnection> {
        let mut conn = PgConnection::connect(&self.url).await?;
        conn.ping().await?;
        Ok(conn)
    }
}

// =============================================================================
// Bootstrapper
// =============================================================================

/// Waits for the database, then moves its schema.
///
/// ## Example
/// ```rust,ignore
/// let bootstrapper = Bootstrapper::from_config(&config)?;
/// let report = bootstrapper.up().await?;
/// println!("applied {} migrations", report.applied);
/// ```
#[derive(Debug)]
pub struct Bootstrapper<C> {
    connector: C,
    retry: RetryPolicy,
    migrations: MigrationSet,
}

impl Bootstrapper<PgConnector> {
    /// Validates `config` and loads the embedded migrations.
    pub fn from_config(config: &BootstrapConfig) -> DbResult<Self> {
        config.validate()?;
        let migrations = MigrationSet::embedded(config.load_example_data)?;

        Ok(Bootstrapper::new(
            PgConnector::new(&config.database_url),
            config.retry_policy(),
            migrations,
        ))
    }
}

impl<C: Connector> Bootstrapper<C> {
    pub fn new(connector: C, retry: RetryPolicy, migrations: MigrationSet) -> Self {
        Bootstrapper {
            connector,
            retry,
            migrations,
        }
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    /// Connects, retrying per the policy.
    ///
    /// ## Errors
    /// - `DbError::ConnectTimeout` once every attempt has failed, carrying
    ///   the last failure
    pub async fn wait_for_database(&self) -> DbResult<C::Conn> {
        let max = self.retry.max_attempts;
        let mut last_error = String::from("no connection attempt was made");

        for attempt in 1..=max {
            match self.connector.connect().await {
                Ok(conn) => {
                    info!(attempt, "Connected to database");
                    return Ok(conn);
                }
                Err(err) => {
                    warn!(attempt, max, error = %err, "Database not ready");
                    last_error = err.to_string();
                    if attempt < max {
                        tokio::time::sleep(self.retry.interval).await;
                    }
                }
            }
        }

        Err(DbError::ConnectTimeout {
            attempts: max,
            last_error,
        })
    }

    /// Applies every pending migration.
    pub async fn up(&self) -> DbResult<MigrationReport> {
        self.migrate_to(self.migrations.latest_version()).await
    }

    /// Reverts every applied migration.
    pub async fn down(&self) -> DbResult<MigrationReport> {
        self.migrate_to(0).await
    }

    /// Moves the schema to exactly `version`.
    pub async fn migrate_to(&self, version: u64) -> DbResult<MigrationReport> {
        let mut conn = self.wait_for_database().await?;
        self.migrations.migrate_to(&mut conn, version).await
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Brings the database at `config.database_url` to the latest schema.
pub async fn migrate(config: &BootstrapConfig) -> DbResult<()> {
    info!("Migrating database schema up");
    Bootstrapper::from_config(config)?.up().await.map(|_| ())
}

/// Reverts every migration on the database at `config.database_url`.
pub async fn downgrade(config: &BootstrapConfig) -> DbResult<()> {
    info!("Migrating database schema down");
    Bootstrapper::from_config(config)?.down().await.map(|_| ())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, FakeTarget};

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 25);
        assert_eq!(policy.interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let connector = FakeConnector::failing_times(u32::MAX, FakeTarget::default());
        let bootstrapper = Bootstrapper::new(
            connector.clone(),
            instant(25),
            MigrationSet::embedded(false).unwrap(),
        );

        let err = bootstrapper.up().await.unwrap_err();
        match err {
            DbError::ConnectTimeout {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 25);
                assert!(last_error.contains("attempt 25"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(connector.attempts(), 25);
    }

    #[tokio::test]
    async fn test_succeeds_after_retries() {
        let target = FakeTarget::default();
        let connector = FakeConnector::failing_times(2, target.clone());
        let bootstrapper = Bootstrapper::new(
            connector.clone(),
            instant(25),
            MigrationSet::embedded(false).unwrap(),
        );

        let report = bootstrapper.up().await.unwrap();
        assert_eq!(connector.attempts(), 3);
        assert_eq!(report.applied, 5);
        assert_eq!(target.version(), Some(5));
    }

    #[tokio::test]
    async fn test_up_when_current_is_ok() {
        let target = FakeTarget::at(Some(5));
        let bootstrapper = Bootstrapper::new(
            FakeConnector::failing_times(0, target.clone()),
            instant(1),
            MigrationSet::embedded(false).unwrap(),
        );

        let report = bootstrapper.up().await.unwrap();
        assert_eq!(report.applied, 0);
        assert!(target.applied().is_empty());
    }

    #[tokio::test]
    async fn test_down_then_back_up() {
        let target = FakeTarget::at(Some(5));
        let bootstrapper = Bootstrapper::new(
            FakeConnector::failing_times(0, target.clone()),
            instant(1),
            MigrationSet::embedded(false).unwrap(),
        );

        assert_eq!(bootstrapper.down().await.unwrap().applied, 5);
        assert_eq!(target.version(), None);

        assert_eq!(bootstrapper.migrate_to(3).await.unwrap().applied, 3);
        assert_eq!(target.version(), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let config = BootstrapConfig::new("mysql://localhost/store");
        let err = migrate(&config).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }
}
