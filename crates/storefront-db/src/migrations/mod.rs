//! # Database Migrations
//!
//! Versioned up/down SQL scripts, embedded at compile time, plus the
//! engine that walks a database between versions.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  EMBEDDED_MIGRATIONS ──► MigrationSet::from_assets                     │
//! │       │                    • parse <version>_<description>.<dir>.sql   │
//! │       │                    • pair up/down per version                  │
//! │       │                    • blank example_data unless enabled         │
//! │       ▼                                                                 │
//! │  Take the migration lock (pg_advisory_lock), held for the whole run    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Check schema_migrations (one row: current version)                    │
//! │       │                                                                 │
//! │       ├── Table doesn't exist? Create it                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current < target: apply up scripts, ascending                         │
//! │       0001_create_users         ✓ (already applied)                    │
//! │       0002_create_product_roots ✓ (already applied)                    │
//! │       0003_create_product_options ⬜ (NEW - needs to run)              │
//! │                                                                         │
//! │  current > target: apply down scripts, descending                      │
//! │                                                                         │
//! │  Each step = script + version bump in ONE transaction.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Add `NNNN_description.up.sql` and `NNNN_description.down.sql` to
//!    `migrations/postgres/` with the next version number
//! 2. List both files in [`embedded::EMBEDDED_MIGRATIONS`]
//! 3. **NEVER** modify a migration that has shipped; add a new one

use std::collections::BTreeMap;
use std::future::Future;

use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

mod bootstrap;
pub mod embedded;

pub use bootstrap::{downgrade, migrate, Bootstrapper, Connector, PgConnector, RetryPolicy};
pub use embedded::EMBEDDED_MIGRATIONS;

/// Scripts whose name contains this are demo data, not schema.
const EXAMPLE_DATA_MARKER: &str = "example_data";

/// Advisory lock key serializing migration runs across processes.
pub const MIGRATION_LOCK_KEY: i64 = 0x5354_4f52_4546_524d;

// =============================================================================
// Migration Set
// =============================================================================

/// One schema version: how to get there and how to leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: u64,
    pub description: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// The ordered sequence of available migrations.
#[derive(Debug, Clone)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

/// Outcome of moving a database between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version before the run (`0` = nothing applied).
    pub from: u64,
    /// Version after the run.
    pub to: u64,
    /// Number of scripts applied.
    pub applied: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

#[derive(Default)]
struct PendingMigration {
    description: &'static str,
    up: Option<&'static str>,
    down: Option<&'static str>,
}

impl MigrationSet {
    /// The migrations compiled into this binary.
    pub fn embedded(load_example_data: bool) -> DbResult<Self> {
        Self::from_assets(EMBEDDED_MIGRATIONS, load_example_data)
    }

    /// Builds a set from `(file name, SQL)` pairs.
    ///
    /// Example-data scripts keep their version but run as no-ops unless
    /// `load_example_data` is set.
    ///
    /// ## Errors
    /// - `DbError::MigrationFailed` for an unparseable name, a duplicate
    ///   script, or a version missing one direction
    pub fn from_assets(
        assets: &[(&'static str, &'static str)],
        load_example_data: bool,
    ) -> DbResult<Self> {
        let mut pending: BTreeMap<u64, PendingMigration> = BTreeMap::new();

        for &(name, sql) in assets {
            let (version, description, direction) = parse_asset_name(name)?;

            let sql = if description.contains(EXAMPLE_DATA_MARKER) && !load_example_data {
                debug!(name, "Example data disabled, script replaced by no-op");
                ""
            } else {
                sql
            };

            let entry = pending.entry(version).or_default();
            entry.description = description;
            let slot = match direction {
                Direction::Up => &mut entry.up,
                Direction::Down => &mut entry.down,
            };
            if slot.replace(sql).is_some() {
                return Err(DbError::MigrationFailed(format!(
                    "duplicate migration script '{name}'"
                )));
            }
        }

        let migrations = pending
            .into_iter()
            .map(|(version, p)| match (p.up, p.down) {
                (Some(up), Some(down)) => Ok(Migration {
                    version,
                    description: p.description,
                    up,
                    down,
                }),
                _ => Err(DbError::MigrationFailed(format!(
                    "migration {version} needs both an up and a down script"
                ))),
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(MigrationSet { migrations })
    }

    /// Raw bytes of an embedded script, by file name.
    pub fn asset(name: &str) -> Option<&'static [u8]> {
        EMBEDDED_MIGRATIONS
            .iter()
            .find(|(asset, _)| *asset == name)
            .map(|(_, sql)| sql.as_bytes())
    }

    /// File names of every embedded script.
    pub fn asset_names() -> impl Iterator<Item = &'static str> {
        EMBEDDED_MIGRATIONS.iter().map(|(name, _)| *name)
    }

    /// Migrations in ascending version order.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Highest available version, `0` for an empty set.
    pub fn latest_version(&self) -> u64 {
        self.migrations.last().map_or(0, |m| m.version)
    }

    /// True for `0` (empty schema) and every available version.
    pub fn knows(&self, version: u64) -> bool {
        version == 0 || self.migrations.iter().any(|m| m.version == version)
    }

    // =========================================================================
    // Applying
    // =========================================================================

    /// Applies every migration above the recorded version.
    pub async fn up<T: MigrationTarget>(&self, target: &mut T) -> DbResult<MigrationReport> {
        self.migrate_to(target, self.latest_version()).await
    }

    /// Reverts every applied migration.
    pub async fn down<T: MigrationTarget>(&self, target: &mut T) -> DbResult<MigrationReport> {
        self.migrate_to(target, 0).await
    }

    /// Moves the database up or down to exactly `version`.
    ///
    /// Already being there is success with `applied: 0`. The target's
    /// migration lock is held from before the version is read until the
    /// run ends, so concurrent runs apply each step once.
    ///
    /// ## Errors
    /// - `DbError::MigrationFailed` if `version` (or the recorded version)
    ///   is unknown, or a script fails; steps already committed stay applied
    pub async fn migrate_to<T: MigrationTarget>(
        &self,
        target: &mut T,
        version: u64,
    ) -> DbResult<MigrationReport> {
        if !self.knows(version) {
            return Err(DbError::MigrationFailed(format!(
                "unknown target version {version}"
            )));
        }

        target.lock().await?;
        let result = self.run_locked(target, version).await;
        let released = target.unlock().await;

        let report = result?;
        released?;
        Ok(report)
    }

    async fn run_locked<T: MigrationTarget>(
        &self,
        target: &mut T,
        version: u64,
    ) -> DbResult<MigrationReport> {
        target.ensure_version_table().await?;
        let current = target.current_version().await?.unwrap_or(0);

        if !self.knows(current) {
            return Err(DbError::MigrationFailed(format!(
                "database is at version {current}, which this build does not know"
            )));
        }

        if current == version {
            info!(version, "Schema already at target version");
            return Ok(MigrationReport {
                from: current,
                to: version,
                applied: 0,
            });
        }

        let mut applied = 0;

        if current < version {
            for m in self
                .migrations
                .iter()
                .filter(|m| m.version > current && m.version <= version)
            {
                debug!(version = m.version, description = m.description, "Applying migration");
                target
                    .apply(m.up, Some(m.version))
                    .await
                    .map_err(|e| step_failed(m, "up", e))?;
                applied += 1;
            }
        } else {
            for (idx, m) in self.migrations.iter().enumerate().rev() {
                if m.version > current || m.version <= version {
                    continue;
                }
                let previous = idx.checked_sub(1).map(|i| self.migrations[i].version);
                debug!(version = m.version, description = m.description, "Reverting migration");
                target
                    .apply(m.down, previous)
                    .await
                    .map_err(|e| step_failed(m, "down", e))?;
                applied += 1;
            }
        }

        info!(from = current, to = version, applied, "Migrations applied");
        Ok(MigrationReport {
            from: current,
            to: version,
            applied,
        })
    }
}

fn step_failed(m: &Migration, direction: &str, err: DbError) -> DbError {
    match err {
        DbError::MigrationFailed(_) => err,
        other => DbError::MigrationFailed(format!(
            "{:04}_{}.{direction}: {other}",
            m.version, m.description
        )),
    }
}

fn parse_asset_name(name: &'static str) -> DbResult<(u64, &'static str, Direction)> {
    let malformed = || DbError::MigrationFailed(format!("malformed migration name '{name}'"));

    let stem = name.strip_suffix(".sql").ok_or_else(malformed)?;
    let (stem, direction) = stem.rsplit_once('.').ok_or_else(malformed)?;
    let direction = match direction {
        "up" => Direction::Up,
        "down" => Direction::Down,
        _ => return Err(malformed()),
    };

    let (version, description) = stem.split_once('_').ok_or_else(malformed)?;
    let version: u64 = version.parse().map_err(|_| malformed())?;
    if version == 0 || description.is_empty() {
        return Err(malformed());
    }

    Ok((version, description, direction))
}

// =============================================================================
// Migration Target
// =============================================================================

/// A database the engine can read and advance the schema version of.
pub trait MigrationTarget: Send {
    /// Blocks until this target holds the migration lock.
    fn lock(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Releases the migration lock.
    fn unlock(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Creates the bookkeeping table if it is missing.
    fn ensure_version_table(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// The recorded version, `None` if nothing was ever applied.
    fn current_version(&mut self) -> impl Future<Output = DbResult<Option<u64>>> + Send;

    /// Runs `script` and records `new_version` atomically. An empty script
    /// only moves the version.
    fn apply(
        &mut self,
        script: &str,
        new_version: Option<u64>,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

impl MigrationTarget for PgConnection {
    async fn lock(&mut self) -> DbResult<()> {
        debug!(key = MIGRATION_LOCK_KEY, "Waiting for migration lock");
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *self)
            .await?;
        Ok(())
    }

    async fn unlock(&mut self) -> DbResult<()> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *self)
            .await?;
        Ok(())
    }

    async fn ensure_version_table(&mut self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_migrations (version BIGINT NOT NULL)")
            .execute(&mut *self)
            .await?;
        Ok(())
    }

    async fn current_version(&mut self) -> DbResult<Option<u64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_migrations LIMIT 1")
                .fetch_optional(&mut *self)
                .await?;

        version
            .map(|v| {
                u64::try_from(v).map_err(|_| {
                    DbError::MigrationFailed(format!("invalid recorded schema version {v}"))
                })
            })
            .transpose()
    }

    async fn apply(&mut self, script: &str, new_version: Option<u64>) -> DbResult<()> {
        let mut tx = self.begin().await?;

        if !script.trim().is_empty() {
            // Plain text runs unprepared, so multi-statement scripts work.
            sqlx::Executor::execute(&mut *tx, script).await?;
        }

        sqlx::query("DELETE FROM schema_migrations")
            .execute(&mut *tx)
            .await?;

        if let Some(version) = new_version {
            let version = i64::try_from(version)
                .map_err(|_| DbError::Encode(format!("schema version {version} out of range")))?;
            sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
