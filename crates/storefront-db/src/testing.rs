//! In-memory doubles for repository and migration tests.
//!
//! `ScriptedExecutor` pops the next scripted reply on each call and records
//! the statement it was given, so tests can assert both on results and on
//! the SQL issued. `FakeTarget` and `FakeConnector` stand in for a
//! PostgreSQL server during bootstrap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{DbError, DbResult};
use crate::executor::{Executor, Statement};
use crate::migrations::{Connector, MigrationTarget};
use crate::value::Record;

pub(crate) enum Reply {
    Row(Option<Record>),
    Rows(Vec<Record>),
    Affected(u64),
    Fail(DbError),
}

#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    replies: VecDeque<Reply>,
    pub(crate) statements: Vec<Statement>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn row(mut self, record: Record) -> Self {
        self.replies.push_back(Reply::Row(Some(record)));
        self
    }

    pub(crate) fn no_row(mut self) -> Self {
        self.replies.push_back(Reply::Row(None));
        self
    }

    pub(crate) fn rows(mut self, records: Vec<Record>) -> Self {
        self.replies.push_back(Reply::Rows(records));
        self
    }

    pub(crate) fn affected(mut self, count: u64) -> Self {
        self.replies.push_back(Reply::Affected(count));
        self
    }

    pub(crate) fn fail(mut self, err: DbError) -> Self {
        self.replies.push_back(Reply::Fail(err));
        self
    }

    /// SQL of every statement issued so far.
    pub(crate) fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    fn next(&mut self, stmt: &Statement) -> Reply {
        self.statements.push(stmt.clone());
        self.replies
            .pop_front()
            .unwrap_or_else(|| panic!("no reply scripted for: {}", stmt.sql))
    }
}

impl Executor for ScriptedExecutor {
    async fn fetch_optional(&mut self, stmt: &Statement) -> DbResult<Option<Record>> {
        match self.next(stmt) {
            Reply::Row(record) => Ok(record),
            Reply::Fail(err) => Err(err),
            _ => panic!("fetch_optional got a non-row reply for: {}", stmt.sql),
        }
    }

    async fn fetch_all(&mut self, stmt: &Statement) -> DbResult<Vec<Record>> {
        match self.next(stmt) {
            Reply::Rows(records) => Ok(records),
            Reply::Fail(err) => Err(err),
            _ => panic!("fetch_all got a non-rows reply for: {}", stmt.sql),
        }
    }

    async fn execute(&mut self, stmt: &Statement) -> DbResult<u64> {
        match self.next(stmt) {
            Reply::Affected(count) => Ok(count),
            Reply::Fail(err) => Err(err),
            _ => panic!("execute got a non-count reply for: {}", stmt.sql),
        }
    }
}

// =============================================================================
// Migration Doubles
// =============================================================================

#[derive(Default)]
struct TargetState {
    version: Option<u64>,
    locked: bool,
    lock_count: u32,
    applied: Vec<(String, Option<u64>)>,
}

/// A schema version held in memory. Clones share state.
///
/// A script that is exactly `FAIL` fails without moving the version.
/// Reading or moving the version without holding the lock is an error.
#[derive(Clone, Default)]
pub(crate) struct FakeTarget {
    state: Arc<Mutex<TargetState>>,
}

impl FakeTarget {
    pub(crate) fn at(version: Option<u64>) -> Self {
        let target = Self::default();
        target.state.lock().unwrap().version = version;
        target
    }

    pub(crate) fn version(&self) -> Option<u64> {
        self.state.lock().unwrap().version
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.state.lock().unwrap().locked
    }

    /// How many times the migration lock was taken.
    pub(crate) fn lock_count(&self) -> u32 {
        self.state.lock().unwrap().lock_count
    }

    fn require_lock(&self) -> DbResult<()> {
        if self.is_locked() {
            Ok(())
        } else {
            Err(DbError::QueryFailed("migration lock not held".to_string()))
        }
    }

    /// Every `(script, new_version)` applied, in order.
    pub(crate) fn applied(&self) -> Vec<(String, Option<u64>)> {
        self.state.lock().unwrap().applied.clone()
    }
}

impl MigrationTarget for FakeTarget {
    async fn lock(&mut self) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        assert!(!state.locked, "migration lock taken twice");
        state.locked = true;
        state.lock_count += 1;
        Ok(())
    }

    async fn unlock(&mut self) -> DbResult<()> {
        self.state.lock().unwrap().locked = false;
        Ok(())
    }

    async fn ensure_version_table(&mut self) -> DbResult<()> {
        self.require_lock()
    }

    async fn current_version(&mut self) -> DbResult<Option<u64>> {
        self.require_lock()?;
        Ok(self.version())
    }

    async fn apply(&mut self, script: &str, new_version: Option<u64>) -> DbResult<()> {
        self.require_lock()?;
        if script == "FAIL" {
            return Err(DbError::QueryFailed("syntax error at or near \"FAIL\"".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.applied.push((script.to_string(), new_version));
        state.version = new_version;
        Ok(())
    }
}

/// Refuses the first `failures` connections, then hands out the target.
#[derive(Clone)]
pub(crate) struct FakeConnector {
    failures: u32,
    attempts: Arc<AtomicU32>,
    target: FakeTarget,
}

impl FakeConnector {
    pub(crate) fn failing_times(failures: u32, target: FakeTarget) -> Self {
        FakeConnector {
            failures,
            attempts: Arc::new(AtomicU32::new(0)),
            target,
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Conn = FakeTarget;

    async fn connect(&self) -> DbResult<FakeTarget> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(DbError::ConnectionFailed(format!(
                "connection refused (attempt {attempt})"
            )));
        }
        Ok(self.target.clone())
    }
}
