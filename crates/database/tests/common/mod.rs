#![allow(dead_code)]

use async_trait::async_trait;
use core_types::{Outcome, Row, StatementKind, Value};
use database::{
    AsyncConnector, AsyncHandle, Connector, DbError, Handle, ScopedConnection, SampleUser,
    seed_with,
};
use std::fmt;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Lifecycle steps observed by the recording backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Connect,
    Query,
    Execute,
    Commit,
    Rollback,
    Close,
    Abandon,
}

/// Which steps of the recording backend should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub connect: bool,
    pub query: bool,
    pub commit: bool,
    pub rollback: bool,
    pub close: bool,
}

/// A backend that records every call instead of touching a store.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    events: Arc<Mutex<Vec<Event>>>,
    faults: Faults,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn open_handle(&self) -> Result<RecordingHandle, DbError> {
        if self.faults.connect {
            return Err(DbError::connection("recording", "refused"));
        }
        self.record(Event::Connect);
        Ok(RecordingHandle {
            events: Arc::clone(&self.events),
            faults: self.faults,
        })
    }
}

#[derive(Debug)]
pub struct RecordingHandle {
    events: Arc<Mutex<Vec<Event>>>,
    faults: Faults,
}

impl RecordingHandle {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn do_query(&self) -> Result<Vec<Row>, DbError> {
        self.record(Event::Query);
        if self.faults.query {
            return Err(DbError::Query("no such table: users".into()));
        }
        Ok(vec![Row::new(vec![Value::Integer(1)])])
    }

    /// Routes on the statement's verb, standing in for a store that knows better.
    fn do_run(&self, statement: &str) -> Result<Outcome, DbError> {
        match StatementKind::classify(statement) {
            StatementKind::Read => self.do_query().map(Outcome::Rows),
            StatementKind::Write => self.do_execute().map(Outcome::Affected),
        }
    }

    fn do_execute(&self) -> Result<u64, DbError> {
        self.record(Event::Execute);
        if self.faults.query {
            return Err(DbError::Query("no such table: users".into()));
        }
        Ok(1)
    }

    fn do_commit(&self) -> Result<(), DbError> {
        self.record(Event::Commit);
        if self.faults.commit {
            return Err(DbError::Commit("FOREIGN KEY constraint failed".into()));
        }
        Ok(())
    }

    fn do_rollback(&self) -> Result<(), DbError> {
        self.record(Event::Rollback);
        if self.faults.rollback {
            return Err(DbError::Rollback("disk I/O error".into()));
        }
        Ok(())
    }

    fn do_close(&self) -> Result<(), DbError> {
        self.record(Event::Close);
        if self.faults.close {
            return Err(DbError::Release("unable to close due to unfinalized statements".into()));
        }
        Ok(())
    }
}

impl Connector for RecordingConnector {
    type Handle = RecordingHandle;

    fn connect(&self, _target: &str) -> Result<RecordingHandle, DbError> {
        self.open_handle()
    }
}

impl Handle for RecordingHandle {
    fn run(&mut self, statement: &str, _params: &[Value]) -> Result<Outcome, DbError> {
        self.do_run(statement)
    }

    fn query(&mut self, _statement: &str, _params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.do_query()
    }

    fn execute(&mut self, _statement: &str, _params: &[Value]) -> Result<u64, DbError> {
        self.do_execute()
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.do_commit()
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.do_rollback()
    }

    fn close(self) -> Result<(), DbError> {
        self.do_close()
    }
}

#[async_trait]
impl AsyncConnector for RecordingConnector {
    type Handle = RecordingHandle;

    async fn connect(&self, _target: &str) -> Result<RecordingHandle, DbError> {
        self.open_handle()
    }
}

#[async_trait]
impl AsyncHandle for RecordingHandle {
    async fn run(&mut self, statement: &str, _params: &[Value]) -> Result<Outcome, DbError> {
        self.do_run(statement)
    }

    async fn query(&mut self, _statement: &str, _params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.do_query()
    }

    async fn execute(&mut self, _statement: &str, _params: &[Value]) -> Result<u64, DbError> {
        self.do_execute()
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.do_commit()
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.do_rollback()
    }

    async fn close(self) -> Result<(), DbError> {
        self.do_close()
    }

    fn abandon(self) {
        self.record(Event::Abandon);
    }
}

/// An error type owned by the caller of a scope, distinct from `DbError`.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Db(DbError),
    Validation(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "database error: {}", e),
            AppError::Validation(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        AppError::Db(e)
    }
}

/// A fresh SQLite file inside a temporary directory that lives as long as the guard.
pub struct TempStore {
    _dir: TempDir,
    pub path: String,
}

impl TempStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3").to_string_lossy().into_owned();
        Self { _dir: dir, path }
    }

    /// A store holding the given users.
    pub fn with_users(users: &[SampleUser]) -> Self {
        let store = Self::new();
        seed_with(&store.connection(), users).unwrap();
        store
    }

    pub fn connection(&self) -> ScopedConnection {
        ScopedConnection::new(self.path.clone()).unwrap()
    }

    pub fn count_users(&self) -> i64 {
        let rows = self
            .connection()
            .run("SELECT COUNT(*) FROM users", &[])
            .unwrap()
            .into_rows()
            .unwrap();
        rows[0].as_i64(0).unwrap()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
