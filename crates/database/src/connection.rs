use crate::backend::{Connector, Handle};
use crate::error::DbError;
use crate::lifecycle::{Lifecycle, Resolution, SessionState};
use crate::sqlite::SqliteConnector;
use crate::statement;
use core_types::{Outcome, Row, Value};
use std::fmt::Display;
use uuid::Uuid;

/// Scoped, blocking access to one data store.
///
/// Holds only the locator and the connector; every call opens its own private
/// handle and releases it before returning.
#[derive(Debug, Clone)]
pub struct ScopedConnection<C: Connector = SqliteConnector> {
    connector: C,
    target: String,
}

impl ScopedConnection<SqliteConnector> {
    /// Scoped access to the SQLite database at `target`.
    pub fn new(target: impl Into<String>) -> Result<Self, DbError> {
        Self::with_connector(target, SqliteConnector::default())
    }
}

impl<C: Connector> ScopedConnection<C> {
    pub fn with_connector(target: impl Into<String>, connector: C) -> Result<Self, DbError> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(DbError::connection(&target, "target must not be empty"));
        }
        Ok(Self { connector, target })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Opens a session and hands back its guard.
    ///
    /// The guard must be finished with [`Session::commit`] or
    /// [`Session::rollback`]; if it is dropped instead, it rolls back.
    pub fn open(&self) -> Result<Session<C::Handle>, DbError> {
        tracing::debug!("Opening database connection to: {}", self.target);
        let handle = self.connector.connect(&self.target).inspect_err(|e| {
            tracing::error!(error = %e, "Error connecting to database");
        })?;
        Ok(Session::new(self.target.clone(), handle))
    }

    /// Runs `body` inside a session.
    ///
    /// `Ok` commits, then closes. `Err` rolls back, closes, and returns the
    /// body's error untouched. Failures of the lifecycle itself reach the caller
    /// through `E: From<DbError>`.
    pub fn scope<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session<C::Handle>) -> Result<T, E>,
        E: From<DbError> + Display,
    {
        let mut session = self.open()?;
        let result = body(&mut session);
        finish(session, result)
    }

    /// Runs one statement inside a session and passes its outcome to `body`.
    ///
    /// Reads yield every row; writes yield the affected-row count. The session
    /// settles on `body`'s result exactly as in [`ScopedConnection::scope`].
    pub fn execute<T, E, F>(&self, statement: &str, params: &[Value], body: F) -> Result<T, E>
    where
        F: FnOnce(Outcome) -> Result<T, E>,
        E: From<DbError> + Display,
    {
        let mut session = self.open()?;
        let result = session.run(statement, params).map_err(E::from).and_then(body);
        finish(session, result)
    }

    /// Runs one statement and commits.
    pub fn run(&self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        self.execute(statement, params, Ok)
    }
}

/// Settles a session on the result of its body.
fn finish<H, T, E>(session: Session<H>, result: Result<T, E>) -> Result<T, E>
where
    H: Handle,
    E: From<DbError> + Display,
{
    match result {
        Ok(value) => {
            session.commit()?;
            Ok(value)
        }
        Err(fault) => {
            let id = session.id();
            tracing::warn!(session = %id, "Database transaction rolled back due to: {}", fault);
            // The body's error wins over anything that goes wrong while releasing.
            if let Err(release_error) = session.rollback() {
                tracing::error!(
                    session = %id,
                    error = %release_error,
                    "Release failed after a faulted scope; returning the original error"
                );
            }
            Err(fault)
        }
    }
}

/// One open unit of work.
///
/// Every statement issued through a session runs in the same transaction.
pub struct Session<H: Handle> {
    id: Uuid,
    target: String,
    handle: Option<H>,
    lifecycle: Lifecycle,
}

impl<H: Handle> Session<H> {
    fn new(target: String, handle: H) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.open();
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "Database connection established successfully");
        Self {
            id,
            target,
            handle: Some(handle),
            lifecycle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    /// Runs a statement. Statements that only read return their rows; anything
    /// that writes, including `WITH ... DELETE` and `INSERT ... RETURNING`,
    /// returns the affected-row count.
    pub fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        statement::prepare(self.id, statement, params)?;
        let outcome = self.handle_mut()?.run(statement, params)?;
        match &outcome {
            Outcome::Rows(rows) => {
                tracing::debug!(session = %self.id, "Query executed successfully, {} rows returned", rows.len())
            }
            Outcome::Affected(affected) => {
                tracing::debug!(session = %self.id, "Query executed successfully, {} rows affected", affected)
            }
        }
        Ok(outcome)
    }

    pub fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        statement::prepare(self.id, statement, params)?;
        self.handle_mut()?.query(statement, params)
    }

    /// Runs a statement and returns the number of rows it changed.
    pub fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError> {
        statement::prepare(self.id, statement, params)?;
        self.handle_mut()?.execute(statement, params)
    }

    /// Persists everything done in this session, then closes it.
    ///
    /// The handle is closed even if the commit fails; the commit error is the one
    /// returned. A close failure after a good commit is returned as `Release`.
    pub fn commit(mut self) -> Result<(), DbError> {
        self.release(Resolution::Commit)
    }

    /// Discards everything done in this session, then closes it.
    pub fn rollback(mut self) -> Result<(), DbError> {
        self.release(Resolution::Rollback)
    }

    fn handle_mut(&mut self) -> Result<&mut H, DbError> {
        self.handle
            .as_mut()
            .ok_or_else(|| DbError::Query("session has already been released".to_string()))
    }

    fn release(&mut self, resolution: Resolution) -> Result<(), DbError> {
        // Nothing was ever acquired, or release already ran.
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        // 1. Perform the decision.
        let decided = match resolution {
            Resolution::Commit => handle.commit(),
            Resolution::Rollback => handle.rollback(),
        };
        // A failed commit persisted nothing; closing below discards the transaction.
        let settled = match (&decided, resolution) {
            (Ok(()), Resolution::Commit) => Resolution::Commit,
            _ => Resolution::Rollback,
        };
        self.lifecycle.resolve(settled);
        match &decided {
            Ok(()) if settled == Resolution::Commit => {
                tracing::debug!(session = %self.id, "Database transaction committed")
            }
            Ok(()) => tracing::debug!(session = %self.id, "Database transaction rolled back"),
            Err(e) => tracing::error!(session = %self.id, error = %e, "Failed to settle the transaction"),
        }

        // 2. Close, whatever happened above.
        let closed = match self.handle.take() {
            Some(handle) => handle.close(),
            None => Ok(()),
        };
        self.lifecycle.close();
        match &closed {
            Ok(()) => tracing::debug!(session = %self.id, "Database connection closed"),
            Err(e) => tracing::error!(session = %self.id, error = %e, "Failed to close the database connection"),
        }

        decided.and(closed)
    }
}

impl<H: Handle> Drop for Session<H> {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        tracing::warn!(session = %self.id, "Session dropped while open, rolling back");
        if let Err(e) = self.release(Resolution::Rollback) {
            tracing::error!(session = %self.id, error = %e, "Failed to release an abandoned session");
        }
    }
}

impl<H: Handle> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
