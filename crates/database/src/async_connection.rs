use crate::backend::{AsyncConnector, AsyncHandle};
use crate::error::DbError;
use crate::lifecycle::{Lifecycle, Resolution, SessionState};
use crate::sqlite_async::SqliteAsyncConnector;
use crate::statement;
use core_types::{Outcome, Row, Value};
use futures::future::BoxFuture;
use std::fmt::Display;
use uuid::Uuid;

/// Scoped access to one data store where acquisition, execution and release
/// are all suspension points.
///
/// Sessions opened from the same `AsyncScopedConnection` are independent: they
/// may run concurrently and nothing here orders them.
#[derive(Debug, Clone)]
pub struct AsyncScopedConnection<C: AsyncConnector = SqliteAsyncConnector> {
    connector: C,
    target: String,
}

impl AsyncScopedConnection<SqliteAsyncConnector> {
    pub fn new(target: impl Into<String>) -> Result<Self, DbError> {
        Self::with_connector(target, SqliteAsyncConnector::default())
    }
}

impl<C: AsyncConnector> AsyncScopedConnection<C> {
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

    /// Opens a session and hands back its guard. See [`AsyncSession`] for what
    /// happens if the guard is dropped while open.
    pub async fn open(&self) -> Result<AsyncSession<C::Handle>, DbError> {
        tracing::debug!("Opening async database connection to: {}", self.target);
        let handle = self.connector.connect(&self.target).await.inspect_err(|e| {
            tracing::error!(error = %e, "Error connecting to database");
        })?;
        Ok(AsyncSession::new(self.target.clone(), handle))
    }

    /// Runs `body` inside a session: `Ok` commits, `Err` rolls back and is
    /// returned untouched.
    ///
    /// ```ignore
    /// let inserted = connection
    ///     .scope(|session| Box::pin(async move {
    ///         session.execute("INSERT INTO users (name, email) VALUES (?, ?)", &params).await
    ///     }))
    ///     .await?;
    /// ```
    ///
    /// If the returned future is dropped before it completes, the session is
    /// released on the rollback path as part of that drop.
    pub async fn scope<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut AsyncSession<C::Handle>) -> BoxFuture<'s, Result<T, E>>,
        E: From<DbError> + Display,
    {
        let mut session = self.open().await?;
        let result = body(&mut session).await;
        finish(session, result).await
    }

    /// Runs one statement inside a session and passes its outcome to `body`.
    pub async fn execute<T, E, F>(&self, statement: &str, params: &[Value], body: F) -> Result<T, E>
    where
        F: FnOnce(Outcome) -> Result<T, E>,
        E: From<DbError> + Display,
    {
        let mut session = self.open().await?;
        let result = session
            .run(statement, params)
            .await
            .map_err(E::from)
            .and_then(body);
        finish(session, result).await
    }

    /// Runs one statement and commits.
    pub async fn run(&self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        self.execute(statement, params, Ok).await
    }
}

/// Settles a session on the result of its body.
pub(crate) async fn finish<H, T, E>(session: AsyncSession<H>, result: Result<T, E>) -> Result<T, E>
where
    H: AsyncHandle,
    E: From<DbError> + Display,
{
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(fault) => {
            let id = session.id();
            tracing::warn!(session = %id, "Database transaction rolled back due to: {}", fault);
            if let Err(release_error) = session.rollback().await {
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

/// One open, suspending unit of work.
///
/// Dropping an `AsyncSession` that is still open hands its handle to
/// [`AsyncHandle::abandon`], which rolls back and frees it without awaiting.
/// That is how a cancelled scope releases its connection.
pub struct AsyncSession<H: AsyncHandle> {
    id: Uuid,
    target: String,
    handle: Option<H>,
    lifecycle: Lifecycle,
}

impl<H: AsyncHandle> AsyncSession<H> {
    fn new(target: String, handle: H) -> Self {
        let mut lifecycle = Lifecycle::new();
        lifecycle.open();
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "Async database connection established successfully");
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

    pub async fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        statement::prepare(self.id, statement, params)?;
        let outcome = self.handle_mut()?.run(statement, params).await?;
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

    pub async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        statement::prepare(self.id, statement, params)?;
        self.handle_mut()?.query(statement, params).await
    }

    pub async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError> {
        statement::prepare(self.id, statement, params)?;
        self.handle_mut()?.execute(statement, params).await
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        self.release(Resolution::Commit).await
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        self.release(Resolution::Rollback).await
    }

    fn handle_mut(&mut self) -> Result<&mut H, DbError> {
        self.handle
            .as_mut()
            .ok_or_else(|| DbError::Query("session has already been released".to_string()))
    }

    async fn release(&mut self, resolution: Resolution) -> Result<(), DbError> {
        // The handle stays in `self` while the decision is awaited, so a drop
        // at that point still reaches `abandon`.
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        let decided = match resolution {
            Resolution::Commit => handle.commit().await,
            Resolution::Rollback => handle.rollback().await,
        };
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

        let closed = match self.handle.take() {
            Some(handle) => handle.close().await,
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

impl<H: AsyncHandle> Drop for AsyncSession<H> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        tracing::warn!(session = %self.id, "Session dropped while open, abandoning its handle");
        if self.lifecycle.state() == SessionState::Open {
            self.lifecycle.resolve(Resolution::Rollback);
        }
        handle.abandon();
        self.lifecycle.close();
    }
}

impl<H: AsyncHandle> std::fmt::Debug for AsyncSession<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
