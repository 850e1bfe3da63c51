use crate::backend::{AsyncConnector, AsyncHandle, Connector, Handle};
use crate::error::DbError;
use crate::sqlite::{SqliteConnector, SqliteHandle};
use async_trait::async_trait;
use core_types::{Outcome, Row, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::spawn_blocking;

/// Opens suspending SQLite connections.
///
/// Each connection is a blocking [`SqliteHandle`] driven from tokio's blocking
/// pool, so targets are opened exactly as [`SqliteConnector`] opens them
/// (including `file:` URIs) and a cancelled session can be released without
/// awaiting.
#[derive(Debug, Clone, Default)]
pub struct SqliteAsyncConnector {
    inner: SqliteConnector,
}

impl SqliteAsyncConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.inner = self.inner.with_busy_timeout(busy_timeout);
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.inner = self.inner.with_foreign_keys(enabled);
        self
    }
}

#[async_trait]
impl AsyncConnector for SqliteAsyncConnector {
    type Handle = SqliteAsyncHandle;

    async fn connect(&self, target: &str) -> Result<SqliteAsyncHandle, DbError> {
        let connector = self.inner.clone();
        let owned_target = target.to_string();
        let handle = spawn_blocking(move || connector.connect(&owned_target))
            .await
            .map_err(|e| DbError::connection(target, e))??;
        Ok(SqliteAsyncHandle {
            inner: Arc::new(Mutex::new(Some(handle))),
        })
    }
}

/// A SQLite connection with an open transaction, used from async code.
///
/// The handle sits behind a mutex that every blocking call holds for its whole
/// run, so `abandon` waits for an in-flight statement and then rolls back and
/// closes before it returns.
#[derive(Debug)]
pub struct SqliteAsyncHandle {
    inner: Arc<Mutex<Option<SqliteHandle>>>,
}

impl SqliteAsyncHandle {
    /// Runs `op` against the handle on the blocking pool.
    async fn blocking<T, F>(&self, op: F, failed: fn(String) -> DbError) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteHandle) -> Result<T, DbError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        spawn_blocking(move || {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.as_mut() {
                Some(handle) => op(handle),
                None => Err(failed("connection has already been released".to_string())),
            }
        })
        .await
        .map_err(|e| failed(e.to_string()))?
    }

    /// Takes the handle out, waiting for any statement still running on it.
    fn take(&self) -> Option<SqliteHandle> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl AsyncHandle for SqliteAsyncHandle {
    async fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError> {
        let (statement, params) = (statement.to_string(), params.to_vec());
        self.blocking(move |handle| handle.run(&statement, &params), DbError::Query)
            .await
    }

    async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let (statement, params) = (statement.to_string(), params.to_vec());
        self.blocking(move |handle| handle.query(&statement, &params), DbError::Query)
            .await
    }

    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError> {
        let (statement, params) = (statement.to_string(), params.to_vec());
        self.blocking(move |handle| handle.execute(&statement, &params), DbError::Query)
            .await
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.blocking(|handle| handle.commit(), DbError::Commit).await
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.blocking(|handle| handle.rollback(), DbError::Rollback).await
    }

    async fn close(self) -> Result<(), DbError> {
        let inner = Arc::clone(&self.inner);
        spawn_blocking(move || {
            let handle = inner.lock().unwrap_or_else(PoisonError::into_inner).take();
            handle.map_or(Ok(()), |handle| handle.close())
        })
        .await
        .map_err(|e| DbError::Release(e.to_string()))?
    }

    fn abandon(self) {
        let Some(mut handle) = self.take() else {
            return;
        };
        if let Err(e) = handle.rollback() {
            tracing::error!(error = %e, "Failed to roll back an abandoned connection");
        }
        if let Err(e) = handle.close() {
            tracing::error!(error = %e, "Failed to close an abandoned connection");
        }
    }
}
