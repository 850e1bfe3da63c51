use crate::error::DbError;
use async_trait::async_trait;
use core_types::{Outcome, Row, Value};

/// Opens blocking handles to a data store.
///
/// A successful `connect` returns a handle with a transaction already begun, so
/// everything issued through it can be committed or rolled back as one unit. If
/// any part of opening fails, the implementation cleans up whatever it created
/// and returns `DbError::Connection`.
pub trait Connector {
    type Handle: Handle;

    fn connect(&self, target: &str) -> Result<Self::Handle, DbError>;
}

/// A live, transaction-scoped connection.
///
/// Sessions call `commit` or `rollback` at most once, then `close` exactly once.
pub trait Handle: Sized {
    /// Runs a statement, letting the store decide its shape: statements that
    /// only read yield their rows, statements that write yield the number of
    /// rows they changed.
    fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError>;

    /// Runs a statement and materializes every row it produces.
    fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError>;

    /// Runs a statement and returns the number of rows it changed.
    fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;

    fn close(self) -> Result<(), DbError>;
}

/// Opens suspending handles to a data store. See [`Connector`].
#[async_trait]
pub trait AsyncConnector: Send + Sync {
    type Handle: AsyncHandle;

    async fn connect(&self, target: &str) -> Result<Self::Handle, DbError>;
}

/// The suspending counterpart of [`Handle`].
#[async_trait]
pub trait AsyncHandle: Send + Sized {
    async fn run(&mut self, statement: &str, params: &[Value]) -> Result<Outcome, DbError>;

    async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, DbError>;

    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<u64, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;

    async fn close(self) -> Result<(), DbError>;

    /// Releases the handle without awaiting anything.
    ///
    /// Called when a session is dropped while still open, typically because the
    /// future driving it was cancelled. Must discard pending changes and free the
    /// handle before returning. The default drops it, which is only enough for
    /// handles whose drop closes the store connection synchronously.
    fn abandon(self) {
        drop(self);
    }
}
