//! # scopedb Database Crate
//!
//! This crate owns every interaction with the data store. Its centrepiece is the
//! scoped session: a connection opened for exactly one unit of work, committed
//! when that work succeeds, rolled back when it fails, and closed exactly once
//! on every exit path.
//!
//! ## Architectural Principles
//!
//! - **Backend Seams:** Sessions talk to the store through the `Connector` /
//!   `Handle` traits (blocking) and their `AsyncConnector` / `AsyncHandle`
//!   counterparts (suspending). SQLite implementations ship with the crate
//!   (`rusqlite`, the async one on tokio's blocking pool); tests plug in recording
//!   doubles.
//! - **RAII Release:** `Session` and `AsyncSession` are guards. Dropping one
//!   while it is still open (early return, panic, cancelled future) rolls it
//!   back and closes it.
//! - **No Pooling:** Each scope owns one private handle. Concurrent sessions
//!   against the same store are not serialized here.
//!
//! ## Public API
//!
//! - `ScopedConnection` / `Session`: blocking scoped access.
//! - `AsyncScopedConnection` / `AsyncSession`: the same contract with
//!   suspension points.
//! - `Batches` / `PagedRows` / `column_mean`: page-at-a-time reads.
//! - `fetch_concurrently`: fan-out/fan-in over independent async sessions.
//! - `seed_users`: the sample `users` table used by the demos.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod async_connection;
pub mod backend;
pub mod batch;
pub mod concurrent;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod sample;
pub mod sqlite;
pub mod sqlite_async;
mod statement;

// Re-export the key components to create a clean, public-facing API.
pub use async_connection::{AsyncScopedConnection, AsyncSession};
pub use backend::{AsyncConnector, AsyncHandle, Connector, Handle};
pub use batch::{Batches, PagedRows, column_mean};
pub use concurrent::{FetchReport, FetchRequest, fetch_concurrently};
pub use connection::{ScopedConnection, Session};
pub use error::DbError;
pub use lifecycle::{Resolution, SessionState};
pub use sample::{SAMPLE_USERS, SampleUser, seed_users, seed_with};
pub use sqlite::{SqliteConnector, SqliteHandle};
pub use sqlite_async::{SqliteAsyncConnector, SqliteAsyncHandle};
