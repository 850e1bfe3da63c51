//! # scopedb Core Types
//!
//! The vocabulary shared by every other crate in the workspace: the primitive
//! values that travel in and out of a data store, the rows they form, and the
//! outcome of running one statement.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of any database driver. The
//!   `database` crate converts these types to and from its backends.
//! - **Positional:** Parameters and row values are ordered sequences, matching
//!   positional `?` placeholders.

pub mod enums;
pub mod error;
pub mod structs;
pub mod value;

// Re-export the core types to provide a clean public API.
pub use enums::{Outcome, StatementKind};
pub use error::CoreError;
pub use structs::Row;
pub use value::Value;
