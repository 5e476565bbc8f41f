//! Database backend implementations
//!
//! Concrete cursors, statement execution, and execution contexts for the
//! supported database engines.

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub mod sqlite_context;

#[cfg(feature = "sqlite")]
pub use sqlite::{EntityConnection, SqliteCursor};
#[cfg(feature = "sqlite")]
pub use sqlite_context::SqliteContext;
