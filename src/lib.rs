//! # Theta ORM
//!
//! A lightweight object-relational mapping layer for contract code running
//! inside a database-backed execution context. Entity types register their
//! table, primary key and columns once; the crate then generates
//! parameterized `INSERT`/`UPDATE` statements from instances and turns query
//! results back into typed instances, row by row.
//!
//! ## Features
//!
//! - **Static registration**: Mappings are built with [`Mapping`], no runtime reflection
//! - **Inheritance**: A mapping may extend an ancestor's mapping through an embedded struct
//! - **Lazy results**: Rows are materialized on demand while the cursor advances
//! - **Parameter binding**: Values are always bound, never formatted into SQL
//! - **Async contexts**: [`SqliteContext`] offloads work to tokio's blocking pool with a timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use theta_orm::prelude::*;
//!
//! #[derive(Default, Debug)]
//! struct Account {
//!     id: Option<num_bigint::BigInt>,
//!     balance: Option<Decimal>,
//! }
//!
//! impl Entity for Account {
//!     fn mapping() -> Mapping<Self> {
//!         Mapping::new()
//!             .table("accounts")
//!             .primary_key(&["id"])
//!             .column("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
//!             .column("balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let conn = rusqlite::Connection::open_in_memory()?;
//!     let ctx = SqliteContext::new(conn);
//!
//!     ctx.execute("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance TEXT)", &[])
//!         .await?;
//!     ctx.insert(Account {
//!         id: Some(7.into()),
//!         balance: Some(Decimal::new(10050, 2)),
//!     })
//!     .await?;
//!
//!     let accounts: Vec<Account> = ctx.fetch_all("SELECT * FROM accounts", &[]).await?;
//!     println!("{:?}", accounts);
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! src/
//! ├── core/              # Engine-independent mapping machinery
//! │   ├── entity.rs      # Entity trait and Mapping builder
//! │   ├── resolver.rs    # Descriptor resolution and caching
//! │   ├── statement.rs   # INSERT/UPDATE generation
//! │   ├── convert.rs     # Declared type to extractor registry
//! │   ├── materializer.rs # Lazy row materialization
//! │   └── ...
//! ├── backends/          # Engine implementations
//! │   ├── sqlite.rs      # rusqlite binding, cursor, connection extension
//! │   └── sqlite_context.rs # Async execution context
//! └── lib.rs
//! ```

/// Core mapping types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use theta_orm::prelude::*;
///
/// let value: DatabaseValue = "alice".into();
/// assert_eq!(value.as_str(), Some("alice"));
/// ```
pub mod prelude {
    pub use crate::core::{
        ColumnType, ContextConfig, DatabaseValue, Entity, EntityStore, Mapping, OrmError,
        Result,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{EntityConnection, SqliteContext};
}

// Re-export at root level for convenience
pub use core::{
    ColumnType, ContextConfig, DatabaseValue, Entity, EntityStore, Mapping, OrmError, Result,
};

#[cfg(feature = "sqlite")]
pub use backends::{EntityConnection, SqliteContext};
