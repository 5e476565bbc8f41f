//! Async entity store trait
//!
//! The contract an execution context offers to contract code: write an
//! entity, read typed rows back, run a raw parameterized statement. The
//! store owns nothing about transactions or node identity.

use super::entity::Entity;
use super::error::Result;
use super::value::DatabaseValue;
use async_trait::async_trait;

/// Async persistence operations over mapped entities
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert every present column of `entity`, returning affected rows
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity type declares no table name
    /// - No column of `entity` has a value
    /// - The statement fails or times out
    async fn insert<T: Entity>(&self, entity: T) -> Result<u64>;

    /// Update the row addressed by `entity`'s primary key
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity type declares no table name or primary key
    /// - No non-key column of `entity` has a value
    /// - The statement fails or times out
    async fn update<T: Entity>(&self, entity: T) -> Result<u64>;

    /// Run a parameterized query and materialize every row into `T`
    async fn fetch_all<T: Entity>(&self, sql: &str, args: &[DatabaseValue]) -> Result<Vec<T>>;

    /// Execute a parameterized statement that returns no rows
    ///
    /// Values are always bound to placeholders; never format user input
    /// into `sql`.
    async fn execute(&self, sql: &str, args: &[DatabaseValue]) -> Result<u64>;
}
