//! Async SQLite execution context
//!
//! Wraps a `rusqlite::Connection` behind a tokio mutex and runs every
//! operation on the blocking thread pool, bounded by the configured
//! operation timeout.

use super::sqlite::{execute_params, execute_statement, query_entities};
use crate::core::{
    config::ContextConfig,
    entity::Entity,
    error::{OrmError, Result},
    materializer::Materializer,
    resolver::MetadataResolver,
    statement,
    store::EntityStore,
    value::DatabaseValue,
};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Entity store backed by a single SQLite connection
pub struct SqliteContext {
    connection: Arc<Mutex<Connection>>,
    resolver: Arc<MetadataResolver>,
    materializer: Arc<Materializer>,
    config: ContextConfig,
}

impl SqliteContext {
    /// Create a context with the default configuration
    pub fn new(connection: Connection) -> Self {
        Self::with_config(connection, ContextConfig::default())
    }

    /// Create a context with an explicit configuration
    pub fn with_config(connection: Connection, config: ContextConfig) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            resolver: Arc::new(config.build_resolver()),
            materializer: Arc::new(Materializer::default()),
            config,
        }
    }

    /// Replace the materializer, e.g. one with extra extractors registered
    #[must_use]
    pub fn with_materializer(mut self, materializer: Materializer) -> Self {
        self.materializer = Arc::new(materializer);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Resolver owned by this context
    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Hand the connection back to the caller
    ///
    /// Fails while an operation that outlived its timeout still holds it.
    pub fn into_connection(self) -> Result<Connection> {
        Arc::try_unwrap(self.connection)
            .map(Mutex::into_inner)
            .map_err(|_| OrmError::connection("Connection is still held by a running operation"))
    }

    async fn run_blocking<R, F>(&self, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
    {
        let connection_arc = Arc::clone(&self.connection);
        let timeout = self.config.timeout();

        let mut task = tokio::task::spawn_blocking(move || -> Result<R> {
            let connection = connection_arc.blocking_lock();
            op(&connection)
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| OrmError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(timeout) => {
                task.abort();
                let timeout_ms = timeout_millis(timeout);
                tracing::warn!(timeout_ms, "sqlite operation timed out");
                Err(OrmError::query_timeout(timeout_ms))
            }
        }
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl EntityStore for SqliteContext {
    async fn insert<T: Entity>(&self, entity: T) -> Result<u64> {
        let descriptor = self.resolver.resolve::<T>();
        let statement = statement::build_insert(&descriptor, &entity)?;
        self.run_blocking(move |conn| execute_statement(conn, &statement))
            .await
    }

    async fn update<T: Entity>(&self, entity: T) -> Result<u64> {
        let descriptor = self.resolver.resolve::<T>();
        let statement = statement::build_update(&descriptor, &entity)?;
        self.run_blocking(move |conn| execute_statement(conn, &statement))
            .await
    }

    async fn fetch_all<T: Entity>(&self, sql: &str, args: &[DatabaseValue]) -> Result<Vec<T>> {
        let descriptor = self.resolver.resolve::<T>();
        let materializer = Arc::clone(&self.materializer);
        let sql = sql.to_string();
        let args = args.to_vec();

        self.run_blocking(move |conn| {
            query_entities(conn, &materializer, descriptor, &sql, &args, |records| {
                records.collect()
            })
        })
        .await
    }

    async fn execute(&self, sql: &str, args: &[DatabaseValue]) -> Result<u64> {
        let sql = sql.to_string();
        let args = args.to_vec();
        self.run_blocking(move |conn| execute_params(conn, &sql, &args))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Mapping;
    use num_bigint::BigInt;

    #[derive(Default, Debug, PartialEq)]
    struct Note {
        id: Option<BigInt>,
        body: Option<String>,
    }

    impl Entity for Note {
        fn mapping() -> Mapping<Self> {
            Mapping::new()
                .table("notes")
                .primary_key(&["id"])
                .column("id", |n: &Note| &n.id, |n: &mut Note| &mut n.id)
                .column("body", |n: &Note| &n.body, |n: &mut Note| &mut n.body)
        }
    }

    async fn context(config: ContextConfig) -> SqliteContext {
        let ctx = SqliteContext::with_config(Connection::open_in_memory().unwrap(), config);
        ctx.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", &[])
            .await
            .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_insert_update_and_execute() {
        let ctx = context(ContextConfig::default()).await;
        let note = Note {
            id: Some(BigInt::from(1)),
            body: Some("draft".into()),
        };
        assert_eq!(ctx.insert(note).await.unwrap(), 1);

        let affected = ctx
            .update(Note {
                id: Some(BigInt::from(1)),
                body: Some("final".into()),
            })
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let notes: Vec<Note> = ctx
            .fetch_all("SELECT id, body FROM notes WHERE id = ?", &[1.into()])
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].body.as_deref(), Some("final"));

        let deleted = ctx
            .execute("DELETE FROM notes WHERE id = ?", &[DatabaseValue::Long(1)])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_into_connection() {
        let ctx = context(ContextConfig::new().cache_descriptors(false)).await;
        assert!(!ctx.resolver().is_caching());

        let conn = ctx.into_connection().unwrap();
        let tables: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE name = 'notes'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let config = ContextConfig::new().operation_timeout(Duration::from_millis(1));
        let ctx = SqliteContext::with_config(Connection::open_in_memory().unwrap(), config);
        let err = ctx
            .execute(
                "CREATE TABLE big AS WITH RECURSIVE c(x) AS \
                 (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 5000000) SELECT x FROM c",
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::QueryTimeout { timeout_ms: 1 }));
    }

    #[tokio::test]
    async fn test_oversized_timeout_saturates() {
        let config = ContextConfig::new().operation_timeout(Duration::MAX);
        let ctx = SqliteContext::with_config(Connection::open_in_memory().unwrap(), config);
        assert_eq!(ctx.config().timeout(), Duration::MAX);
        assert_eq!(timeout_millis(ctx.config().timeout()), u64::MAX);
        assert_eq!(timeout_millis(Duration::from_millis(250)), 250);

        // A long timeout still lets quick work finish.
        ctx.execute("CREATE TABLE t (x TEXT)", &[]).await.unwrap();
    }
}
