//! Core mapping types and traits
//!
//! Entity mappings, descriptor resolution, statement generation, type
//! conversion, and result materialization. Nothing here touches a
//! particular database engine.

pub mod column_type;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod materializer;
pub mod resolver;
pub mod statement;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use column_type::{ColumnField, ColumnType};
pub use config::{ContextConfig, DEFAULT_OPERATION_TIMEOUT};
pub use convert::{ColumnExtractor, ConversionRegistry};
pub use cursor::{ResultCursor, VecCursor};
pub use entity::{ColumnBinding, Entity, Mapping};
pub use error::{OrmError, Result};
pub use materializer::{materialize, ColumnSetter, Materializer, Records};
pub use resolver::{resolve, EntityDescriptor, MetadataResolver, PrimaryKeyDescriptor};
pub use statement::{build_insert, build_update, InsertBuilder, Statement, UpdateBuilder};
pub use store::EntityStore;
pub use value::DatabaseValue;
