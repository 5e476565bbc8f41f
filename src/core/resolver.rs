//! Metadata resolution
//!
//! Turns a declared [`Mapping`] into an immutable [`EntityDescriptor`]:
//! the ancestor levels are flattened most-derived first, and a name bound at
//! a derived level is never overwritten by an ancestor.

use super::entity::{ColumnBinding, Constructor, Entity, Mapping};
use super::error::{OrmError, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Normalize a column or property name for loose matching
///
/// Separator characters are dropped and the rest is lower-cased, so
/// `bal_ance`, `BALANCE` and `balance` all compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered, non-empty primary-key column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyDescriptor {
    columns: Vec<String>,
}

impl PrimaryKeyDescriptor {
    /// Key columns in declaration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether `column` is part of the key
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Resolved table and column mapping of a persisted type
pub struct EntityDescriptor<T> {
    type_name: &'static str,
    table_name: Option<String>,
    primary_key: Option<PrimaryKeyDescriptor>,
    columns: IndexMap<String, ColumnBinding<T>>,
    normalized_columns: IndexMap<String, String>,
    properties: IndexMap<String, ColumnBinding<T>>,
    constructor: Constructor<T>,
}

impl<T: 'static> EntityDescriptor<T> {
    /// Flatten a mapping into a descriptor
    pub fn from_mapping(mapping: Mapping<T>) -> Self {
        let Mapping {
            table,
            primary_key,
            levels,
            constructor,
        } = mapping;

        let type_name = levels
            .first()
            .map(|level| level.type_name)
            .unwrap_or_else(std::any::type_name::<T>);

        let mut columns = IndexMap::new();
        let mut properties = IndexMap::new();
        for level in levels {
            for binding in level.columns {
                if !columns.contains_key(binding.name()) {
                    columns.insert(binding.name().to_string(), binding);
                }
            }
            for property in level.properties {
                properties
                    .entry(normalize_name(property.name()))
                    .or_insert(property);
            }
        }

        let mut normalized_columns = IndexMap::new();
        for name in columns.keys() {
            normalized_columns
                .entry(normalize_name(name))
                .or_insert_with(|| name.clone());
        }

        Self {
            type_name,
            table_name: table,
            primary_key: primary_key.map(|columns| PrimaryKeyDescriptor { columns }),
            columns,
            normalized_columns,
            properties,
            constructor,
        }
    }

    /// Name of the described type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table name tag, failing when the type declares none
    pub fn table_name(&self) -> Result<&str> {
        self.table_name
            .as_deref()
            .ok_or_else(|| OrmError::missing_metadata(self.type_name, "no table name declared"))
    }

    /// Primary-key tag, failing when absent or empty
    pub fn primary_key(&self) -> Result<&PrimaryKeyDescriptor> {
        match &self.primary_key {
            Some(pk) if !pk.columns.is_empty() => Ok(pk),
            Some(_) => Err(OrmError::missing_metadata(
                self.type_name,
                "primary key declares no columns",
            )),
            None => Err(OrmError::missing_metadata(
                self.type_name,
                "no primary key declared",
            )),
        }
    }

    /// Column bindings in resolution order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnBinding<T>> {
        self.columns.values()
    }

    /// Number of column bindings
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column binding whose name equals `name` exactly
    pub fn column(&self, name: &str) -> Option<&ColumnBinding<T>> {
        self.columns.get(name)
    }

    /// Writable property whose normalized name matches `name`
    pub fn property(&self, name: &str) -> Option<&ColumnBinding<T>> {
        self.properties.get(&normalize_name(name))
    }

    /// Column binding whose normalized name matches `name`
    ///
    /// Every tagged field is writable, so it also answers loose lookups.
    /// Among names that normalize alike, the first in resolution order wins.
    pub fn column_like(&self, name: &str) -> Option<&ColumnBinding<T>> {
        self.normalized_columns
            .get(&normalize_name(name))
            .and_then(|column| self.columns.get(column))
    }

    /// Build a fresh instance with the no-argument initializer
    pub fn construct(&self) -> Result<T> {
        (self.constructor)()
    }
}

impl<T> std::fmt::Debug for EntityDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("primary_key", &self.primary_key)
            .field("columns", &self.columns.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

type CachedDescriptor = Arc<dyn Any + Send + Sync>;

/// Resolves and optionally caches entity descriptors per type
///
/// Descriptors are immutable once built, so cached entries are shared
/// between callers behind a read-mostly lock.
pub struct MetadataResolver {
    cache: Option<RwLock<HashMap<TypeId, CachedDescriptor>>>,
}

impl MetadataResolver {
    /// Create a caching resolver
    pub fn new() -> Self {
        Self {
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    /// Create a resolver that rebuilds the descriptor on every call
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    /// Process-wide caching resolver
    pub fn global() -> &'static MetadataResolver {
        static GLOBAL: OnceLock<MetadataResolver> = OnceLock::new();
        GLOBAL.get_or_init(MetadataResolver::new)
    }

    /// Whether resolved descriptors are kept between calls
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Resolve the descriptor of `T`
    pub fn resolve<T: Entity>(&self) -> Arc<EntityDescriptor<T>> {
        let Some(cache) = &self.cache else {
            return Arc::new(Self::build::<T>());
        };

        let key = TypeId::of::<T>();
        if let Some(hit) = cache.read().get(&key).cloned() {
            if let Ok(descriptor) = hit.downcast::<EntityDescriptor<T>>() {
                return descriptor;
            }
        }

        let descriptor = Arc::new(Self::build::<T>());
        let mut entries = cache.write();
        let entry = entries
            .entry(key)
            .or_insert_with(|| Arc::clone(&descriptor) as CachedDescriptor);
        Arc::clone(entry)
            .downcast::<EntityDescriptor<T>>()
            .unwrap_or(descriptor)
    }

    /// Drop every cached descriptor
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }

    fn build<T: Entity>() -> EntityDescriptor<T> {
        let descriptor = EntityDescriptor::from_mapping(T::mapping());
        tracing::debug!(
            entity = descriptor.type_name(),
            columns = descriptor.column_count(),
            properties = descriptor.properties.len(),
            "resolved entity descriptor"
        );
        descriptor
    }
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `T` through the process-wide resolver
pub fn resolve<T: Entity>() -> Arc<EntityDescriptor<T>> {
    MetadataResolver::global().resolve::<T>()
}
