//! Entity registration
//!
//! A persisted type describes itself once through [`Entity::mapping`]
//! instead of being inspected at call time. The mapping names the table,
//! the primary key, every tagged column and any writable properties, and
//! may declare an ancestor type whose mapping is lifted into it.
//!
//! # Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use theta_orm::core::entity::{Entity, Mapping};
//!
//! #[derive(Default)]
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
//! ```

use super::column_type::{ColumnField, ColumnType};
use super::error::Result;
use super::value::DatabaseValue;
use std::sync::Arc;

/// Reads a bound value off an instance, `None` when absent
pub type Getter<T> = Arc<dyn Fn(&T) -> Option<DatabaseValue> + Send + Sync>;

/// Assigns a converted column value into an instance
pub type Setter<T> = Arc<dyn Fn(&mut T, DatabaseValue) -> Result<()> + Send + Sync>;

/// No-argument initializer used for every materialized row
pub type Constructor<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A persisted type
pub trait Entity: Sized + Send + 'static {
    /// Declare the table, key and column bindings of this type
    fn mapping() -> Mapping<Self>;
}

/// Link between a name and a field or property of `T`
///
/// Tagged fields have both a getter and a setter. Properties are
/// write-only and only take part in result binding.
pub struct ColumnBinding<T> {
    name: String,
    declared: ColumnType,
    getter: Option<Getter<T>>,
    setter: Setter<T>,
}

impl<T> Clone for ColumnBinding<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            declared: self.declared,
            getter: self.getter.clone(),
            setter: Arc::clone(&self.setter),
        }
    }
}

impl<T> std::fmt::Debug for ColumnBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnBinding")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("readable", &self.getter.is_some())
            .finish()
    }
}

impl<T: 'static> ColumnBinding<T> {
    /// Bind a named column to a field reached through a pair of lenses
    pub fn field<F: ColumnField + 'static>(
        name: impl Into<String>,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        Self {
            name: name.into(),
            declared: F::COLUMN_TYPE,
            getter: Some(Arc::new(move |instance: &T| get(instance).to_value())),
            setter: Arc::new(move |instance: &mut T, value: DatabaseValue| {
                *get_mut(instance) = F::from_value(value)?;
                Ok(())
            }),
        }
    }

    /// Bind a named write-only property
    pub fn property<F, S>(name: impl Into<String>, set: S) -> Self
    where
        F: ColumnField + 'static,
        S: Fn(&mut T, F) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declared: F::COLUMN_TYPE,
            getter: None,
            setter: Arc::new(move |instance: &mut T, value: DatabaseValue| {
                set(instance, F::from_value(value)?)
            }),
        }
    }

    /// Column (or property) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the underlying field
    pub fn declared_type(&self) -> ColumnType {
        self.declared
    }

    /// Current value on `instance`, `None` when absent or write-only
    pub fn read(&self, instance: &T) -> Option<DatabaseValue> {
        self.getter.as_ref().and_then(|get| get(instance))
    }

    /// Assign a converted value into `instance`
    pub fn assign(&self, instance: &mut T, value: DatabaseValue) -> Result<()> {
        (self.setter)(instance, value)
    }

    pub(crate) fn setter(&self) -> Setter<T> {
        Arc::clone(&self.setter)
    }

    /// Re-target this binding at a descendant type embedding `T`
    pub fn lift<U: 'static>(self, get: fn(&U) -> &T, get_mut: fn(&mut U) -> &mut T) -> ColumnBinding<U> {
        let getter = self.getter.map(|inner| -> Getter<U> {
            Arc::new(move |outer: &U| inner(get(outer)))
        });
        let inner_set = self.setter;
        ColumnBinding {
            name: self.name,
            declared: self.declared,
            getter,
            setter: Arc::new(move |outer: &mut U, value: DatabaseValue| {
                inner_set(get_mut(outer), value)
            }),
        }
    }
}

/// Bindings declared at one level of the ancestor chain
pub struct Level<T> {
    pub(crate) type_name: &'static str,
    pub(crate) columns: Vec<ColumnBinding<T>>,
    pub(crate) properties: Vec<ColumnBinding<T>>,
}

impl<T: 'static> Level<T> {
    fn lift<U: 'static>(self, get: fn(&U) -> &T, get_mut: fn(&mut U) -> &mut T) -> Level<U> {
        Level {
            type_name: self.type_name,
            columns: self.columns.into_iter().map(|c| c.lift(get, get_mut)).collect(),
            properties: self
                .properties
                .into_iter()
                .map(|p| p.lift(get, get_mut))
                .collect(),
        }
    }
}

/// Declarative mapping of a persisted type
///
/// Levels are kept most-derived first; type-level tags belong to the
/// concrete type only and are never inherited from an ancestor.
pub struct Mapping<T> {
    pub(crate) table: Option<String>,
    pub(crate) primary_key: Option<Vec<String>>,
    pub(crate) levels: Vec<Level<T>>,
    pub(crate) constructor: Constructor<T>,
}

impl<T: Default + 'static> Mapping<T> {
    /// Start a mapping whose rows are initialized with `T::default()`
    pub fn new() -> Self {
        Self::with_constructor(|| Ok(T::default()))
    }
}

impl<T: Default + 'static> Default for Mapping<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Mapping<T> {
    /// Start a mapping with a custom, possibly failing, initializer
    pub fn with_constructor<C>(constructor: C) -> Self
    where
        C: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            table: None,
            primary_key: None,
            levels: vec![Level {
                type_name: std::any::type_name::<T>(),
                columns: Vec::new(),
                properties: Vec::new(),
            }],
            constructor: Arc::new(constructor),
        }
    }

    /// Set the table name tag
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Set the ordered primary-key tag
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Tag a field with a column name
    #[must_use]
    pub fn column<F: ColumnField + 'static>(
        mut self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.levels[0]
            .columns
            .push(ColumnBinding::field(name, get, get_mut));
        self
    }

    /// Declare a writable property matched by normalized name
    #[must_use]
    pub fn property<F, S>(mut self, name: &str, set: S) -> Self
    where
        F: ColumnField + 'static,
        S: Fn(&mut T, F) -> Result<()> + Send + Sync + 'static,
    {
        self.levels[0]
            .properties
            .push(ColumnBinding::property(name, set));
        self
    }

    /// Declare the embedded ancestor `P`; its bindings are inherited
    #[must_use]
    pub fn extends<P: Entity>(mut self, get: fn(&T) -> &P, get_mut: fn(&mut T) -> &mut P) -> Self {
        let parent = P::mapping();
        self.levels.extend(
            parent
                .levels
                .into_iter()
                .map(|level| level.lift(get, get_mut)),
        );
        self
    }
}
