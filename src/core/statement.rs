//! Statement building
//!
//! Turns an entity instance into a parameterized INSERT or UPDATE. Values
//! are never interpolated into the SQL text; every value is bound to a `?`
//! placeholder in the same order it appears in the statement.

use super::entity::Entity;
use super::error::{OrmError, Result};
use super::resolver::EntityDescriptor;
use super::value::DatabaseValue;

/// SQL text with its positional bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<DatabaseValue>,
}

impl Statement {
    /// Generated SQL
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound values, aligned with the placeholders in `sql`
    pub fn params(&self) -> &[DatabaseValue] {
        &self.params
    }

    /// Split into SQL and bound values
    pub fn into_parts(self) -> (String, Vec<DatabaseValue>) {
        (self.sql, self.params)
    }
}

/// INSERT statement assembler
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl InsertBuilder {
    /// Create a new INSERT builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a column-value pair
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Whether no column has been added
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the SQL string
    pub fn build(&self) -> String {
        let placeholders: Vec<&str> = vec!["?"; self.values.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Build the statement, consuming the builder
    pub fn into_statement(self) -> Statement {
        Statement {
            sql: self.build(),
            params: self.values,
        }
    }
}

/// UPDATE statement assembler
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set_columns: Vec<String>,
    set_values: Vec<DatabaseValue>,
    where_columns: Vec<String>,
    where_values: Vec<DatabaseValue>,
}

impl UpdateBuilder {
    /// Create a new UPDATE builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_columns: Vec::new(),
            set_values: Vec::new(),
            where_columns: Vec::new(),
            where_values: Vec::new(),
        }
    }

    /// Set a column value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.set_columns.push(column.to_string());
        self.set_values.push(value.into());
        self
    }

    /// Add a `column = ?` condition, joined with AND
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.where_columns.push(column.to_string());
        self.where_values.push(value.into());
        self
    }

    /// Whether the SET clause is empty
    pub fn is_empty(&self) -> bool {
        self.set_columns.is_empty()
    }

    /// Build the SQL string
    pub fn build(&self) -> String {
        let set_clauses: Vec<String> = self
            .set_columns
            .iter()
            .map(|col| format!("{} = ?", col))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, set_clauses.join(", "));

        if !self.where_columns.is_empty() {
            let conditions: Vec<String> = self
                .where_columns
                .iter()
                .map(|col| format!("{} = ?", col))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql
    }

    /// Build the statement (SET values followed by WHERE values)
    pub fn into_statement(self) -> Statement {
        let sql = self.build();
        let mut params = self.set_values;
        params.extend(self.where_values);
        Statement { sql, params }
    }
}

/// Build an INSERT of every present column of `instance`
///
/// Absent values contribute neither a column nor a placeholder. Fails with
/// `EmptyMapping` when nothing is left to write.
pub fn build_insert<T: Entity>(descriptor: &EntityDescriptor<T>, instance: &T) -> Result<Statement> {
    let table = descriptor.table_name()?;

    let mut builder = InsertBuilder::new(table);
    for binding in descriptor.columns() {
        if let Some(value) = binding.read(instance) {
            builder = builder.value(binding.name(), value);
        }
    }

    if builder.is_empty() {
        return Err(OrmError::empty_mapping(descriptor.type_name()));
    }

    let statement = builder.into_statement();
    tracing::debug!(
        entity = descriptor.type_name(),
        sql = %statement.sql,
        params = statement.params.len(),
        "built insert statement"
    );
    Ok(statement)
}

/// Build an UPDATE keyed on the instance's current primary-key values
///
/// Key columns never appear in the SET clause; they form the WHERE clause
/// in declaration order. Fails with `EmptyMapping` when no non-key column
/// is present.
pub fn build_update<T: Entity>(descriptor: &EntityDescriptor<T>, instance: &T) -> Result<Statement> {
    let table = descriptor.table_name()?;
    let primary_key = descriptor.primary_key()?;

    let mut builder = UpdateBuilder::new(table);
    for binding in descriptor.columns() {
        if primary_key.contains(binding.name()) {
            continue;
        }
        if let Some(value) = binding.read(instance) {
            builder = builder.set(binding.name(), value);
        }
    }

    if builder.is_empty() {
        return Err(OrmError::empty_mapping(descriptor.type_name()));
    }

    for column in primary_key.columns() {
        let binding = descriptor.column(column).ok_or_else(|| {
            OrmError::missing_metadata(
                descriptor.type_name(),
                format!("primary key column {} has no column binding", column),
            )
        })?;
        let value = binding
            .read(instance)
            .ok_or_else(|| OrmError::missing_key_value(descriptor.type_name(), column))?;
        builder = builder.where_eq(column, value);
    }

    let statement = builder.into_statement();
    tracing::debug!(
        entity = descriptor.type_name(),
        sql = %statement.sql,
        params = statement.params.len(),
        "built update statement"
    );
    Ok(statement)
}
