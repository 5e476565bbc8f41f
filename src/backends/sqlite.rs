//! SQLite backend
//!
//! Binds [`DatabaseValue`]s as rusqlite parameters, adapts `rusqlite::Rows`
//! to [`ResultCursor`], and adds entity operations to a caller-owned
//! `rusqlite::Connection`. The connection is only ever borrowed.

use crate::core::{
    cursor::ResultCursor,
    entity::Entity,
    error::{OrmError, Result},
    materializer::{Materializer, Records},
    resolver::{self, EntityDescriptor},
    statement::{self, Statement},
    value::{DatabaseValue, DATE_FORMAT, TIMESTAMP_FORMAT},
};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Rows};
use std::sync::Arc;

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(*v as i64)),
            DatabaseValue::Long(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            DatabaseValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            // Decimals are bound as text so no digit is lost to REAL.
            DatabaseValue::Decimal(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            DatabaseValue::BigInt(v) => match i64::try_from(v) {
                Ok(small) => ToSqlOutput::Owned(Value::Integer(small)),
                Err(_) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            },
            DatabaseValue::Date(v) => {
                ToSqlOutput::Owned(Value::Text(v.format(DATE_FORMAT).to_string()))
            }
            DatabaseValue::Timestamp(v) => {
                ToSqlOutput::Owned(Value::Text(v.format(TIMESTAMP_FORMAT).to_string()))
            }
        };
        Ok(output)
    }
}

/// Convert a raw SQLite value into a [`DatabaseValue`]
///
/// Text that is not valid UTF-8 is rejected rather than repaired.
pub fn value_from_ref(value: ValueRef<'_>) -> Result<DatabaseValue> {
    let converted = match value {
        ValueRef::Null => DatabaseValue::Null,
        ValueRef::Integer(v) => DatabaseValue::Long(v),
        ValueRef::Real(v) => DatabaseValue::Double(v),
        ValueRef::Text(v) => std::str::from_utf8(v)
            .map(|text| DatabaseValue::Text(text.to_string()))
            .map_err(|_| OrmError::type_mismatch("text", "invalid utf-8"))?,
        ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
    };
    Ok(converted)
}

/// [`ResultCursor`] over a live `rusqlite::Rows`
///
/// Each advance copies the current row out, so the cursor never holds a
/// borrowed row across calls. Dropping it resets the statement.
pub struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
    columns: Vec<String>,
    current: Option<Vec<DatabaseValue>>,
}

impl<'stmt> SqliteCursor<'stmt> {
    /// Wrap the rows of an executed statement
    pub fn new(rows: Rows<'stmt>) -> Self {
        let columns = rows
            .as_ref()
            .map(|stmt| stmt.column_names().into_iter().map(String::from).collect())
            .unwrap_or_default();
        Self {
            rows,
            columns,
            current: None,
        }
    }
}

impl ResultCursor for SqliteCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool> {
        let width = self.columns.len();
        match self.rows.next()? {
            Some(row) => {
                let values = (0..width)
                    .map(|i| value_from_ref(row.get_ref(i)?))
                    .collect::<Result<Vec<_>>>()?;
                self.current = Some(values);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn value(&self, index: usize) -> Result<DatabaseValue> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| OrmError::other("Cursor is not positioned on a row"))?;
        row.get(index)
            .cloned()
            .ok_or_else(|| OrmError::ColumnNotFound(format!("index {}", index)))
    }
}

/// Execute a built statement, returning the affected row count
pub fn execute_statement(conn: &Connection, statement: &Statement) -> Result<u64> {
    execute_params(conn, statement.sql(), statement.params())
}

/// Execute parameterized SQL, returning the affected row count
pub fn execute_params(conn: &Connection, sql: &str, args: &[DatabaseValue]) -> Result<u64> {
    let mut stmt = conn.prepare(sql)?;
    let affected = stmt.execute(params_from_iter(args.iter()))?;
    Ok(affected as u64)
}

/// Run a query and hand its lazy record sequence to `f`
///
/// The prepared statement lives for the duration of `f` and is released
/// on every exit path, including when `f` stops early or fails.
pub fn query_entities<T, R, F>(
    conn: &Connection,
    materializer: &Materializer,
    descriptor: Arc<EntityDescriptor<T>>,
    sql: &str,
    args: &[DatabaseValue],
    f: F,
) -> Result<R>
where
    T: Entity,
    F: for<'s> FnOnce(Records<T, SqliteCursor<'s>>) -> Result<R>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query(params_from_iter(args.iter()))?;
    let records = materializer.materialize(descriptor, SqliteCursor::new(rows))?;
    f(records)
}

/// Entity operations on a caller-owned SQLite connection
///
/// # Example
///
/// ```rust,no_run
/// use theta_orm::prelude::*;
/// # use rust_decimal::Decimal;
/// # #[derive(Default)]
/// # struct Account { id: Option<num_bigint::BigInt>, balance: Option<Decimal> }
/// # impl Entity for Account {
/// #     fn mapping() -> Mapping<Self> {
/// #         Mapping::new()
/// #             .table("accounts")
/// #             .primary_key(&["id"])
/// #             .column("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
/// #             .column("balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
/// #     }
/// # }
///
/// fn richest(conn: &rusqlite::Connection) -> Result<Option<Account>> {
///     conn.query_with::<Account, _, _>(
///         "SELECT id, balance FROM accounts ORDER BY balance DESC",
///         &[],
///         |mut records| records.next().transpose(),
///     )
/// }
/// ```
pub trait EntityConnection {
    /// Insert every present column of `entity`
    fn insert<T: Entity>(&self, entity: &T) -> Result<u64>;

    /// Update the row addressed by `entity`'s primary key
    fn update<T: Entity>(&self, entity: &T) -> Result<u64>;

    /// Run a query and consume its lazy record sequence inside `f`
    fn query_with<T, R, F>(&self, sql: &str, args: &[DatabaseValue], f: F) -> Result<R>
    where
        T: Entity,
        F: for<'s> FnOnce(Records<T, SqliteCursor<'s>>) -> Result<R>;

    /// Run a query and collect every row
    fn query_all<T: Entity>(&self, sql: &str, args: &[DatabaseValue]) -> Result<Vec<T>> {
        self.query_with::<T, Vec<T>, _>(sql, args, |records| records.collect())
    }
}

impl EntityConnection for Connection {
    fn insert<T: Entity>(&self, entity: &T) -> Result<u64> {
        let descriptor = resolver::resolve::<T>();
        let statement = statement::build_insert(&descriptor, entity)?;
        execute_statement(self, &statement)
    }

    fn update<T: Entity>(&self, entity: &T) -> Result<u64> {
        let descriptor = resolver::resolve::<T>();
        let statement = statement::build_update(&descriptor, entity)?;
        execute_statement(self, &statement)
    }

    fn query_with<T, R, F>(&self, sql: &str, args: &[DatabaseValue], f: F) -> Result<R>
    where
        T: Entity,
        F: for<'s> FnOnce(Records<T, SqliteCursor<'s>>) -> Result<R>,
    {
        query_entities(
            self,
            Materializer::standard(),
            resolver::resolve::<T>(),
            sql,
            args,
            f,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Mapping;
    use chrono::NaiveDate;
    use num_bigint::BigInt;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[derive(Default, Debug, PartialEq)]
    struct Account {
        id: Option<BigInt>,
        balance: Option<Decimal>,
        owner: Option<String>,
        opened_on: Option<NaiveDate>,
    }

    impl Entity for Account {
        fn mapping() -> Mapping<Self> {
            Mapping::new()
                .table("accounts")
                .primary_key(&["id"])
                .column("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .column("balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
                .column("owner", |a: &Account| &a.owner, |a: &mut Account| &mut a.owner)
                .column(
                    "opened_on",
                    |a: &Account| &a.opened_on,
                    |a: &mut Account| &mut a.opened_on,
                )
        }
    }

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance TEXT, owner TEXT, opened_on TEXT)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_value_binding() {
        let conn = Connection::open_in_memory().unwrap();
        let row: (i64, String, String) = conn
            .query_row(
                "SELECT ?, ?, ?",
                params_from_iter([
                    DatabaseValue::BigInt(BigInt::from(9)),
                    DatabaseValue::Decimal(Decimal::from_str("1.10").unwrap()),
                    DatabaseValue::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()),
                ]),
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(row, (9, "1.10".to_string(), "2020-01-02".to_string()));
    }

    #[test]
    fn test_insert_and_query_round_trip() -> Result<()> {
        let conn = open();
        let account = Account {
            id: Some(BigInt::from(7)),
            balance: Some(Decimal::from_str("100.50").unwrap()),
            owner: Some("alice".into()),
            opened_on: NaiveDate::from_ymd_opt(2022, 8, 1),
        };
        assert_eq!(conn.insert(&account)?, 1);

        let rows: Vec<Account> = conn.query_all("SELECT * FROM accounts", &[])?;
        assert_eq!(rows, vec![account]);
        Ok(())
    }

    #[test]
    fn test_update_changes_only_present_columns() -> Result<()> {
        let conn = open();
        conn.execute(
            "INSERT INTO accounts (id, balance, owner) VALUES (7, '1.00', 'alice')",
            [],
        )?;

        let change = Account {
            id: Some(BigInt::from(7)),
            balance: Some(Decimal::from_str("100.50").unwrap()),
            ..Default::default()
        };
        assert_eq!(conn.update(&change)?, 1);

        let rows: Vec<Account> =
            conn.query_all("SELECT * FROM accounts WHERE id = ?", &[7.into()])?;
        assert_eq!(rows[0].balance, Decimal::from_str("100.50").ok());
        assert_eq!(rows[0].owner.as_deref(), Some("alice"));
        Ok(())
    }

    #[test]
    fn test_query_with_stops_early() -> Result<()> {
        let conn = open();
        for id in 1..=3 {
            conn.execute("INSERT INTO accounts (id) VALUES (?)", [id])?;
        }

        let first = conn.query_with::<Account, _, _>(
            "SELECT id FROM accounts ORDER BY id",
            &[],
            |mut records| records.next().transpose(),
        )?;
        assert_eq!(first.and_then(|a| a.id), Some(BigInt::from(1)));

        // The statement was released, so the table can be dropped.
        conn.execute("DROP TABLE accounts", [])?;
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_text_is_rejected() {
        assert!(matches!(
            value_from_ref(ValueRef::Text(&[0x66, 0xff, 0xfe])),
            Err(OrmError::TypeMismatch { .. })
        ));
        assert_eq!(
            value_from_ref(ValueRef::Text("ok".as_bytes())).unwrap(),
            DatabaseValue::Text("ok".into())
        );

        let conn = open();
        let err = conn
            .query_all::<Account>("SELECT CAST(x'66fffe' AS TEXT) AS owner", &[])
            .unwrap_err();
        assert!(matches!(err, OrmError::TypeMismatch { .. }));
    }

    #[test]
    fn test_wide_integers_round_trip_through_text() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute("CREATE TABLE accounts (id TEXT PRIMARY KEY, balance TEXT)", [])?;

        let id = BigInt::from_str(&format!("1{}", "0".repeat(39))).unwrap();
        let account = Account {
            id: Some(id.clone()),
            balance: Some(Decimal::ONE),
            ..Default::default()
        };
        conn.insert(&account)?;

        let rows: Vec<Account> = conn.query_all("SELECT id, balance FROM accounts", &[])?;
        assert_eq!(rows, vec![account]);
        assert_eq!(rows[0].id, Some(id));
        Ok(())
    }

    #[test]
    fn test_database_errors_propagate() {
        let conn = open();
        let err = conn
            .query_all::<Account>("SELECT * FROM missing_table", &[])
            .unwrap_err();
        assert!(matches!(err, OrmError::SqliteError(_)));
    }
}
