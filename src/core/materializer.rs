//! Result materialization
//!
//! Binds every result column to a destination once per query, then builds
//! one fresh instance per row as the cursor advances. Column order and
//! count come from the query; a column with no destination is discarded.

use super::convert::{ColumnExtractor, ConversionRegistry};
use super::cursor::ResultCursor;
use super::entity::{Entity, Setter};
use super::error::{OrmError, Result};
use super::resolver::{self, EntityDescriptor};
use std::iter::FusedIterator;
use std::sync::{Arc, OnceLock};

/// Where a bound column ends up
enum Destination<T> {
    Assign {
        setter: Setter<T>,
        extractor: ColumnExtractor,
    },
    Discard,
}

/// Per-query extraction-and-assignment routine for one result column
pub struct ColumnSetter<T> {
    position: usize,
    column: String,
    destination: Destination<T>,
}

impl<T> ColumnSetter<T> {
    /// 1-based position of the column in the result
    pub fn position(&self) -> usize {
        self.position
    }

    /// Column name as reported by the result
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Whether this column is read but discarded
    pub fn is_noop(&self) -> bool {
        matches!(self.destination, Destination::Discard)
    }

    fn apply<C: ResultCursor>(&self, cursor: &C, instance: &mut T) -> Result<()> {
        match &self.destination {
            Destination::Discard => Ok(()),
            Destination::Assign { setter, extractor } => {
                let raw = cursor.value(self.position - 1)?;
                setter(instance, extractor(&raw)?)
            }
        }
    }
}

impl<T> std::fmt::Debug for ColumnSetter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSetter")
            .field("position", &self.position)
            .field("column", &self.column)
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Bind each result column to a destination of `T`
///
/// A column first matches a tagged field with exactly its name, then a
/// declared property by normalized name, then a tagged field by normalized
/// name; otherwise it is discarded. Any
/// matched destination whose declared type has no extractor fails the
/// whole binding.
pub fn bind_columns<T: 'static>(
    descriptor: &EntityDescriptor<T>,
    columns: &[String],
    registry: &ConversionRegistry,
) -> Result<Vec<ColumnSetter<T>>> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let binding = descriptor
                .column(column)
                .or_else(|| descriptor.property(column))
                .or_else(|| descriptor.column_like(column));
            let destination = match binding {
                Some(binding) => Destination::Assign {
                    setter: binding.setter(),
                    extractor: registry.extractor(binding.declared_type(), column)?,
                },
                None => Destination::Discard,
            };
            Ok(ColumnSetter {
                position: index + 1,
                column: column.clone(),
                destination,
            })
        })
        .collect()
}

/// Builds lazy record sequences from result cursors
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    registry: ConversionRegistry,
}

impl Materializer {
    /// Create a materializer using `registry` for type conversion
    pub fn new(registry: ConversionRegistry) -> Self {
        Self { registry }
    }

    /// Shared materializer with the standard registry
    pub fn standard() -> &'static Materializer {
        static STANDARD: OnceLock<Materializer> = OnceLock::new();
        STANDARD.get_or_init(Materializer::default)
    }

    /// Conversion registry in use
    pub fn registry(&self) -> &ConversionRegistry {
        &self.registry
    }

    /// Bind `cursor`'s columns to `T` and return the lazy record sequence
    ///
    /// Fails before any row is read when a bound destination has an
    /// unsupported declared type.
    pub fn materialize<T: Entity, C: ResultCursor>(
        &self,
        descriptor: Arc<EntityDescriptor<T>>,
        cursor: C,
    ) -> Result<Records<T, C>> {
        let setters = bind_columns(&descriptor, cursor.column_names(), &self.registry)?;
        tracing::debug!(
            entity = descriptor.type_name(),
            columns = setters.len(),
            discarded = setters.iter().filter(|s| s.is_noop()).count(),
            "bound result columns"
        );
        Ok(Records {
            cursor,
            descriptor,
            setters,
            row: 0,
            finished: false,
        })
    }
}

/// Materialize `cursor` into `T` with the process-wide resolver
pub fn materialize<T: Entity, C: ResultCursor>(cursor: C) -> Result<Records<T, C>> {
    Materializer::standard().materialize(resolver::resolve::<T>(), cursor)
}

/// Lazy, forward-only, single-pass sequence of materialized rows
///
/// Yields `Err` at most once; after a failure the sequence is finished.
/// Dropping it at any point drops the underlying cursor.
pub struct Records<T, C> {
    cursor: C,
    descriptor: Arc<EntityDescriptor<T>>,
    setters: Vec<ColumnSetter<T>>,
    row: usize,
    finished: bool,
}

impl<T: Entity, C: ResultCursor> Records<T, C> {
    /// Column setters bound for this query
    pub fn setters(&self) -> &[ColumnSetter<T>] {
        &self.setters
    }

    /// Number of rows materialized so far
    pub fn rows_read(&self) -> usize {
        self.row
    }

    fn materialize_row(&self) -> Result<T> {
        let mut instance = self.descriptor.construct()?;
        for setter in &self.setters {
            setter.apply(&self.cursor, &mut instance)?;
        }
        Ok(instance)
    }
}

impl<T: Entity, C: ResultCursor> Iterator for Records<T, C> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.cursor.advance() {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        }

        self.row += 1;
        match self.materialize_row() {
            Ok(instance) => Some(Ok(instance)),
            Err(e) => {
                self.finished = true;
                Some(Err(OrmError::materialization(self.row, e)))
            }
        }
    }
}

impl<T: Entity, C: ResultCursor> FusedIterator for Records<T, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cursor::VecCursor;
    use crate::core::entity::Mapping;
    use crate::core::value::DatabaseValue;
    use chrono::NaiveDate;
    use num_bigint::BigInt;
    use rust_decimal::Decimal;

    #[derive(Default, Debug)]
    struct Account {
        id: Option<BigInt>,
        balance: Option<Decimal>,
    }

    impl Entity for Account {
        fn mapping() -> Mapping<Self> {
            Mapping::new()
                .table("accounts")
                .primary_key(&["id"])
                .column("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .column("balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
        }
    }

    #[derive(Default, Debug)]
    struct Snapshot {
        balance: Option<Decimal>,
        closing: Option<Decimal>,
    }

    impl Entity for Snapshot {
        fn mapping() -> Mapping<Self> {
            Mapping::new()
                .column("balance", |s: &Snapshot| &s.balance, |s: &mut Snapshot| &mut s.balance)
                .property("bal_ance", |s: &mut Snapshot, v: Option<Decimal>| {
                    s.closing = v;
                    Ok(())
                })
        }
    }

    #[derive(Default, Debug)]
    struct Counter {
        hits: Option<i64>,
    }

    impl Entity for Counter {
        fn mapping() -> Mapping<Self> {
            Mapping::new().column("hits", |c: &Counter| &c.hits, |c: &mut Counter| &mut c.hits)
        }
    }

    #[derive(Default, Debug)]
    struct Opened {
        opened_on: Option<NaiveDate>,
    }

    impl Entity for Opened {
        fn mapping() -> Mapping<Self> {
            Mapping::new().column(
                "opened_on",
                |o: &Opened| &o.opened_on,
                |o: &mut Opened| &mut o.opened_on,
            )
        }
    }

    fn accounts_cursor() -> VecCursor {
        VecCursor::new(
            ["id", "bal_ance", "extra"],
            vec![
                vec![DatabaseValue::Long(7), "100.50".into(), "ignored".into()],
                vec![DatabaseValue::Long(8), DatabaseValue::Null, DatabaseValue::Null],
            ],
        )
    }

    #[test]
    fn test_binding_order_and_fallbacks() {
        let records = materialize::<Account, _>(accounts_cursor()).unwrap();
        let setters = records.setters();

        assert_eq!(setters.len(), 3);
        assert_eq!(setters[0].position(), 1);
        assert_eq!(setters[0].column(), "id");
        assert!(!setters[0].is_noop());
        assert!(!setters[1].is_noop());
        assert!(setters[2].is_noop());
    }

    #[test]
    fn test_rows_are_materialized() {
        let rows: Vec<Account> = materialize::<Account, _>(accounts_cursor())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(BigInt::from(7)));
        assert_eq!(rows[0].balance, Some(Decimal::new(10050, 2)));
        assert_eq!(rows[1].id, Some(BigInt::from(8)));
        assert_eq!(rows[1].balance, None);
    }

    #[test]
    fn test_separated_column_binds_tagged_field() {
        let cursor = VecCursor::new(
            ["id", "bal_ance", "extra"],
            vec![vec![DatabaseValue::Long(7), "100.50".into(), "x".into()]],
        );
        let mut records = materialize::<Account, _>(cursor).unwrap();
        let noop: Vec<bool> = records.setters().iter().map(|s| s.is_noop()).collect();
        assert_eq!(noop, vec![false, false, true]);

        let account = records.next().unwrap().unwrap();
        assert_eq!(account.id, Some(BigInt::from(7)));
        assert_eq!(account.balance, Some(Decimal::new(10050, 2)));
    }

    #[test]
    fn test_declared_property_beats_loose_column() {
        let cursor = VecCursor::new(["BAL_ANCE"], vec![vec!["3.00".into()]]);
        let rows: Vec<Snapshot> = materialize::<Snapshot, _>(cursor)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows[0].balance, None);
        assert_eq!(rows[0].closing, Some(Decimal::new(300, 2)));
    }

    #[test]
    fn test_unmatched_columns_still_yield_rows() {
        let cursor = VecCursor::new(
            ["nothing", "here"],
            vec![vec![1.into(), 2.into()], vec![3.into(), 4.into()]],
        );
        let rows: Vec<Account> = materialize::<Account, _>(cursor)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|a| a.id.is_none() && a.balance.is_none()));
    }

    #[test]
    fn test_unsupported_type_fails_before_reading() {
        let cursor = VecCursor::new(["hits"], vec![vec![DatabaseValue::Long(3)]]);
        let err = materialize::<Counter, _>(cursor).err().unwrap();
        assert!(matches!(err, OrmError::UnsupportedColumnType { .. }));

        // Unbound columns of unsupported fields are not an error.
        let cursor = VecCursor::new(["other"], vec![vec![DatabaseValue::Long(3)]]);
        assert!(materialize::<Counter, _>(cursor).is_ok());
    }

    #[test]
    fn test_date_column_reads_at_midnight() {
        let cursor = VecCursor::new(["opened_on"], vec![vec!["2021-06-30".into()]]);
        let rows: Vec<Opened> = materialize::<Opened, _>(cursor)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows[0].opened_on, NaiveDate::from_ymd_opt(2021, 6, 30));
    }

    #[test]
    fn test_failure_aborts_sequence() {
        let cursor = VecCursor::new(
            ["balance"],
            vec![
                vec!["1.00".into()],
                vec![DatabaseValue::Bytes(vec![0xde, 0xad])],
                vec!["3.00".into()],
            ],
        );
        let mut records = materialize::<Account, _>(cursor).unwrap();

        assert!(records.next().unwrap().is_ok());
        let err = records.next().unwrap().unwrap_err();
        assert!(matches!(err, OrmError::MaterializationFailure { row: 2, .. }));
        assert!(records.next().is_none());
        assert_eq!(records.rows_read(), 2);
    }

    #[test]
    fn test_constructor_failure_is_wrapped() {
        struct Sealed;

        impl Entity for Sealed {
            fn mapping() -> Mapping<Self> {
                Mapping::with_constructor(|| Err(OrmError::other("sealed")))
            }
        }

        let cursor = VecCursor::new(["x"], vec![vec![DatabaseValue::Null]]);
        let mut records = materialize::<Sealed, _>(cursor).unwrap();
        assert!(matches!(
            records.next(),
            Some(Err(OrmError::MaterializationFailure { row: 1, .. }))
        ));
    }
}
