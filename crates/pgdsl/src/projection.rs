//! Row projection: turning result records into typed outputs.
//!
//! A [`Projection`] contributes select items to a query and decodes the
//! matching slice of each result row. Supported shapes:
//!
//! - a single column, aliased column, aggregate or scalar subquery (`member.username`)
//! - static tuples of projections (`(member.username, member.age)`)
//! - dynamic tuples keyed by expression ([`tuple`] / [`Tuple::get`])
//! - named fields matched by output label ([`fields`], `#[derive(FromRecord)]`)
//! - positional constructor arguments ([`constructor`], `#[derive(FromArgs)]`)
//! - entity paths (`QMember` -> `Member`)
//!
//! Static shapes decode positionally, so two columns that share a bare name
//! (`member.team_id`, `team.team_id`) never collide.

use crate::error::ProjectionError;
use crate::item::{Aggregate, SelectItem};
use crate::path::{Aliased, Column, ColumnType};
use crate::qb::SubQuery;
use crate::record::{FromRecord, Record};
use crate::value::{FromValue, Value, ValueKind};
use std::fmt;
use std::marker::PhantomData;

/// A row shape selected by a query.
pub trait Projection {
    type Output;

    /// Select items contributed to the query, in order.
    fn select_items(&self) -> Vec<SelectItem>;

    /// Decode one row. `record` holds exactly this projection's columns.
    fn project(&self, record: &Record) -> Result<Self::Output, ProjectionError>;

    /// Number of columns this projection occupies.
    fn width(&self) -> usize {
        self.select_items().len()
    }

    /// Post-process each decoded row.
    ///
    /// ```ignore
    /// let names = select((member.username, member.age))
    ///     .from(&member)
    ///     .map(|(name, age)| format!("{name:?}/{age}"));
    /// ```
    fn map<F, U>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> U,
    {
        Map { inner: self, f }
    }
}

impl<P: Projection + ?Sized> Projection for &P {
    type Output = P::Output;

    fn select_items(&self) -> Vec<SelectItem> {
        (**self).select_items()
    }

    fn project(&self, record: &Record) -> Result<Self::Output, ProjectionError> {
        (**self).project(record)
    }

    fn width(&self) -> usize {
        (**self).width()
    }
}

impl<T: ColumnType + FromValue> Projection for Column<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![self.item()]
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        record.get_at(0)
    }

    fn width(&self) -> usize {
        1
    }
}

impl<T: ColumnType + FromValue> Projection for Aliased<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![self.item()]
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        record.get_at(0)
    }

    fn width(&self) -> usize {
        1
    }
}

impl<T: FromValue> Projection for Aggregate<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![self.item()]
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        record.get_at(0)
    }

    fn width(&self) -> usize {
        1
    }
}

impl<T: FromValue> Projection for SubQuery<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        vec![self.item()]
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        record.get_at(0)
    }

    fn width(&self) -> usize {
        1
    }
}

macro_rules! impl_tuple_projection {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Projection),+> Projection for ($($name,)+) {
            type Output = ($($name::Output,)+);

            fn select_items(&self) -> Vec<SelectItem> {
                let mut items = Vec::new();
                $(items.extend(self.$idx.select_items());)+
                items
            }

            fn project(&self, record: &Record) -> Result<Self::Output, ProjectionError> {
                let widths = [$(self.$idx.width()),+];
                Ok(($({
                    let start: usize = widths[..$idx].iter().sum();
                    self.$idx.project(&record.slice(start, widths[$idx]))?
                },)+))
            }

            fn width(&self) -> usize {
                0 $(+ self.$idx.width())+
            }
        }
    };
}

impl_tuple_projection!(A: 0, B: 1);
impl_tuple_projection!(A: 0, B: 1, C: 2);
impl_tuple_projection!(A: 0, B: 1, C: 2, D: 3);
impl_tuple_projection!(A: 0, B: 1, C: 2, D: 3, E: 4);

/// Projection post-processed by a closure. See [`Projection::map`].
#[derive(Clone)]
pub struct Map<P, F> {
    inner: P,
    f: F,
}

impl<P, F, U> Projection for Map<P, F>
where
    P: Projection,
    F: Fn(P::Output) -> U,
{
    type Output = U;

    fn select_items(&self) -> Vec<SelectItem> {
        self.inner.select_items()
    }

    fn project(&self, record: &Record) -> Result<U, ProjectionError> {
        self.inner.project(record).map(&self.f)
    }

    fn width(&self) -> usize {
        self.inner.width()
    }
}

/// Projection that yields `None` when all of its columns are NULL.
///
/// Useful for the right side of a LEFT JOIN.
#[derive(Clone, Debug)]
pub struct Optional<P>(P);

pub fn optional<P: Projection>(inner: P) -> Optional<P> {
    Optional(inner)
}

impl<P: Projection> Projection for Optional<P> {
    type Output = Option<P::Output>;

    fn select_items(&self) -> Vec<SelectItem> {
        self.0.select_items()
    }

    fn project(&self, record: &Record) -> Result<Self::Output, ProjectionError> {
        if record.is_all_null() {
            return Ok(None);
        }
        self.0.project(record).map(Some)
    }

    fn width(&self) -> usize {
        self.0.width()
    }
}

/// A dynamically shaped result row, read back by the expression that produced
/// each column.
///
/// ```ignore
/// let rows = select(tuple([member.username.item(), member.age.item()]))
///     .from(&member)
///     .fetch(&exec)
///     .await?;
/// let age: i32 = rows[0].get(&member.age)?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    keys: Vec<String>,
    record: Record,
}

/// Something a [`Tuple`] can be indexed by.
pub trait TupleKey {
    type Value: FromValue;

    fn tuple_key(&self) -> String;
}

impl<T: ColumnType + FromValue> TupleKey for Column<T> {
    type Value = T;

    fn tuple_key(&self) -> String {
        self.column_ref().key()
    }
}

impl<T: FromValue> TupleKey for Aggregate<T> {
    type Value = T;

    fn tuple_key(&self) -> String {
        self.item.key()
    }
}

impl<T: FromValue> TupleKey for SubQuery<T> {
    type Value = T;

    fn tuple_key(&self) -> String {
        self.item().key()
    }
}

impl Tuple {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value of the column produced by `key`.
    pub fn get<K: TupleKey>(&self, key: &K) -> Result<K::Value, ProjectionError> {
        let wanted = key.tuple_key();
        let idx = self
            .keys
            .iter()
            .position(|k| *k == wanted)
            .ok_or(ProjectionError::MissingColumn { column: wanted })?;
        self.record.get_at(idx)
    }

    pub fn get_at<T: FromValue>(&self, idx: usize) -> Result<T, ProjectionError> {
        self.record.get_at(idx)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

/// Dynamic tuple projection. See [`tuple`].
#[derive(Clone, Debug)]
pub struct TupleProjection {
    items: Vec<SelectItem>,
}

/// Project arbitrary select items into a [`Tuple`].
pub fn tuple(items: impl IntoIterator<Item = SelectItem>) -> TupleProjection {
    TupleProjection {
        items: items.into_iter().collect(),
    }
}

impl Projection for TupleProjection {
    type Output = Tuple;

    fn select_items(&self) -> Vec<SelectItem> {
        self.items.clone()
    }

    fn project(&self, record: &Record) -> Result<Tuple, ProjectionError> {
        if record.len() != self.items.len() {
            return Err(ProjectionError::Arity {
                expected: self.items.len(),
                found: record.len(),
            });
        }
        Ok(Tuple {
            keys: self.items.iter().map(SelectItem::key).collect(),
            record: record.clone(),
        })
    }
}

/// Bind by output label into a [`FromRecord`] type. See [`fields`].
pub struct Fields<T> {
    items: Vec<SelectItem>,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Fields<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Fields<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fields").field("items", &self.items).finish()
    }
}

/// Project items into `T` by name: each field of `T` reads the column whose
/// label (alias or bare column name) equals the field name.
pub fn fields<T: FromRecord>(items: impl IntoIterator<Item = SelectItem>) -> Fields<T> {
    Fields {
        items: items.into_iter().collect(),
        _ty: PhantomData,
    }
}

impl<T: FromRecord> Projection for Fields<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        self.items.clone()
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        T::from_record(record)
    }
}

/// Build a value from positional arguments.
///
/// Usually derived with `#[derive(FromArgs)]`, which binds the struct's fields
/// in declaration order.
pub trait FromArgs: Sized {
    const ARITY: usize;

    /// Declared kind of each argument, in order.
    fn arg_kinds() -> Vec<ValueKind>;

    fn from_args(args: &[Value]) -> Result<Self, ProjectionError>;
}

/// Read argument `position` as `T`. Used by `#[derive(FromArgs)]`.
pub fn bind_arg<T: FromValue>(args: &[Value], position: usize) -> Result<T, ProjectionError> {
    let value = args
        .get(position)
        .ok_or(ProjectionError::MissingArgument { position })?;
    T::from_value(value).map_err(|e| ProjectionError::mismatch(format!("argument {position}"), e))
}

/// Reject surplus arguments. Used by `#[derive(FromArgs)]`.
pub fn check_arity(args: &[Value], expected: usize) -> Result<(), ProjectionError> {
    if args.len() > expected {
        return Err(ProjectionError::Arity {
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

/// Bind by position into a [`FromArgs`] type. See [`constructor`].
pub struct Constructor<T> {
    items: Vec<SelectItem>,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("items", &self.items)
            .finish()
    }
}

/// Project items into `T` by position.
///
/// Arity and declared kinds are checked here, before any query runs.
pub fn constructor<T: FromArgs>(
    items: impl IntoIterator<Item = SelectItem>,
) -> Result<Constructor<T>, ProjectionError> {
    let items: Vec<SelectItem> = items.into_iter().collect();
    if items.len() < T::ARITY {
        return Err(ProjectionError::MissingArgument {
            position: items.len(),
        });
    }
    if items.len() > T::ARITY {
        return Err(ProjectionError::Arity {
            expected: T::ARITY,
            found: items.len(),
        });
    }
    for (item, expected) in items.iter().zip(T::arg_kinds()) {
        // Null-kinded targets accept anything.
        if expected != ValueKind::Null && !expected.accepts(item.kind()) {
            return Err(ProjectionError::TypeMismatch {
                target: item.label(),
                expected,
                found: item.kind(),
            });
        }
    }
    Ok(Constructor {
        items,
        _ty: PhantomData,
    })
}

impl<T: FromArgs> Projection for Constructor<T> {
    type Output = T;

    fn select_items(&self) -> Vec<SelectItem> {
        self.items.clone()
    }

    fn project(&self, record: &Record) -> Result<T, ProjectionError> {
        T::from_args(record.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::TableRef;

    struct Person {
        name: Option<String>,
        age: i32,
    }

    impl FromArgs for Person {
        const ARITY: usize = 2;

        fn arg_kinds() -> Vec<ValueKind> {
            vec![ValueKind::Text, ValueKind::Int]
        }

        fn from_args(args: &[Value]) -> Result<Self, ProjectionError> {
            check_arity(args, Self::ARITY)?;
            Ok(Person {
                name: bind_arg(args, 0)?,
                age: bind_arg(args, 1)?,
            })
        }
    }

    impl FromRecord for Person {
        fn from_record(record: &Record) -> Result<Self, ProjectionError> {
            Ok(Person {
                name: record.get("name")?,
                age: record.get("age")?,
            })
        }
    }

    fn member() -> (Column<Option<String>>, Column<i32>) {
        let m = TableRef::new("member", "m");
        (Column::new(&m, "username"), Column::new(&m, "age"))
    }

    #[test]
    fn static_tuple_decodes_positionally() {
        let (username, age) = member();
        let p = (username, age);
        let record = Record::new().with("username", "member1").with("age", 10);
        assert_eq!(p.width(), 2);
        assert_eq!(
            p.project(&record).unwrap(),
            (Some("member1".to_string()), 10)
        );
    }

    #[test]
    fn nested_tuple_width() {
        let (username, age) = member();
        let p = ((username.clone(), age.clone()), age.max());
        assert_eq!(p.width(), 3);
        let record = Record::new()
            .with("username", Value::Null)
            .with("age", 1)
            .with("max(m.age)", 7);
        assert_eq!(p.project(&record).unwrap(), ((None, 1), Some(7)));
    }

    #[test]
    fn wide_middle_element_shifts_later_slices() {
        let (username, age) = member();
        let p = (age.clone(), (username, age.clone()), age.max());
        assert_eq!(p.width(), 4);
        let record = Record::new()
            .with("age", 10)
            .with("username", "member2")
            .with("age", 20)
            .with("max(m.age)", 40);
        assert_eq!(
            p.project(&record).unwrap(),
            (10, (Some("member2".to_string()), 20), Some(40))
        );
    }

    #[test]
    fn map_transforms_output() {
        let (_, age) = member();
        let p = age.map(|a| a * 2);
        assert_eq!(p.project(&Record::new().with("age", 21)).unwrap(), 42);
    }

    #[test]
    fn fields_bind_by_alias() {
        let (username, age) = member();
        let p = fields::<Person>([username.as_("name").item(), age.item()]);
        let labels: Vec<String> = p.select_items().iter().map(SelectItem::label).collect();
        assert_eq!(labels, ["name", "age"]);
        let person = p
            .project(&Record::new().with("name", "member1").with("age", 10))
            .unwrap();
        assert_eq!(person.name.as_deref(), Some("member1"));
        assert_eq!(person.age, 10);
    }

    #[test]
    fn fields_without_alias_miss_the_column() {
        let (username, age) = member();
        let p = fields::<Person>([username.item(), age.item()]);
        let err = p
            .project(&Record::new().with("username", "member1").with("age", 10))
            .err()
            .unwrap();
        assert_eq!(
            err,
            ProjectionError::MissingColumn {
                column: "name".into()
            }
        );
    }

    #[test]
    fn constructor_checks_arity_up_front() {
        let (username, age) = member();
        let err = constructor::<Person>([username.item()]).unwrap_err();
        assert_eq!(err, ProjectionError::MissingArgument { position: 1 });

        let err = constructor::<Person>([username.item(), age.item(), age.item()]).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::Arity {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn constructor_checks_kinds_up_front() {
        let (username, age) = member();
        let err = constructor::<Person>([age.item(), username.item()]).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::TypeMismatch {
                target: "age".into(),
                expected: ValueKind::Text,
                found: ValueKind::Int,
            }
        );
    }

    #[test]
    fn constructor_binds_positionally() {
        let (username, age) = member();
        let p = constructor::<Person>([username.item(), age.item()]).unwrap();
        let person = p
            .project(&Record::new().with("x", Value::Null).with("y", 30))
            .unwrap();
        assert_eq!(person.name, None);
        assert_eq!(person.age, 30);
    }

    #[test]
    fn optional_is_none_when_all_null() {
        let (username, age) = member();
        let p = optional((username, age));
        let nulls = Record::new().with("a", Value::Null).with("b", Value::Null);
        assert_eq!(p.project(&nulls).unwrap(), None);
    }

    #[test]
    fn dynamic_tuple_reads_by_expression() {
        let (username, age) = member();
        let p = tuple([username.item(), age.item(), age.avg().item()]);
        let t = p
            .project(
                &Record::new()
                    .with("username", "member1")
                    .with("age", 10)
                    .with("avg(m.age)", 25.0),
            )
            .unwrap();
        assert_eq!(t.get(&age).unwrap(), 10);
        assert_eq!(t.get(&username).unwrap().as_deref(), Some("member1"));
        assert_eq!(t.get(&age.avg()).unwrap(), Some(25.0));
        assert!(t.get(&age.sum()).is_err());
    }
}
