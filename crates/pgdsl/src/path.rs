//! Typed paths: tables, columns and associations.
//!
//! Paths are what generated query types (`QMember`, `QTeam`, ...) are made of.
//! A [`Column<T>`] carries the Rust type of its column, so comparisons only
//! accept values of the matching scalar type and projections decode into `T`.
//!
//! ```ignore
//! let m = TableRef::new("member", "m");
//! let age: Column<i32> = Column::new(&m, "age");
//! let adults = age.goe(18);        // "m"."age" >= $1
//! let oops = age.goe("eighteen");  // does not compile
//! ```

use crate::error::ProjectionError;
use crate::expr::{ArithExpr, ArithOp, CmpOp, Expr, Operand};
use crate::ident::{qualified, quote_ident};
use crate::item::{AggFunc, Aggregate, SelectExpr, SelectItem};
use crate::order::OrderSpec;
use crate::qb::SubQuery;
use crate::record::Record;
use crate::value::{FromValue, Value, ValueKind};
use std::fmt;
use std::marker::PhantomData;

/// A table together with the alias it is queried under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    name: String,
    alias: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Reference a column of this table.
    pub fn column(&self, column: &str) -> ColumnRef {
        ColumnRef::new(&self.alias, column)
    }

    /// `"member" AS "m"`
    pub fn to_sql(&self) -> String {
        format!("{} AS {}", quote_ident(&self.name), quote_ident(&self.alias))
    }
}

/// An untyped, alias-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    table: String,
    column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table_alias.into(),
            column: column.into(),
        }
    }

    pub fn table_alias(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Expression key used by tuples and labels: `m.age`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    pub fn to_sql(&self) -> String {
        qualified(&self.table, &self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Maps a Rust field type to the scalar accepted in comparisons.
///
/// `Option<T>` marks a nullable column; comparisons still take a plain `T`.
pub trait ColumnType {
    type Scalar: Into<Value> + FromValue + Send + Sync + 'static;
}

macro_rules! impl_column_type {
    ($($ty:ty),*) => {
        $(impl ColumnType for $ty { type Scalar = $ty; })*
    };
}

impl_column_type!(bool, i32, i64, f64, String);

impl<T: ColumnType> ColumnType for Option<T> {
    type Scalar = T::Scalar;
}

/// Numeric scalars that support SUM/AVG and arithmetic.
pub trait Numeric: ColumnType {
    /// Result type of `SUM` over this column.
    type Sum: FromValue;
}

impl Numeric for i32 {
    type Sum = i64;
}

impl Numeric for i64 {
    type Sum = i64;
}

impl Numeric for f64 {
    type Sum = f64;
}

impl<T: Numeric> Numeric for Option<T> {
    type Sum = T::Sum;
}

/// A typed column of a queried table.
pub struct Column<T> {
    col: ColumnRef,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            col: self.col.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.col.key()).finish()
    }
}

impl<T: ColumnType> Column<T> {
    pub fn new(table: &TableRef, name: &str) -> Self {
        Self {
            col: table.column(name),
            _ty: PhantomData,
        }
    }

    pub fn column_ref(&self) -> &ColumnRef {
        &self.col
    }

    /// Unqualified column name.
    pub fn name(&self) -> &str {
        self.col.column()
    }

    pub(crate) fn kind(&self) -> ValueKind {
        <T::Scalar as FromValue>::KIND
    }

    fn compare(&self, op: CmpOp, value: impl Into<T::Scalar>) -> Expr {
        Expr::Compare {
            left: self.col.clone(),
            op,
            right: Operand::Value(value.into().into()),
        }
    }

    /// `column = value`
    pub fn eq(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Eq, value)
    }

    /// `column != value`
    pub fn ne(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Ne, value)
    }

    /// `column > value`
    pub fn gt(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Gt, value)
    }

    /// `column >= value`
    pub fn goe(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Gte, value)
    }

    /// `column < value`
    pub fn lt(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Lt, value)
    }

    /// `column <= value`
    pub fn loe(&self, value: impl Into<T::Scalar>) -> Expr {
        self.compare(CmpOp::Lte, value)
    }

    /// `column BETWEEN from AND to` (bounds passed through unchecked)
    pub fn between(&self, from: impl Into<T::Scalar>, to: impl Into<T::Scalar>) -> Expr {
        Expr::Between {
            column: self.col.clone(),
            from: from.into().into(),
            to: to.into().into(),
            negated: false,
        }
    }

    /// `column IN (values...)`; an empty list matches nothing.
    pub fn in_list<V: Into<T::Scalar>>(&self, values: impl IntoIterator<Item = V>) -> Expr {
        let values: Vec<Value> = values.into_iter().map(|v| v.into().into()).collect();
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: self.col.clone(),
            values,
            negated: false,
        }
    }

    /// `column NOT IN (values...)`; an empty list matches everything.
    pub fn not_in<V: Into<T::Scalar>>(&self, values: impl IntoIterator<Item = V>) -> Expr {
        let values: Vec<Value> = values.into_iter().map(|v| v.into().into()).collect();
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column: self.col.clone(),
            values,
            negated: true,
        }
    }

    /// `column IS NULL`
    pub fn is_null(&self) -> Expr {
        Expr::NullCheck {
            column: self.col.clone(),
            is_null: true,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(&self) -> Expr {
        Expr::NullCheck {
            column: self.col.clone(),
            is_null: false,
        }
    }

    /// Column-to-column equality, used for join conditions.
    pub fn eq_col<U>(&self, other: &Column<U>) -> Expr
    where
        U: ColumnType<Scalar = T::Scalar>,
    {
        Expr::Compare {
            left: self.col.clone(),
            op: CmpOp::Eq,
            right: Operand::Column(other.col.clone()),
        }
    }

    fn compare_sub<U>(&self, op: CmpOp, sub: &SubQuery<U>) -> Expr {
        Expr::Compare {
            left: self.col.clone(),
            op,
            right: Operand::Subquery(sub.boxed_plan()),
        }
    }

    /// `column = (SELECT ...)`
    pub fn eq_sub<U>(&self, sub: &SubQuery<U>) -> Expr
    where
        U: ColumnType<Scalar = T::Scalar>,
    {
        self.compare_sub(CmpOp::Eq, sub)
    }

    /// `column IN (SELECT ...)`
    pub fn in_sub<U>(&self, sub: &SubQuery<U>) -> Expr
    where
        U: ColumnType<Scalar = T::Scalar>,
    {
        Expr::InSubquery {
            column: self.col.clone(),
            plan: sub.boxed_plan(),
            negated: false,
        }
    }

    /// `column NOT IN (SELECT ...)`
    pub fn not_in_sub<U>(&self, sub: &SubQuery<U>) -> Expr
    where
        U: ColumnType<Scalar = T::Scalar>,
    {
        Expr::InSubquery {
            column: self.col.clone(),
            plan: sub.boxed_plan(),
            negated: true,
        }
    }

    pub fn asc(&self) -> OrderSpec {
        OrderSpec::asc(SelectExpr::Column(self.col.clone()))
    }

    pub fn desc(&self) -> OrderSpec {
        OrderSpec::desc(SelectExpr::Column(self.col.clone()))
    }

    /// Project this column under a different output label.
    pub fn as_(&self, alias: &str) -> Aliased<T> {
        Aliased {
            item: self.item().with_alias(alias),
            _ty: PhantomData,
        }
    }

    /// Untyped select item, labelled with the bare column name.
    pub fn item(&self) -> SelectItem {
        SelectItem::new(SelectExpr::Column(self.col.clone()), self.kind())
    }

    /// `COUNT(column)`
    pub fn count(&self) -> Aggregate<i64> {
        Aggregate::new(AggFunc::Count, self.col.clone(), ValueKind::BigInt)
    }

    /// `MAX(column)`; NULL over an empty set.
    pub fn max(&self) -> Aggregate<Option<T::Scalar>> {
        Aggregate::new(AggFunc::Max, self.col.clone(), self.kind())
    }

    /// `MIN(column)`; NULL over an empty set.
    pub fn min(&self) -> Aggregate<Option<T::Scalar>> {
        Aggregate::new(AggFunc::Min, self.col.clone(), self.kind())
    }

    /// Decode this column out of a record keyed by bare column names.
    pub fn read(&self, record: &Record) -> Result<T, ProjectionError>
    where
        T: FromValue,
    {
        record.get(self.name())
    }
}

impl<T: Numeric> Column<T> {
    /// `SUM(column)`
    pub fn sum(&self) -> Aggregate<Option<T::Sum>> {
        Aggregate::new(AggFunc::Sum, self.col.clone(), self.kind())
    }

    /// `AVG(column)` as double precision
    pub fn avg(&self) -> Aggregate<Option<f64>> {
        Aggregate::new(AggFunc::Avg, self.col.clone(), ValueKind::Double)
    }

    /// `column + value`, for bulk updates.
    pub fn add(&self, value: impl Into<T::Scalar>) -> ArithExpr {
        ArithExpr::new(self.col.clone(), ArithOp::Add, value.into().into())
    }

    /// `column * value`, for bulk updates.
    pub fn multiply(&self, value: impl Into<T::Scalar>) -> ArithExpr {
        ArithExpr::new(self.col.clone(), ArithOp::Mul, value.into().into())
    }

    /// `column > (SELECT ...)`; any numeric subquery, such as an `avg`.
    pub fn gt_sub<U: Numeric>(&self, sub: &SubQuery<U>) -> Expr {
        self.compare_sub(CmpOp::Gt, sub)
    }

    /// `column >= (SELECT ...)`
    pub fn goe_sub<U: Numeric>(&self, sub: &SubQuery<U>) -> Expr {
        self.compare_sub(CmpOp::Gte, sub)
    }

    /// `column < (SELECT ...)`
    pub fn lt_sub<U: Numeric>(&self, sub: &SubQuery<U>) -> Expr {
        self.compare_sub(CmpOp::Lt, sub)
    }

    /// `column <= (SELECT ...)`
    pub fn loe_sub<U: Numeric>(&self, sub: &SubQuery<U>) -> Expr {
        self.compare_sub(CmpOp::Lte, sub)
    }
}

impl<T: ColumnType<Scalar = String>> Column<T> {
    /// `column LIKE pattern`
    pub fn like(&self, pattern: impl Into<String>) -> Expr {
        self.compare(CmpOp::Like, pattern)
    }

    /// `column LIKE 'prefix%'`
    pub fn starts_with(&self, prefix: &str) -> Expr {
        let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        self.compare(CmpOp::Like, format!("{escaped}%"))
    }
}

/// A column projected under an explicit alias (`member.username.as_("name")`).
pub struct Aliased<T> {
    pub(crate) item: SelectItem,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Aliased<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Aliased<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Aliased").field(&self.item).finish()
    }
}

impl<T> Aliased<T> {
    pub fn item(&self) -> SelectItem {
        self.item.clone()
    }
}

/// A to-one association from an owner table to a target table.
///
/// Joining an association supplies the `fk = pk` condition automatically.
#[derive(Debug, Clone)]
pub struct Association {
    name: String,
    foreign_key: ColumnRef,
    target_key: String,
}

impl Association {
    pub fn new(owner: &TableRef, name: &str, foreign_key: &str, target_key: &str) -> Self {
        Self {
            name: name.to_string(),
            foreign_key: owner.column(foreign_key),
            target_key: target_key.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_alias(&self) -> &str {
        self.foreign_key.table_alias()
    }

    pub fn foreign_key(&self) -> &ColumnRef {
        &self.foreign_key
    }

    /// `owner.fk = target.pk`
    pub fn join_condition(&self, target: &TableRef) -> Expr {
        Expr::Compare {
            left: self.foreign_key.clone(),
            op: CmpOp::Eq,
            right: Operand::Column(target.column(&self.target_key)),
        }
    }
}

/// A queryable entity: a table path that knows its columns and how to decode itself.
///
/// Implementors get [`EntityPath::entity_items`] / [`EntityPath::entity_project`]
/// for their [`Projection`](crate::Projection) impl; entity columns are labelled
/// `alias.column` so several entities can share one row.
pub trait EntityPath {
    type Entity;

    fn table(&self) -> &TableRef;

    /// Columns in declaration order, labelled with bare column names.
    fn columns(&self) -> Vec<SelectItem>;

    /// Decode from a record whose labels are bare column names.
    ///
    /// Fetch-joined associations appear as nested `association.column` labels.
    fn decode(&self, record: &Record) -> Result<Self::Entity, ProjectionError>;

    fn entity_items(&self) -> Vec<SelectItem> {
        self.columns()
            .into_iter()
            .map(|item| {
                let label = format!("{}.{}", self.table().alias(), item.label());
                item.with_alias(&label)
            })
            .collect()
    }

    fn entity_project(&self, record: &Record) -> Result<Self::Entity, ProjectionError> {
        self.decode(&record.scope(self.table().alias()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamList;

    fn member() -> TableRef {
        TableRef::new("member", "m")
    }

    #[test]
    fn table_renders_with_alias() {
        assert_eq!(member().to_sql(), "\"member\" AS \"m\"");
    }

    #[test]
    fn typed_comparison_renders_placeholder() {
        let age: Column<i32> = Column::new(&member(), "age");
        let mut params = ParamList::new();
        assert_eq!(age.goe(35).build(&mut params), "\"m\".\"age\" >= $1");
        assert_eq!(params.values(), &[Value::Int(35)]);
    }

    #[test]
    fn nullable_column_compares_with_plain_value() {
        let username: Column<Option<String>> = Column::new(&member(), "username");
        let mut params = ParamList::new();
        assert_eq!(
            username.eq("member1").build(&mut params),
            "\"m\".\"username\" = $1"
        );
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let age: Column<i32> = Column::new(&member(), "age");
        assert!(matches!(age.in_list(Vec::<i32>::new()), Expr::False));
        assert!(matches!(age.not_in(Vec::<i32>::new()), Expr::True));
    }

    #[test]
    fn association_joins_on_foreign_key() {
        let team = TableRef::new("team", "t");
        let assoc = Association::new(&member(), "team", "team_id", "team_id");
        let mut params = ParamList::new();
        assert_eq!(
            assoc.join_condition(&team).build(&mut params),
            "\"m\".\"team_id\" = \"t\".\"team_id\""
        );
        assert!(params.is_empty());
    }

    #[test]
    fn alias_changes_label_only() {
        let username: Column<Option<String>> = Column::new(&member(), "username");
        let item = username.as_("name").item();
        assert_eq!(item.label(), "name");
        assert_eq!(item.key(), "m.username");
    }

    #[test]
    fn starts_with_escapes_wildcards() {
        let username: Column<Option<String>> = Column::new(&member(), "username");
        let mut params = ParamList::new();
        username.starts_with("50%_off").build(&mut params);
        assert_eq!(params.values(), &[Value::Text("50\\%\\_off%".into())]);
    }
}
