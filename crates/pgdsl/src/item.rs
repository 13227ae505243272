//! Select-list items and aggregates.

use crate::ident::quote_ident;
use crate::param::ParamList;
use crate::path::ColumnRef;
use crate::qb::SelectPlan;
use crate::value::ValueKind;
use std::fmt;
use std::marker::PhantomData;

/// Aggregate function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggFunc {
    fn name(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Max => "max",
            AggFunc::Min => "min",
        }
    }
}

/// An expression that can appear in a select list or ORDER BY.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectExpr {
    Column(ColumnRef),
    /// `COUNT(*)`
    CountAll,
    Aggregate {
        func: AggFunc,
        column: ColumnRef,
        /// Kind of the aggregated column.
        input: ValueKind,
    },
    /// Scalar subquery: one column, at most one row.
    Subquery(Box<SelectPlan>),
}

impl SelectExpr {
    /// Stable key: `m.age`, `count(*)`, `avg(m.age)`, `(avg(ms.age) from ms)`.
    pub fn key(&self) -> String {
        match self {
            SelectExpr::Column(col) => col.key(),
            SelectExpr::CountAll => "count(*)".to_string(),
            SelectExpr::Aggregate { func, column, .. } => {
                format!("{}({})", func.name(), column.key())
            }
            SelectExpr::Subquery(plan) => {
                let inner: Vec<String> = plan.items.iter().map(SelectItem::key).collect();
                format!("({} from {})", inner.join(", "), plan.from.alias())
            }
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, SelectExpr::CountAll | SelectExpr::Aggregate { .. })
    }

    // SUM(bigint) and AVG are numeric in Postgres; cast so they decode as bigint/float8.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            SelectExpr::Subquery(plan) => format!("({})", plan.build(params)),
            SelectExpr::Column(col) => col.to_sql(),
            SelectExpr::CountAll => "COUNT(*)".to_string(),
            SelectExpr::Aggregate {
                func,
                column,
                input,
            } => {
                let col = column.to_sql();
                match func {
                    AggFunc::Count => format!("COUNT({col})"),
                    AggFunc::Sum if *input == ValueKind::Double => format!("SUM({col})"),
                    AggFunc::Sum => format!("SUM({col})::bigint"),
                    AggFunc::Avg => format!("AVG({col})::float8"),
                    AggFunc::Max => format!("MAX({col})"),
                    AggFunc::Min => format!("MIN({col})"),
                }
            }
        }
    }
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One entry of a select list: expression, output label and declared kind.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectItem {
    expr: SelectExpr,
    alias: Option<String>,
    kind: ValueKind,
}

impl SelectItem {
    pub fn new(expr: SelectExpr, kind: ValueKind) -> Self {
        Self {
            expr,
            alias: None,
            kind,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn expr(&self) -> &SelectExpr {
        &self.expr
    }

    pub fn key(&self) -> String {
        self.expr.key()
    }

    /// Declared kind of the produced value.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Output label: the alias, else the bare column name, else the key.
    pub fn label(&self) -> String {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => alias.clone(),
            (None, SelectExpr::Column(col)) => col.column().to_string(),
            (None, expr) => expr.key(),
        }
    }

    /// `"m"."username" AS "name"`
    pub fn build(&self, params: &mut ParamList) -> String {
        format!("{} AS {}", self.expr.build(params), quote_ident(&self.label()))
    }
}

/// A typed aggregate expression such as `member.age.avg()`.
pub struct Aggregate<T> {
    pub(crate) item: SelectItem,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Aggregate<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Aggregate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Aggregate").field(&self.item.key()).finish()
    }
}

impl<T> Aggregate<T> {
    pub(crate) fn new(func: AggFunc, column: ColumnRef, input: ValueKind) -> Self {
        let output = match func {
            AggFunc::Count => ValueKind::BigInt,
            AggFunc::Avg => ValueKind::Double,
            AggFunc::Sum if input == ValueKind::Double => ValueKind::Double,
            AggFunc::Sum => ValueKind::BigInt,
            AggFunc::Max | AggFunc::Min => input,
        };
        Self {
            item: SelectItem::new(
                SelectExpr::Aggregate {
                    func,
                    column,
                    input,
                },
                output,
            ),
            _ty: PhantomData,
        }
    }

    pub fn item(&self) -> SelectItem {
        self.item.clone()
    }

    pub fn expr(&self) -> &SelectExpr {
        self.item.expr()
    }

    /// Label the aggregate for `fields`/`Record` lookups.
    pub fn as_(&self, alias: &str) -> Self {
        Self {
            item: self.item.clone().with_alias(alias),
            _ty: PhantomData,
        }
    }

    pub fn asc(&self) -> crate::order::OrderSpec {
        crate::order::OrderSpec::asc(self.item.expr().clone())
    }

    pub fn desc(&self) -> crate::order::OrderSpec {
        crate::order::OrderSpec::desc(self.item.expr().clone())
    }
}

/// `COUNT(*)`
pub fn count_all() -> Aggregate<i64> {
    Aggregate {
        item: SelectItem::new(SelectExpr::CountAll, ValueKind::BigInt),
        _ty: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_sql_casts_numeric_results() {
        let age = ColumnRef::new("m", "age");
        let sum: Aggregate<Option<i64>> = Aggregate::new(AggFunc::Sum, age.clone(), ValueKind::Int);
        let avg: Aggregate<Option<f64>> = Aggregate::new(AggFunc::Avg, age, ValueKind::Int);
        assert_eq!(
            sum.item().build(&mut ParamList::new()),
            "SUM(\"m\".\"age\")::bigint AS \"sum(m.age)\""
        );
        assert_eq!(
            avg.item().build(&mut ParamList::new()),
            "AVG(\"m\".\"age\")::float8 AS \"avg(m.age)\""
        );
        assert_eq!(avg.item().kind(), ValueKind::Double);
    }

    #[test]
    fn max_keeps_input_kind() {
        let max: Aggregate<Option<i32>> =
            Aggregate::new(AggFunc::Max, ColumnRef::new("m", "age"), ValueKind::Int);
        assert_eq!(max.item().kind(), ValueKind::Int);
        assert_eq!(max.as_("oldest").item().label(), "oldest");
    }

    #[test]
    fn count_all_label() {
        assert_eq!(
            count_all().item().build(&mut ParamList::new()),
            "COUNT(*) AS \"count(*)\""
        );
    }
}
