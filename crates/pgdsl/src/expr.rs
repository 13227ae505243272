//! Boolean expressions for WHERE / ON / HAVING clauses.
//!
//! An [`Expr`] is a structural tree over typed column references and bound
//! values. It can be rendered to SQL with `$n` placeholders via
//! [`Expr::build`], or evaluated against a row with SQL three-valued logic via
//! [`Expr::evaluate`]. Both paths read the same tree, so a filter means the
//! same thing against Postgres and against the in-memory store.

use crate::error::{DslResult, ExecutorError};
use crate::param::ParamList;
use crate::path::ColumnRef;
use crate::qb::SelectPlan;
use crate::value::Value;
use std::cmp::Ordering;

/// Right-hand side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Value(Value),
    /// Single-column subquery producing at most one row.
    Subquery(Box<SelectPlan>),
}

impl Operand {
    fn build(&self, params: &mut ParamList) -> String {
        match self {
            Operand::Column(col) => col.to_sql(),
            Operand::Value(v) => format!("${}", params.push(v.clone())),
            Operand::Subquery(plan) => format!("({})", plan.build(params)),
        }
    }

    fn resolve<F>(&self, lookup: &F) -> DslResult<Value>
    where
        F: Fn(&ColumnRef) -> DslResult<Value>,
    {
        match self {
            Operand::Column(col) => lookup(col),
            Operand::Value(v) => Ok(v.clone()),
            Operand::Subquery(_) => Err(unresolved_subquery()),
        }
    }
}

fn unresolved_subquery() -> crate::error::DslError {
    ExecutorError::store("subquery must be resolved before evaluation").into()
}

/// The value of a scalar subquery: NULL for no rows, an error for more than one.
pub fn scalar_subquery_value(values: Vec<Value>) -> DslResult<Value> {
    let mut values = values.into_iter();
    match (values.next(), values.next()) {
        (None, _) => Ok(Value::Null),
        (Some(v), None) => Ok(v),
        (Some(_), Some(_)) => Err(ExecutorError::store(
            "more than one row returned by a subquery used as an expression",
        )
        .into()),
    }
}

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Like => "LIKE",
        }
    }

    fn test(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq | CmpOp::Like => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Gte => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Lte => ord != Ordering::Greater,
        }
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// All conditions must hold. Empty means no condition.
    And(Vec<Expr>),

    /// At least one condition must hold.
    Or(Vec<Expr>),

    Not(Box<Expr>),

    /// `left op right`
    Compare {
        left: ColumnRef,
        op: CmpOp,
        right: Operand,
    },

    NullCheck {
        column: ColumnRef,
        is_null: bool,
    },

    InList {
        column: ColumnRef,
        values: Vec<Value>,
        negated: bool,
    },

    Between {
        column: ColumnRef,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// `column [NOT] IN (SELECT ...)`
    InSubquery {
        column: ColumnRef,
        plan: Box<SelectPlan>,
        negated: bool,
    },

    /// Always true (empty NOT IN).
    True,

    /// Always false (empty IN).
    False,
}

impl Expr {
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// `self AND other`, flattening nested ANDs.
    pub fn and_also(self, other: Expr) -> Self {
        match self {
            Expr::And(mut exprs) => {
                exprs.push(other);
                Expr::And(exprs)
            }
            expr => Expr::And(vec![expr, other]),
        }
    }

    /// `self OR other`
    pub fn or_else(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut exprs) => {
                exprs.push(other);
                Expr::Or(exprs)
            }
            expr => Expr::Or(vec![expr, other]),
        }
    }

    /// True when the expression contains no condition at all.
    ///
    /// `NOT` of an empty group is a condition: it matches nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            _ => false,
        }
    }

    /// Replace every subquery with the values it produces.
    ///
    /// `run` returns the single column of a subquery's rows. In-process
    /// executors call this before [`Expr::evaluate`].
    pub fn resolve_subqueries<F>(&self, run: &mut F) -> DslResult<Expr>
    where
        F: FnMut(&SelectPlan) -> DslResult<Vec<Value>>,
    {
        Ok(match self {
            Expr::And(exprs) => Expr::And(
                exprs
                    .iter()
                    .map(|e| e.resolve_subqueries(run))
                    .collect::<DslResult<_>>()?,
            ),
            Expr::Or(exprs) => Expr::Or(
                exprs
                    .iter()
                    .map(|e| e.resolve_subqueries(run))
                    .collect::<DslResult<_>>()?,
            ),
            Expr::Not(inner) => Expr::not(inner.resolve_subqueries(run)?),
            Expr::Compare {
                left,
                op,
                right: Operand::Subquery(plan),
            } => Expr::Compare {
                left: left.clone(),
                op: *op,
                right: Operand::Value(scalar_subquery_value(run(&**plan)?)?),
            },
            Expr::InSubquery {
                column,
                plan,
                negated,
            } => Expr::InList {
                column: column.clone(),
                values: run(&**plan)?,
                negated: *negated,
            },
            other => other.clone(),
        })
    }

    /// Render SQL with `$n` placeholders, pushing bound values into `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => join_group(exprs, " AND ", params),
            Expr::Or(exprs) => join_group(exprs, " OR ", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    "1=0".into()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { left, op, right } => {
                let rhs = right.build(params);
                format!("{} {} {}", left.to_sql(), op.as_sql(), rhs)
            }
            Expr::NullCheck { column, is_null } => {
                if *is_null {
                    format!("{} IS NULL", column.to_sql())
                } else {
                    format!("{} IS NOT NULL", column.to_sql())
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1".into() } else { "1=0".into() };
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", params.push(v.clone())))
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column.to_sql(), op, placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let lo = params.push(from.clone());
                let hi = params.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {} ${} AND ${}", column.to_sql(), op, lo, hi)
            }
            Expr::InSubquery {
                column,
                plan,
                negated,
            } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column.to_sql(), op, plan.build(params))
            }
            Expr::True => "1=1".into(),
            Expr::False => "1=0".into(),
        }
    }

    /// Evaluate against one row. `None` is SQL UNKNOWN.
    ///
    /// Empty groups evaluate to TRUE, matching [`Expr::build`] rendering them as
    /// no condition; `NOT` of an empty group is FALSE. Subqueries must be
    /// replaced with [`Expr::resolve_subqueries`] first.
    pub fn evaluate<F>(&self, lookup: &F) -> DslResult<Option<bool>>
    where
        F: Fn(&ColumnRef) -> DslResult<Value>,
    {
        match self {
            Expr::And(exprs) => {
                let mut result = Some(true);
                for expr in exprs.iter().filter(|e| !e.is_empty()) {
                    match expr.evaluate(lookup)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Expr::Or(exprs) => {
                let live: Vec<&Expr> = exprs.iter().filter(|e| !e.is_empty()).collect();
                if live.is_empty() {
                    return Ok(Some(true));
                }
                let mut result = Some(false);
                for expr in live {
                    match expr.evaluate(lookup)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            Expr::Not(inner) => {
                if inner.is_empty() {
                    return Ok(Some(false));
                }
                Ok(inner.evaluate(lookup)?.map(|b| !b))
            }
            Expr::Compare { left, op, right } => {
                let lhs = lookup(left)?;
                let rhs = right.resolve(lookup)?;
                if *op == CmpOp::Like {
                    return Ok(match (&lhs, &rhs) {
                        (Value::Text(s), Value::Text(p)) => Some(like_match(s, p)),
                        _ => None,
                    });
                }
                Ok(lhs.sql_cmp(&rhs).map(|ord| op.test(ord)))
            }
            Expr::NullCheck { column, is_null } => {
                Ok(Some(lookup(column)?.is_null() == *is_null))
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let v = lookup(column)?;
                let mut result = Some(false);
                for candidate in values {
                    match v.sql_cmp(candidate) {
                        Some(Ordering::Equal) => {
                            result = Some(true);
                            break;
                        }
                        None => result = None,
                        Some(_) => {}
                    }
                }
                Ok(if *negated { result.map(|b| !b) } else { result })
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let v = lookup(column)?;
                let lo = v.sql_cmp(from).map(|o| o != Ordering::Less);
                let hi = v.sql_cmp(to).map(|o| o != Ordering::Greater);
                let within = match (lo, hi) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                };
                Ok(if *negated { within.map(|b| !b) } else { within })
            }
            Expr::InSubquery { .. } => Err(unresolved_subquery()),
            Expr::True => Ok(Some(true)),
            Expr::False => Ok(Some(false)),
        }
    }
}

fn join_group(exprs: &[Expr], sep: &str, params: &mut ParamList) -> String {
    let parts: Vec<String> = exprs
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| {
            let sql = e.build(params);
            if matches!(e, Expr::And(_) | Expr::Or(_)) {
                format!("({sql})")
            } else {
                sql
            }
        })
        .collect();
    parts.join(sep)
}

#[derive(Clone, Copy, PartialEq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    tokens
}

/// SQL `LIKE` with `%`, `_` and backslash escapes.
///
/// Greedy matching that backtracks only to the most recent `%`, so the cost
/// stays linear in `text` per pattern token.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern = like_tokens(pattern);
    let (mut t, mut p) = (0, 0);
    // Pattern index after the last `%`, and the text index it was tried at.
    let mut resume: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(LikeToken::AnyRun) => {
                p += 1;
                resume = Some((p, t));
            }
            Some(LikeToken::AnyOne) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((after, tried)) => {
                    p = after;
                    t = tried + 1;
                    resume = Some((after, t));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|tok| *tok == LikeToken::AnyRun)
}

/// Arithmetic operator for update expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Mul,
}

/// `column op value`, used on the right-hand side of `SET`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArithExpr {
    column: ColumnRef,
    op: ArithOp,
    operand: Value,
}

impl ArithExpr {
    pub(crate) fn new(column: ColumnRef, op: ArithOp, operand: Value) -> Self {
        Self {
            column,
            op,
            operand,
        }
    }

    pub fn build(&self, params: &mut ParamList) -> String {
        let idx = params.push(self.operand.clone());
        let op = match self.op {
            ArithOp::Add => "+",
            ArithOp::Mul => "*",
        };
        format!("{} {} ${}", self.column.to_sql(), op, idx)
    }

    pub fn evaluate<F>(&self, lookup: &F) -> DslResult<Value>
    where
        F: Fn(&ColumnRef) -> DslResult<Value>,
    {
        let lhs = lookup(&self.column)?;
        let out_of_range = || ExecutorError::store("integer out of range");
        let value = match (&lhs, &self.operand) {
            (Value::Null, _) | (_, Value::Null) => Value::Null,
            (Value::Int(a), Value::Int(b)) => Value::Int(
                match self.op {
                    ArithOp::Add => a.checked_add(*b),
                    ArithOp::Mul => a.checked_mul(*b),
                }
                .ok_or_else(out_of_range)?,
            ),
            (Value::Int(_) | Value::BigInt(_), Value::Int(_) | Value::BigInt(_)) => {
                let (a, b) = (i64_of(&lhs), i64_of(&self.operand));
                Value::BigInt(
                    match self.op {
                        ArithOp::Add => a.checked_add(b),
                        ArithOp::Mul => a.checked_mul(b),
                    }
                    .ok_or_else(out_of_range)?,
                )
            }
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                let (a, b) = (f64_of(&lhs), f64_of(&self.operand));
                match (a, b) {
                    (Some(a), Some(b)) => Value::Double(match self.op {
                        ArithOp::Add => a + b,
                        ArithOp::Mul => a * b,
                    }),
                    _ => return Err(non_numeric(&self.column).into()),
                }
            }
            _ => return Err(non_numeric(&self.column).into()),
        };
        Ok(value)
    }
}

fn i64_of(v: &Value) -> i64 {
    match v {
        Value::Int(i) => i64::from(*i),
        Value::BigInt(i) => *i,
        _ => 0,
    }
}

fn f64_of(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(f64::from(*i)),
        Value::BigInt(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn non_numeric(column: &ColumnRef) -> ExecutorError {
    ExecutorError::store(format!("arithmetic on non-numeric column {column}"))
}

/// A composed WHERE predicate.
///
/// `Filter::match_all()` renders no WHERE clause at all.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter(Expr);

impl Filter {
    /// The filter that excludes nothing.
    pub fn match_all() -> Self {
        Filter(Expr::And(Vec::new()))
    }

    /// AND together every present predicate; absent ones are skipped.
    ///
    /// ```ignore
    /// let filter = Filter::all_of([
    ///     cond.age_goe.map(|v| member.age.goe(v)),
    ///     cond.age_loe.map(|v| member.age.loe(v)),
    /// ]);
    /// ```
    pub fn all_of(predicates: impl IntoIterator<Item = Option<Expr>>) -> Self {
        Filter(Expr::And(predicates.into_iter().flatten().collect()))
    }

    pub fn is_match_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Add one more predicate.
    pub fn and(self, expr: Expr) -> Self {
        Filter(self.0.and_also(expr))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    pub fn into_expr(self) -> Expr {
        self.0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::match_all()
    }
}

impl From<Expr> for Filter {
    fn from(expr: Expr) -> Self {
        Filter(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DslError;

    fn col(name: &str) -> ColumnRef {
        ColumnRef::new("m", name)
    }

    fn row(age: Value) -> impl Fn(&ColumnRef) -> DslResult<Value> {
        move |c: &ColumnRef| match c.column() {
            "age" => Ok(age.clone()),
            other => Err(DslError::from(ExecutorError::store(format!("no column {other}")))),
        }
    }

    fn age_cmp(op: CmpOp, v: i32) -> Expr {
        Expr::Compare {
            left: col("age"),
            op,
            right: Operand::Value(Value::Int(v)),
        }
    }

    #[test]
    fn match_all_renders_nothing() {
        let mut params = ParamList::new();
        assert!(Filter::match_all().is_match_all());
        assert_eq!(Filter::match_all().expr().build(&mut params), "");
        assert_eq!(
            Filter::match_all().expr().evaluate(&row(Value::Null)).unwrap(),
            Some(true)
        );
    }

    #[test]
    fn negated_match_all_matches_nothing() {
        let expr = Expr::not(Filter::match_all().into_expr());
        let mut params = ParamList::new();
        assert!(!expr.is_empty());
        assert!(!Filter::from(expr.clone()).is_match_all());
        assert_eq!(expr.build(&mut params), "1=0");
        assert_eq!(expr.evaluate(&row(Value::Int(10))).unwrap(), Some(false));

        let both = Expr::and(vec![age_cmp(CmpOp::Gte, 5), expr.clone()]);
        assert_eq!(both.build(&mut params), "\"m\".\"age\" >= $1 AND 1=0");
        assert_eq!(both.evaluate(&row(Value::Int(10))).unwrap(), Some(false));

        let twice = Expr::not(expr);
        assert_eq!(twice.build(&mut ParamList::new()), "NOT (1=0)");
        assert_eq!(twice.evaluate(&row(Value::Int(10))).unwrap(), Some(true));
    }

    #[test]
    fn all_of_skips_absent_predicates() {
        let filter = Filter::all_of([None, Some(age_cmp(CmpOp::Gte, 35)), None]);
        let mut params = ParamList::new();
        assert_eq!(filter.expr().build(&mut params), "\"m\".\"age\" >= $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn nested_or_is_parenthesized() {
        let expr = Expr::and(vec![
            age_cmp(CmpOp::Gt, 1),
            Expr::or(vec![age_cmp(CmpOp::Eq, 2), age_cmp(CmpOp::Eq, 3)]),
        ]);
        let mut params = ParamList::new();
        assert_eq!(
            expr.build(&mut params),
            "\"m\".\"age\" > $1 AND (\"m\".\"age\" = $2 OR \"m\".\"age\" = $3)"
        );
    }

    #[test]
    fn comparison_with_null_is_unknown() {
        let expr = age_cmp(CmpOp::Gte, 35);
        assert_eq!(expr.evaluate(&row(Value::Null)).unwrap(), None);
        assert_eq!(Expr::not(expr).evaluate(&row(Value::Null)).unwrap(), None);
    }

    #[test]
    fn and_with_false_beats_unknown() {
        let expr = Expr::and(vec![age_cmp(CmpOp::Gte, 35), Expr::False]);
        assert_eq!(expr.evaluate(&row(Value::Null)).unwrap(), Some(false));
    }

    #[test]
    fn between_is_inclusive() {
        let expr = Expr::Between {
            column: col("age"),
            from: Value::Int(35),
            to: Value::Int(40),
            negated: false,
        };
        assert_eq!(expr.evaluate(&row(Value::Int(35))).unwrap(), Some(true));
        assert_eq!(expr.evaluate(&row(Value::Int(40))).unwrap(), Some(true));
        assert_eq!(expr.evaluate(&row(Value::Int(41))).unwrap(), Some(false));
    }

    #[test]
    fn like_patterns() {
        assert!(like_match("member1", "member%"));
        assert!(like_match("member1", "_ember_"));
        assert!(!like_match("member", "member_"));
        assert!(like_match("50%", "50\\%"));
        assert!(!like_match("501", "50\\%"));
        assert!(like_match("member12", "%mem%2"));
        assert!(!like_match("member12", "%mem%3"));
        assert!(like_match("", "%%"));
        assert!(!like_match("", "_"));
    }

    #[test]
    fn like_with_many_wildcards_stays_fast() {
        let text = "a".repeat(200);
        let pattern = format!("{}b", "%a".repeat(30));
        assert!(!like_match(&text, &pattern));
        assert!(like_match(&text, &"%a".repeat(30)));
    }

    #[test]
    fn scalar_subquery_needs_at_most_one_row() {
        assert_eq!(scalar_subquery_value(Vec::new()).unwrap(), Value::Null);
        assert_eq!(
            scalar_subquery_value(vec![Value::Int(40)]).unwrap(),
            Value::Int(40)
        );
        assert!(scalar_subquery_value(vec![Value::Int(1), Value::Int(2)]).is_err());
    }

    #[test]
    fn multiply_keeps_integer_width() {
        let expr = ArithExpr::new(col("age"), ArithOp::Mul, Value::Int(2));
        assert_eq!(expr.evaluate(&row(Value::Int(21))).unwrap(), Value::Int(42));
        assert_eq!(expr.evaluate(&row(Value::Null)).unwrap(), Value::Null);
        assert!(expr.evaluate(&row(Value::Int(i32::MAX))).is_err());
    }

    #[test]
    fn unknown_column_propagates() {
        let expr = Expr::NullCheck {
            column: col("nope"),
            is_null: true,
        };
        assert!(expr.evaluate(&row(Value::Null)).is_err());
    }
}
