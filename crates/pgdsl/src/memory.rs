//! In-process executor.
//!
//! [`MemoryStore`] evaluates the same plans [`PgExecutor`](crate::PgExecutor)
//! renders to SQL: joins with ON conditions, three-valued WHERE filtering,
//! grouping with aggregates, ordering with NULL placement, paging, and bulk
//! UPDATE / DELETE / INSERT. It backs unit and integration tests that must run
//! without a database.
//!
//! Subqueries are uncorrelated here: each one runs once against the tables
//! as they are when the statement starts, and may not refer to outer aliases.

use crate::error::{DslResult, ExecutorError};
use crate::executor::Executor;
use crate::expr::{Expr, scalar_subquery_value};
use crate::item::{AggFunc, SelectExpr};
use crate::order::{Direction, OrderSpec};
use crate::path::{ColumnRef, TableRef};
use crate::qb::{DeletePlan, InsertPlan, JoinKind, SelectPlan, SetValue, UpdatePlan};
use crate::record::Record;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    key: usize,
    next_id: i64,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn column_index(&self, name: &str) -> DslResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ExecutorError::store(format!("unknown column '{name}'")).into())
    }
}

/// One candidate result row: a row index per source table (`None` for the
/// unmatched side of a LEFT JOIN).
type Joined = Vec<Option<usize>>;

/// Tables held in memory behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DslResult<MutexGuard<'_, HashMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| ExecutorError::store("mutex poisoned").into())
    }

    /// Create (or replace) a table. `key` is the generated identity column and
    /// must be one of `columns`.
    pub fn create_table(&self, name: &str, key: &str, columns: &[&str]) -> DslResult<()> {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let key = columns
            .iter()
            .position(|c| c == key)
            .ok_or_else(|| ExecutorError::store(format!("key column '{key}' not in {name}")))?;
        self.lock()?.insert(
            name.to_string(),
            Table {
                columns,
                key,
                next_id: 1,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> DslResult<usize> {
        let tables = self.lock()?;
        Ok(table_ref(&tables, table)?.rows.len())
    }

    fn select(&self, plan: &SelectPlan) -> DslResult<Vec<Record>> {
        let tables = self.lock()?;
        select_rows(&tables, plan)
    }

    fn count(&self, plan: &SelectPlan) -> DslResult<u64> {
        let tables = self.lock()?;
        let plan = resolve_plan(&tables, plan)?;
        let plan = &plan;
        let sources = Sources::resolve(&tables, plan)?;
        let rows = sources.matching_rows(plan)?;
        let count = if plan.group_by.is_empty() {
            rows.len()
        } else {
            sources.group(plan, rows)?.len()
        };
        trace!(target: "pgdsl.memory", table = plan.from.name(), count, "count");
        Ok(count as u64)
    }

    fn update(&self, plan: &UpdatePlan) -> DslResult<u64> {
        let mut tables = self.lock()?;
        let filter = resolve_expr(&tables, plan.filter.expr())?;
        let table = table_mut(&mut tables, plan.table.name())?;
        let targets: Vec<(usize, &SetValue)> = plan
            .sets
            .iter()
            .map(|(column, value)| Ok((table.column_index(column)?, value)))
            .collect::<DslResult<_>>()?;

        let alias = plan.table.alias();
        let mut affected = 0u64;
        for idx in 0..table.rows.len() {
            let row = &table.rows[idx];
            if !row_matches(table, alias, row, &filter)? {
                continue;
            }
            // Right-hand sides see the row as it was before this statement.
            let lookup = |c: &ColumnRef| single_lookup(table, alias, row, c);
            let new_values = targets
                .iter()
                .map(|(col, value)| {
                    let v = match value {
                        SetValue::Value(v) => v.clone(),
                        SetValue::Expr(e) => e.evaluate(&lookup)?,
                    };
                    Ok((*col, v))
                })
                .collect::<DslResult<Vec<_>>>()?;
            for (col, v) in new_values {
                table.rows[idx][col] = v;
            }
            affected += 1;
        }
        trace!(target: "pgdsl.memory", table = plan.table.name(), affected, "update");
        Ok(affected)
    }

    fn delete(&self, plan: &DeletePlan) -> DslResult<u64> {
        let mut tables = self.lock()?;
        let filter = resolve_expr(&tables, plan.filter.expr())?;
        let table = table_mut(&mut tables, plan.table.name())?;
        let alias = plan.table.alias();
        let mut keep = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            keep.push(!row_matches(table, alias, row, &filter)?);
        }
        let before = table.rows.len();
        let mut flags = keep.into_iter();
        table.rows.retain(|_| flags.next().unwrap_or(true));
        let removed = (before - table.rows.len()) as u64;
        trace!(target: "pgdsl.memory", table = plan.table.name(), removed, "delete");
        Ok(removed)
    }

    fn insert(&self, plan: &InsertPlan) -> DslResult<Value> {
        let mut tables = self.lock()?;
        let table = table_mut(&mut tables, plan.table.name())?;
        let mut row = vec![Value::Null; table.columns.len()];
        for (column, value) in &plan.values {
            row[table.column_index(column)?] = value.clone();
        }
        match row[table.key].clone() {
            Value::Null => {
                row[table.key] = Value::BigInt(table.next_id);
                table.next_id += 1;
            }
            Value::Int(id) => table.next_id = table.next_id.max(i64::from(id) + 1),
            Value::BigInt(id) => table.next_id = table.next_id.max(id + 1),
            _ => {}
        }
        let returning = table.column_index(&plan.returning)?;
        let generated = row[returning].clone();
        table.rows.push(row);
        trace!(target: "pgdsl.memory", table = plan.table.name(), id = %generated, "insert");
        Ok(generated)
    }
}

impl Executor for MemoryStore {
    async fn fetch_records(&self, plan: &SelectPlan) -> DslResult<Vec<Record>> {
        self.select(plan)
    }

    async fn fetch_count(&self, plan: &SelectPlan) -> DslResult<u64> {
        self.count(plan)
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> DslResult<u64> {
        self.update(plan)
    }

    async fn execute_delete(&self, plan: &DeletePlan) -> DslResult<u64> {
        self.delete(plan)
    }

    async fn execute_insert(&self, plan: &InsertPlan) -> DslResult<Value> {
        self.insert(plan)
    }
}

fn select_rows(tables: &HashMap<String, Table>, plan: &SelectPlan) -> DslResult<Vec<Record>> {
    let plan = resolve_plan(tables, plan)?;
    let plan = &plan;
    let sources = Sources::resolve(tables, plan)?;
    let rows = sources.matching_rows(plan)?;
    let mut groups = sources.group(plan, rows)?;

    // Sort keys are computed up front so comparison cannot fail.
    let mut keyed: Vec<(Vec<Value>, Vec<Joined>)> = groups
        .drain(..)
        .map(|g| -> DslResult<(Vec<Value>, Vec<Joined>)> {
            let keys = plan
                .order
                .iter()
                .map(|o| sources.eval_select(o.target(), &g))
                .collect::<DslResult<Vec<_>>>()?;
            Ok((keys, g))
        })
        .collect::<DslResult<_>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_keys(&plan.order, a, b));

    let offset = usize::try_from(plan.offset).unwrap_or(usize::MAX);
    let limit = plan
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

    let mut records = Vec::new();
    for (_, group) in keyed.into_iter().skip(offset).take(limit) {
        let mut record = Record::new();
        for item in &plan.items {
            record.push(item.label(), sources.eval_select(item.expr(), &group)?);
        }
        records.push(record);
    }
    trace!(target: "pgdsl.memory", table = plan.from.name(), rows = records.len(), "select");
    Ok(records)
}

/// First column of every row a subquery returns.
fn subquery_column(tables: &HashMap<String, Table>, plan: &SelectPlan) -> DslResult<Vec<Value>> {
    Ok(select_rows(tables, plan)?
        .into_iter()
        .filter_map(|record| record.into_values().into_iter().next())
        .collect())
}

fn resolve_expr(tables: &HashMap<String, Table>, expr: &Expr) -> DslResult<Expr> {
    expr.resolve_subqueries(&mut |plan: &SelectPlan| subquery_column(tables, plan))
}

/// The plan with subqueries in WHERE and ON replaced by their values.
fn resolve_plan(tables: &HashMap<String, Table>, plan: &SelectPlan) -> DslResult<SelectPlan> {
    let mut resolved = plan.clone();
    resolved.filter = resolve_expr(tables, plan.filter.expr())?.into();
    for join in &mut resolved.joins {
        join.on = resolve_expr(tables, &join.on)?;
    }
    Ok(resolved)
}

fn table_ref<'a>(tables: &'a HashMap<String, Table>, name: &str) -> DslResult<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| ExecutorError::store(format!("unknown table '{name}'")).into())
}

fn table_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> DslResult<&'a mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| ExecutorError::store(format!("unknown table '{name}'")).into())
}

fn single_lookup(table: &Table, alias: &str, row: &[Value], col: &ColumnRef) -> DslResult<Value> {
    if col.table_alias() != alias {
        return Err(ExecutorError::store(format!("unknown alias '{}'", col.table_alias())).into());
    }
    Ok(row[table.column_index(col.column())?].clone())
}

fn row_matches(table: &Table, alias: &str, row: &[Value], filter: &Expr) -> DslResult<bool> {
    let lookup = |c: &ColumnRef| single_lookup(table, alias, row, c);
    Ok(filter.evaluate(&lookup)? == Some(true))
}

/// The tables of one SELECT, in FROM-then-JOIN order.
struct Sources<'a> {
    tables: Vec<(&'a TableRef, &'a Table)>,
    // Every table, for scalar subqueries in the select list.
    all: &'a HashMap<String, Table>,
}

impl<'a> Sources<'a> {
    fn resolve(tables: &'a HashMap<String, Table>, plan: &'a SelectPlan) -> DslResult<Self> {
        let mut resolved = vec![(&plan.from, table_ref(tables, plan.from.name())?)];
        for join in &plan.joins {
            resolved.push((&join.table, table_ref(tables, join.table.name())?));
        }
        Ok(Self {
            tables: resolved,
            all: tables,
        })
    }

    fn lookup(&self, row: &[Option<usize>], col: &ColumnRef) -> DslResult<Value> {
        let pos = self
            .tables
            .iter()
            .position(|(t, _)| t.alias() == col.table_alias())
            .filter(|pos| *pos < row.len())
            .ok_or_else(|| ExecutorError::store(format!("unknown alias '{}'", col.table_alias())))?;
        let table = self.tables[pos].1;
        let idx = table.column_index(col.column())?;
        Ok(match row[pos] {
            Some(r) => table.rows[r][idx].clone(),
            None => Value::Null,
        })
    }

    fn test(&self, row: &[Option<usize>], expr: &Expr) -> DslResult<bool> {
        let lookup = |c: &ColumnRef| self.lookup(row, c);
        Ok(expr.evaluate(&lookup)? == Some(true))
    }

    /// FROM x JOIN ... WHERE ...
    fn matching_rows(&self, plan: &SelectPlan) -> DslResult<Vec<Joined>> {
        let mut rows: Vec<Joined> = (0..self.tables[0].1.rows.len())
            .map(|r| vec![Some(r)])
            .collect();

        for (j, join) in plan.joins.iter().enumerate() {
            let target = self.tables[j + 1].1;
            let mut next = Vec::new();
            for row in rows {
                let mut matched = false;
                for t in 0..target.rows.len() {
                    let mut candidate = row.clone();
                    candidate.push(Some(t));
                    if self.test(&candidate, &join.on)? {
                        next.push(candidate);
                        matched = true;
                    }
                }
                if !matched && join.kind == JoinKind::Left {
                    let mut candidate = row;
                    candidate.push(None);
                    next.push(candidate);
                }
            }
            rows = next;
        }

        let filter = plan.filter.expr();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if self.test(&row, filter)? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    /// Split rows into output groups. Without aggregation every row is its own group.
    fn group(&self, plan: &SelectPlan, rows: Vec<Joined>) -> DslResult<Vec<Vec<Joined>>> {
        let aggregated = !plan.group_by.is_empty()
            || plan.items.iter().any(|i| i.expr().is_aggregate());
        if !aggregated {
            return Ok(rows.into_iter().map(|r| vec![r]).collect());
        }
        if plan.group_by.is_empty() {
            return Ok(vec![rows]);
        }

        let mut groups: Vec<(Vec<Value>, Vec<Joined>)> = Vec::new();
        for row in rows {
            let key = plan
                .group_by
                .iter()
                .map(|g| self.eval_select(g, std::slice::from_ref(&row)))
                .collect::<DslResult<Vec<_>>>()?;
            let existing = groups.iter_mut().find(|(k, _)| {
                k.iter().zip(&key).all(|(a, b)| a.group_eq(b))
            });
            match existing {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    /// Value of a select expression over one group.
    fn eval_select(&self, expr: &SelectExpr, group: &[Joined]) -> DslResult<Value> {
        match expr {
            SelectExpr::Column(col) => match group.first() {
                Some(row) => self.lookup(row, col),
                None => Ok(Value::Null),
            },
            SelectExpr::CountAll => Ok(Value::BigInt(group.len() as i64)),
            SelectExpr::Aggregate { func, column, .. } => {
                let values = group
                    .iter()
                    .map(|row| self.lookup(row, column))
                    .filter(|v| !matches!(v, Ok(Value::Null)))
                    .collect::<DslResult<Vec<_>>>()?;
                aggregate(*func, &values)
            }
            SelectExpr::Subquery(plan) => {
                scalar_subquery_value(subquery_column(self.all, plan)?)
            }
        }
    }
}

/// Fold non-NULL values; NULL over an empty input except for COUNT.
fn aggregate(func: AggFunc, values: &[Value]) -> DslResult<Value> {
    if func == AggFunc::Count {
        return Ok(Value::BigInt(values.len() as i64));
    }
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let non_numeric = || ExecutorError::store(format!("{func:?} over non-numeric values"));
    match func {
        AggFunc::Count => Ok(Value::BigInt(values.len() as i64)),
        AggFunc::Sum => {
            if values.iter().any(|v| matches!(v, Value::Double(_))) {
                let mut sum = 0.0;
                for v in values {
                    sum += as_f64(v).ok_or_else(non_numeric)?;
                }
                Ok(Value::Double(sum))
            } else {
                let mut sum: i64 = 0;
                for v in values {
                    let n = match v {
                        Value::Int(i) => i64::from(*i),
                        Value::BigInt(i) => *i,
                        _ => return Err(non_numeric().into()),
                    };
                    sum = sum
                        .checked_add(n)
                        .ok_or_else(|| ExecutorError::store("bigint out of range"))?;
                }
                Ok(Value::BigInt(sum))
            }
        }
        AggFunc::Avg => {
            let mut sum = 0.0;
            for v in values {
                sum += as_f64(v).ok_or_else(non_numeric)?;
            }
            Ok(Value::Double(sum / values.len() as f64))
        }
        AggFunc::Max | AggFunc::Min => {
            let wanted = if func == AggFunc::Max {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let mut best = &values[0];
            for v in &values[1..] {
                if v.sql_cmp(best) == Some(wanted) {
                    best = v;
                }
            }
            Ok(best.clone())
        }
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(f64::from(*i)),
        Value::BigInt(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn compare_keys(order: &[OrderSpec], a: &[Value], b: &[Value]) -> Ordering {
    for ((spec, x), y) in order.iter().zip(a).zip(b) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if spec.nulls_come_first() => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if spec.nulls_come_first() => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = x.sql_cmp(y).unwrap_or(Ordering::Equal);
                match spec.direction() {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_generates_sequential_keys() {
        let store = MemoryStore::new();
        store.create_table("team", "team_id", &["team_id", "name"]).unwrap();
        let plan = |name: &str| InsertPlan {
            table: TableRef::new("team", "t"),
            values: vec![("name".into(), Value::from(name))],
            returning: "team_id".into(),
        };
        assert_eq!(store.insert(&plan("teamA")).unwrap(), Value::BigInt(1));
        assert_eq!(store.insert(&plan("teamB")).unwrap(), Value::BigInt(2));
        assert_eq!(store.row_count("team").unwrap(), 2);
    }

    #[test]
    fn unknown_table_is_a_store_error() {
        let store = MemoryStore::new();
        let err = store.row_count("nope").unwrap_err();
        assert!(err.is_executor());
    }

    #[test]
    fn aggregates_over_empty_input() {
        assert_eq!(aggregate(AggFunc::Count, &[]).unwrap(), Value::BigInt(0));
        assert_eq!(aggregate(AggFunc::Sum, &[]).unwrap(), Value::Null);
        assert_eq!(aggregate(AggFunc::Max, &[]).unwrap(), Value::Null);
    }

    #[test]
    fn aggregates_over_ints() {
        let ages = [Value::Int(10), Value::Int(20), Value::Int(30), Value::Int(40)];
        assert_eq!(aggregate(AggFunc::Sum, &ages).unwrap(), Value::BigInt(100));
        assert_eq!(aggregate(AggFunc::Avg, &ages).unwrap(), Value::Double(25.0));
        assert_eq!(aggregate(AggFunc::Max, &ages).unwrap(), Value::Int(40));
        assert_eq!(aggregate(AggFunc::Min, &ages).unwrap(), Value::Int(10));
    }

    #[test]
    fn nulls_placement_follows_postgres_defaults() {
        let col = SelectExpr::Column(ColumnRef::new("m", "username"));
        let asc = [OrderSpec::asc(col.clone())];
        let null = [Value::Null];
        let name = [Value::Text("a".into())];
        assert_eq!(compare_keys(&asc, &null, &name), Ordering::Greater);
        let first = [OrderSpec::asc(col.clone()).nulls_first()];
        assert_eq!(compare_keys(&first, &null, &name), Ordering::Less);
        let desc = [OrderSpec::desc(col)];
        assert_eq!(compare_keys(&desc, &null, &name), Ordering::Less);
    }
}
