//! SELECT queries over typed projections.

use crate::error::{DslError, DslResult};
use crate::executor::{Executor, QueryResults};
use crate::expr::{Expr, Filter};
use crate::item::{SelectExpr, SelectItem};
use crate::order::OrderSpec;
use crate::param::ParamList;
use crate::path::{Association, Column, ColumnType, EntityPath, TableRef};
use crate::projection::Projection;
use crate::record::Record;
use crate::value::ValueKind;
use std::fmt;
use std::marker::PhantomData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// One JOIN clause.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

/// Engine-neutral description of a SELECT, handed to an [`Executor`].
#[derive(Clone, Debug, PartialEq)]
pub struct SelectPlan {
    pub items: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<JoinSpec>,
    pub filter: Filter,
    pub group_by: Vec<SelectExpr>,
    pub order: Vec<OrderSpec>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl SelectPlan {
    fn push_from(&self, sql: &mut String, params: &mut ParamList) {
        sql.push_str(" FROM ");
        sql.push_str(&self.from.to_sql());

        for join in &self.joins {
            sql.push_str(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            sql.push_str(&join.table.to_sql());
            let on = join.on.build(params);
            sql.push_str(" ON ");
            sql.push_str(if on.is_empty() { "1=1" } else { &on });
        }

        let where_sql = self.filter.expr().build(params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.group_by.is_empty() {
            let keys: Vec<String> = self.group_by.iter().map(|g| g.build(params)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&keys.join(", "));
        }
    }

    /// Full SELECT with ordering and paging.
    pub fn to_sql(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let sql = self.build(&mut params);
        (sql, params)
    }

    /// Render into an existing parameter list, as a subquery does.
    pub fn build(&self, params: &mut ParamList) -> String {
        let cols: Vec<String> = self.items.iter().map(|i| i.build(params)).collect();
        let mut sql = format!("SELECT {}", cols.join(", "));
        self.push_from(&mut sql, params);

        if !self.order.is_empty() {
            let keys: Vec<String> = self.order.iter().map(|o| o.build(params)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        sql
    }

    /// COUNT over the same FROM/WHERE/GROUP BY, ignoring ordering and paging.
    ///
    /// Grouped queries count groups through a subquery.
    pub fn to_count_sql(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        if self.group_by.is_empty() {
            let mut sql = "SELECT COUNT(*)".to_string();
            self.push_from(&mut sql, &mut params);
            (sql, params)
        } else {
            let mut inner = "SELECT 1".to_string();
            self.push_from(&mut inner, &mut params);
            (format!("SELECT COUNT(*) FROM ({inner}) AS t"), params)
        }
    }
}

/// A typed SELECT query.
///
/// ```ignore
/// let rows: Vec<(Option<String>, i32)> = select((member.username, member.age))
///     .from(&member)
///     .join(&member.team, &team)
///     .where_(team.name.eq("teamB"))
///     .order_by(member.age.desc())
///     .offset(1)
///     .limit(2)
///     .fetch(&exec)
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct Query<P> {
    projection: P,
    from: Option<TableRef>,
    joins: Vec<JoinSpec>,
    // Association name and owner alias per join, when fetch-joined.
    fetch: Vec<Option<(String, String)>>,
    fetch_items: Vec<SelectItem>,
    filter: Filter,
    group_by: Vec<SelectExpr>,
    order: Vec<OrderSpec>,
    offset: u64,
    limit: Option<u64>,
}

impl<P: Projection> Query<P> {
    pub(crate) fn new(projection: P) -> Self {
        Self {
            projection,
            from: None,
            joins: Vec::new(),
            fetch: Vec::new(),
            fetch_items: Vec::new(),
            filter: Filter::match_all(),
            group_by: Vec::new(),
            order: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    pub fn from<E: EntityPath>(mut self, entity: &E) -> Self {
        self.from = Some(entity.table().clone());
        self
    }

    // ==================== JOIN ====================

    fn push_join(mut self, kind: JoinKind, table: &TableRef, on: Expr) -> Self {
        self.joins.push(JoinSpec {
            kind,
            table: table.clone(),
            on,
        });
        self.fetch.push(None);
        self
    }

    /// INNER JOIN along an association.
    pub fn join<E: EntityPath>(self, assoc: &Association, target: &E) -> Self {
        let on = assoc.join_condition(target.table());
        self.push_join(JoinKind::Inner, target.table(), on)
            .remember_association(assoc)
    }

    /// LEFT JOIN along an association.
    pub fn left_join<E: EntityPath>(self, assoc: &Association, target: &E) -> Self {
        let on = assoc.join_condition(target.table());
        self.push_join(JoinKind::Left, target.table(), on)
            .remember_association(assoc)
    }

    /// INNER JOIN an unrelated table; supply the condition with [`Query::on`].
    pub fn join_on<E: EntityPath>(self, target: &E) -> Self {
        self.push_join(JoinKind::Inner, target.table(), Expr::and(Vec::new()))
    }

    /// LEFT JOIN an unrelated table; supply the condition with [`Query::on`].
    pub fn left_join_on<E: EntityPath>(self, target: &E) -> Self {
        self.push_join(JoinKind::Left, target.table(), Expr::and(Vec::new()))
    }

    fn remember_association(mut self, assoc: &Association) -> Self {
        if let Some(slot) = self.fetch.last_mut() {
            *slot = Some((assoc.owner_alias().to_string(), assoc.name().to_string()));
        }
        self
    }

    /// AND an extra condition into the most recent join's ON clause.
    ///
    /// On a LEFT JOIN this filters the joined side only; unmatched rows are kept.
    pub fn on(mut self, expr: Expr) -> Self {
        if let Some(join) = self.joins.last_mut() {
            let on = std::mem::replace(&mut join.on, Expr::True);
            join.on = on.and_also(expr);
        }
        self
    }

    /// Load the most recent association join's entity alongside the owner.
    ///
    /// The target's columns are appended after the projection's own columns,
    /// labelled `owner.association.column`, so an entity projection of the
    /// owner can decode the associated entity in the same row.
    pub fn fetch_join<E: EntityPath>(mut self, target: &E) -> Self {
        if let Some(Some((owner, name))) = self.fetch.last() {
            let prefix = format!("{owner}.{name}");
            for item in target.columns() {
                let label = format!("{prefix}.{}", item.label());
                self.fetch_items.push(item.with_alias(&label));
            }
        }
        self
    }

    // ==================== WHERE ====================

    /// AND a condition into WHERE. A match-all filter adds nothing.
    pub fn where_(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_match_all() {
            self.filter = self.filter.and(filter.into_expr());
        }
        self
    }

    pub fn and_where(self, expr: Expr) -> Self {
        self.where_(expr)
    }

    /// AND every present condition; `None`s are ignored.
    pub fn where_all(self, conditions: impl IntoIterator<Item = Option<Expr>>) -> Self {
        self.where_(Filter::all_of(conditions))
    }

    // ==================== Grouping & Ordering ====================

    pub fn group_by<T: ColumnType>(mut self, column: &Column<T>) -> Self {
        self.group_by
            .push(SelectExpr::Column(column.column_ref().clone()));
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order.push(spec);
        self
    }

    // ==================== Paging ====================

    /// Skip the first `n` rows.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = n;
        self
    }

    /// Return at most `n` rows.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    // ==================== Build ====================

    /// Resolve the query into an executable plan.
    pub fn plan(&self) -> DslResult<SelectPlan> {
        let from = self
            .from
            .clone()
            .ok_or_else(|| DslError::validation("SELECT requires a FROM entity"))?;
        let mut items = self.projection.select_items();
        if items.is_empty() {
            return Err(DslError::validation("SELECT requires at least one column"));
        }
        items.extend(self.fetch_items.iter().cloned());
        Ok(SelectPlan {
            items,
            from,
            joins: self.joins.clone(),
            filter: self.filter.clone(),
            group_by: self.group_by.clone(),
            order: self.order.clone(),
            offset: self.offset,
            limit: self.limit,
        })
    }

    /// Rendered SQL for debugging; validation errors render as an empty string.
    pub fn to_sql(&self) -> String {
        self.plan().map(|p| p.to_sql().0).unwrap_or_default()
    }

    /// Use this query as a subquery operand or select item.
    ///
    /// The query must select exactly one column and should use its own alias
    /// (`QMember::new("memberSub")`) so it does not shadow the outer query.
    pub fn subquery(&self) -> DslResult<SubQuery<P::Output>> {
        SubQuery::new(self.plan()?)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    fn decode(&self, record: &Record) -> DslResult<P::Output> {
        let row = if self.fetch_items.is_empty() {
            record.slice(0, self.projection.width())
        } else {
            record.clone()
        };
        Ok(self.projection.project(&row)?)
    }

    // ==================== Fetch ====================

    /// All matching rows.
    pub async fn fetch<E: Executor>(&self, exec: &E) -> DslResult<Vec<P::Output>> {
        let plan = self.plan()?;
        let records = exec.fetch_records(&plan).await?;
        records.iter().map(|r| self.decode(r)).collect()
    }

    /// At most one row; more than one is [`DslError::NonUnique`].
    pub async fn fetch_one<E: Executor>(&self, exec: &E) -> DslResult<Option<P::Output>> {
        let plan = self.plan()?;
        let records = exec.fetch_records(&plan).await?;
        match records.as_slice() {
            [] => Ok(None),
            [record] => self.decode(record).map(Some),
            many => Err(DslError::NonUnique(many.len())),
        }
    }

    /// The first row (`LIMIT 1`), if any.
    pub async fn fetch_first<E: Executor>(&self, exec: &E) -> DslResult<Option<P::Output>> {
        let mut plan = self.plan()?;
        plan.limit = Some(1);
        let records = exec.fetch_records(&plan).await?;
        records.first().map(|r| self.decode(r)).transpose()
    }

    /// Number of matching rows (or groups), ignoring offset and limit.
    pub async fn fetch_count<E: Executor>(&self, exec: &E) -> DslResult<u64> {
        let plan = self.plan()?;
        exec.fetch_count(&plan).await
    }

    /// One page of rows plus the unpaged total.
    pub async fn fetch_results<E: Executor>(
        &self,
        exec: &E,
    ) -> DslResult<QueryResults<P::Output>> {
        let plan = self.plan()?;
        let total = exec.fetch_count(&plan).await?;
        let results = if total == 0 {
            Vec::new()
        } else {
            let records = exec.fetch_records(&plan).await?;
            records
                .iter()
                .map(|r| self.decode(r))
                .collect::<DslResult<Vec<_>>>()?
        };
        Ok(QueryResults {
            total,
            offset: self.offset,
            limit: self.limit,
            results,
        })
    }
}

/// A single-column query embedded in another query.
///
/// `T` is the subquery's output type. Build one with [`Query::subquery`] and
/// pass it to `Column::eq_sub`, `goe_sub`, `in_sub` and friends, or select it
/// as a scalar column.
pub struct SubQuery<T> {
    plan: SelectPlan,
    kind: ValueKind,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for SubQuery<T> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            kind: self.kind,
            _ty: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SubQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubQuery").field("plan", &self.plan).finish()
    }
}

impl<T> SubQuery<T> {
    fn new(plan: SelectPlan) -> DslResult<Self> {
        let kind = match plan.items.as_slice() {
            [item] => item.kind(),
            items => {
                return Err(DslError::validation(format!(
                    "subquery must select exactly one column, found {}",
                    items.len()
                )));
            }
        };
        Ok(Self {
            plan,
            kind,
            _ty: PhantomData,
        })
    }

    pub fn plan(&self) -> &SelectPlan {
        &self.plan
    }

    pub(crate) fn boxed_plan(&self) -> Box<SelectPlan> {
        Box::new(self.plan.clone())
    }

    /// The subquery as a select item, labelled by its key unless aliased.
    pub fn item(&self) -> SelectItem {
        SelectItem::new(SelectExpr::Subquery(self.boxed_plan()), self.kind)
    }

    /// Select item with an output label, for `fields` projections.
    pub fn as_(&self, alias: &str) -> SelectItem {
        self.item().with_alias(alias)
    }
}
