//! # pgdsl
//!
//! Type-safe, composable queries for Postgres with typed projections.
//!
//! ## Features
//!
//! - **Typed paths**: columns carry their Rust type, so `member.age.goe("x")` does not compile
//! - **Dynamic predicates**: [`Filter::all_of`] ANDs only the conditions that are present
//! - **Projections**: columns, tuples, aliased fields, positional constructors, entities
//! - **Paging**: offset/limit with NULL ordering, plus [`Query::fetch_count`] and [`Query::fetch_results`]
//! - **Subqueries**: scalar and `IN` subqueries as operands, scalar subqueries as select items
//! - **Bulk writes**: UPDATE/DELETE by predicate, DELETE without WHERE is a no-op by default
//! - **Two executors**: [`PgExecutor`] runs SQL, [`MemoryStore`] evaluates the same plans in memory
//!
//! ## Example
//!
//! ```ignore
//! use pgdsl::prelude::*;
//!
//! let rows: Vec<(Option<String>, i32)> = qb::select((member.username.clone(), member.age.clone()))
//!     .from(&member)
//!     .join(&member.team, &team)
//!     .where_(Filter::all_of([
//!         cond.age_goe.map(|v| member.age.goe(v)),
//!         cond.team_name.as_deref().map(|v| team.name.eq(v)),
//!     ]))
//!     .order_by(member.age.desc())
//!     .limit(10)
//!     .fetch(&exec)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod expr;
pub mod ident;
pub mod item;
pub mod memory;
pub mod order;
pub mod param;
pub mod path;
pub mod prelude;
pub mod projection;
pub mod qb;
pub mod record;
pub mod value;

pub use client::{GenericClient, PgExecutor};
pub use config::DslConfig;
pub use error::{DslError, DslResult, ExecutorError, ProjectionError};
pub use executor::{Executor, QueryResults};
pub use expr::{ArithExpr, CmpOp, Expr, Filter, Operand};
pub use item::{AggFunc, Aggregate, SelectExpr, SelectItem, count_all};
pub use memory::MemoryStore;
pub use order::{Direction, NullsOrder, OrderSpec};
pub use param::ParamList;
pub use path::{
    Aliased, Association, Column, ColumnRef, ColumnType, EntityPath, Numeric, TableRef,
};
pub use projection::{
    FromArgs, Projection, Tuple, TupleKey, bind_arg, check_arity, constructor, fields, optional,
    tuple,
};
pub use qb::{Query, SubQuery, delete, insert_into, select, select_from, update};
pub use record::{FromRecord, Record};
pub use value::{FromValue, Value, ValueKind};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_from_config};

#[cfg(feature = "derive")]
pub use pgdsl_derive::{FromArgs, FromRecord};
