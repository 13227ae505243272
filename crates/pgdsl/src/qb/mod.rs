//! Typed query builders.
//!
//! Builders are plain values: composing one never touches the database.
//! Each resolves into a plan (`SelectPlan`, `UpdatePlan`, ...) that an
//! [`Executor`](crate::Executor) either renders to SQL or evaluates in memory.
//!
//! ```ignore
//! use pgdsl::qb;
//!
//! let members = qb::select_from(&member)
//!     .where_(member.age.goe(35))
//!     .order_by(member.age.desc())
//!     .fetch(&exec)
//!     .await?;
//!
//! let affected = qb::update(&member)
//!     .set(&member.username, "non-member")
//!     .where_(member.age.lt(28))
//!     .execute(&exec)
//!     .await?;
//! ```

mod delete;
mod insert;
mod select;
mod update;

pub use delete::{DeletePlan, DeleteQuery};
pub use insert::{InsertPlan, InsertQuery};
pub use select::{JoinKind, JoinSpec, Query, SelectPlan, SubQuery};
pub use update::{SetValue, UpdatePlan, UpdateQuery};

use crate::path::EntityPath;
use crate::projection::Projection;

/// Start a SELECT for `projection`; add the source with `.from(...)`.
pub fn select<P: Projection>(projection: P) -> Query<P> {
    Query::new(projection)
}

/// SELECT a whole entity from its own table.
pub fn select_from<E>(entity: &E) -> Query<&E>
where
    E: EntityPath + Projection,
{
    Query::new(entity).from(entity)
}

/// Start a bulk UPDATE on `entity`'s table.
pub fn update<E: EntityPath>(entity: &E) -> UpdateQuery {
    UpdateQuery::new(entity)
}

/// Start a bulk DELETE on `entity`'s table.
///
/// By default a DELETE without WHERE conditions renders `WHERE 1=0` (no-op).
pub fn delete<E: EntityPath>(entity: &E) -> DeleteQuery {
    DeleteQuery::new(entity)
}

/// Start a single-row INSERT into `entity`'s table.
pub fn insert_into<E: EntityPath>(entity: &E) -> InsertQuery {
    InsertQuery::new(entity)
}
