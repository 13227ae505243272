//! Common imports for building and running queries.
//!
//! ```ignore
//! use pgdsl::prelude::*;
//! ```

pub use crate::qb;
pub use crate::{
    Association, Column, DslError, DslResult, EntityPath, Executor, Expr, Filter, FromArgs,
    FromRecord, MemoryStore, PgExecutor, Projection, ProjectionError, QueryResults, Record,
    TableRef, Value, constructor, fields, optional, tuple,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_from_config};
