//! Members and Teams, queried through pgdsl.
//!
//! - [`schema`]: query paths (`QMember`, `QTeam`) and table definitions
//! - [`condition`]: the search condition and its predicate composer
//! - [`dto`]: projection targets
//! - [`repository`]: entity store and search queries
//! - [`seed`]: demo data

pub mod condition;
pub mod dto;
pub mod entity;
pub mod repository;
pub mod schema;
pub mod seed;

pub use condition::{MemberSearchCondition, compose};
pub use dto::{MemberDto, MemberTeamDto, UserDto};
pub use entity::{Member, NewMember, Team, TeamRef};
pub use repository::MemberRepository;
pub use schema::{QMember, QTeam, memory_store};
