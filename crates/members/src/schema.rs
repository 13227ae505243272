//! Query paths and table definitions for `member` and `team`.

use crate::entity::{Member, Team, TeamRef};
use pgdsl::{
    Association, Column, DslResult, EntityPath, FromRecord, MemoryStore, Projection,
    ProjectionError, Record, SelectItem, TableRef,
};

/// PostgreSQL DDL for both tables.
pub const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS team (
    team_id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS member (
    member_id BIGSERIAL PRIMARY KEY,
    username TEXT,
    age INTEGER NOT NULL,
    team_id BIGINT REFERENCES team (team_id)
);";

/// Drops both tables, member first.
pub const DROP_SQL: &str = "DROP TABLE IF EXISTS member; DROP TABLE IF EXISTS team;";

/// An empty in-memory store with the `member` and `team` tables.
pub fn memory_store() -> DslResult<MemoryStore> {
    let store = MemoryStore::new();
    store.create_table("team", "team_id", &["team_id", "name"])?;
    store.create_table(
        "member",
        "member_id",
        &["member_id", "username", "age", "team_id"],
    )?;
    Ok(store)
}

/// Path over the `team` table.
#[derive(Debug, Clone)]
pub struct QTeam {
    table: TableRef,
    pub team_id: Column<i64>,
    pub name: Column<String>,
}

impl QTeam {
    pub fn new(alias: &str) -> Self {
        let table = TableRef::new("team", alias);
        Self {
            team_id: Column::new(&table, "team_id"),
            name: Column::new(&table, "name"),
            table,
        }
    }

    /// The default `team` alias.
    pub fn team() -> Self {
        Self::new("team")
    }
}

impl EntityPath for QTeam {
    type Entity = Team;

    fn table(&self) -> &TableRef {
        &self.table
    }

    fn columns(&self) -> Vec<SelectItem> {
        vec![self.team_id.item(), self.name.item()]
    }

    fn decode(&self, record: &Record) -> Result<Team, ProjectionError> {
        Team::from_record(record)
    }
}

impl Projection for QTeam {
    type Output = Team;

    fn select_items(&self) -> Vec<SelectItem> {
        self.entity_items()
    }

    fn project(&self, record: &Record) -> Result<Team, ProjectionError> {
        self.entity_project(record)
    }
}

/// Path over the `member` table.
#[derive(Debug, Clone)]
pub struct QMember {
    table: TableRef,
    pub member_id: Column<i64>,
    pub username: Column<Option<String>>,
    pub age: Column<i32>,
    pub team_id: Column<Option<i64>>,
    /// `member.team_id -> team.team_id`
    pub team: Association,
}

impl QMember {
    pub fn new(alias: &str) -> Self {
        let table = TableRef::new("member", alias);
        Self {
            member_id: Column::new(&table, "member_id"),
            username: Column::new(&table, "username"),
            age: Column::new(&table, "age"),
            team_id: Column::new(&table, "team_id"),
            team: Association::new(&table, "team", "team_id", "team_id"),
            table,
        }
    }

    /// The default `member` alias.
    pub fn member() -> Self {
        Self::new("member")
    }
}

impl EntityPath for QMember {
    type Entity = Member;

    fn table(&self) -> &TableRef {
        &self.table
    }

    fn columns(&self) -> Vec<SelectItem> {
        vec![
            self.member_id.item(),
            self.username.item(),
            self.age.item(),
            self.team_id.item(),
        ]
    }

    fn decode(&self, record: &Record) -> Result<Member, ProjectionError> {
        let team_id: Option<i64> = record.get("team_id")?;
        let name = self.team.name();
        let team = if record.has_scope(name) {
            let scoped = record.scope(name);
            if scoped.is_all_null() {
                TeamRef::None
            } else {
                TeamRef::Loaded(Team::from_record(&scoped)?)
            }
        } else {
            team_id.map_or(TeamRef::None, TeamRef::Unloaded)
        };
        Ok(Member {
            member_id: record.get("member_id")?,
            username: record.get("username")?,
            age: record.get("age")?,
            team,
        })
    }
}

impl Projection for QMember {
    type Output = Member;

    fn select_items(&self) -> Vec<SelectItem> {
        self.entity_items()
    }

    fn project(&self, record: &Record) -> Result<Member, ProjectionError> {
        self.entity_project(record)
    }
}
