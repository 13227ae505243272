//! Member and Team entities.

use pgdsl::FromRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, FromRecord)]
pub struct Team {
    pub team_id: i64,
    pub name: String,
}

/// A member's team as it was read.
///
/// Plain entity queries only see the foreign key; a fetch join materializes
/// the whole team.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "team", rename_all = "lowercase")]
pub enum TeamRef {
    None,
    Unloaded(i64),
    Loaded(Team),
}

impl TeamRef {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TeamRef::Loaded(_))
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            TeamRef::None => None,
            TeamRef::Unloaded(id) => Some(*id),
            TeamRef::Loaded(team) => Some(team.team_id),
        }
    }

    pub fn loaded(&self) -> Option<&Team> {
        match self {
            TeamRef::Loaded(team) => Some(team),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team: TeamRef,
}

/// A member that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
}

impl NewMember {
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            username: Some(username.into()),
            age,
            team_id: None,
        }
    }

    pub fn anonymous(age: i32) -> Self {
        Self {
            username: None,
            age,
            team_id: None,
        }
    }

    pub fn in_team(mut self, team: &Team) -> Self {
        self.team_id = Some(team.team_id);
        self
    }
}
