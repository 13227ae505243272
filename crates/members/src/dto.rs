//! Projection targets.

use pgdsl::{FromArgs, FromRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, FromRecord, FromArgs)]
pub struct MemberDto {
    pub username: Option<String>,
    pub age: i32,
}

impl MemberDto {
    pub fn new(username: Option<String>, age: i32) -> Self {
        Self { username, age }
    }
}

/// Same shape as [`MemberDto`] under different field names; binding by
/// field needs `member.username.as_("name")`.
#[derive(Debug, Clone, PartialEq, Serialize, FromRecord, FromArgs)]
pub struct UserDto {
    pub name: Option<String>,
    pub age: i32,
}

/// One search hit: the member plus its (left-joined) team.
#[derive(Debug, Clone, PartialEq, Serialize, FromRecord)]
#[serde(rename_all = "camelCase")]
pub struct MemberTeamDto {
    pub member_id: i64,
    pub username: Option<String>,
    pub age: i32,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
}
