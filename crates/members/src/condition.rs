//! Member search condition and the predicate composer.

use crate::schema::{QMember, QTeam};
use pgdsl::Filter;
use serde::{Deserialize, Serialize};

/// Optional search fields; every field that is set narrows the result.
///
/// Deserializes from camelCase JSON such as
/// `{"ageGoe": 35, "ageLoe": 40, "teamName": "teamB"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberSearchCondition {
    pub username_eq: Option<String>,
    pub age_goe: Option<i32>,
    pub age_loe: Option<i32>,
    pub team_name: Option<String>,
}

impl MemberSearchCondition {
    pub fn username_eq(mut self, username: impl Into<String>) -> Self {
        self.username_eq = Some(username.into());
        self
    }

    pub fn age_goe(mut self, age: i32) -> Self {
        self.age_goe = Some(age);
        self
    }

    pub fn age_loe(mut self, age: i32) -> Self {
        self.age_loe = Some(age);
        self
    }

    pub fn team_name(mut self, name: impl Into<String>) -> Self {
        self.team_name = Some(name.into());
        self
    }
}

/// Empty text counts as unset; whitespace is a value like any other.
fn has_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Build the WHERE filter for `condition`.
///
/// Each set field contributes one predicate and the predicates are ANDed.
/// With nothing set (or no condition at all) the filter matches every row.
/// `team_name` constrains `team`, so the query must join it.
pub fn compose(
    condition: Option<&MemberSearchCondition>,
    member: &QMember,
    team: &QTeam,
) -> Filter {
    let Some(cond) = condition else {
        return Filter::match_all();
    };
    Filter::all_of([
        has_text(&cond.username_eq).map(|v| member.username.eq(v)),
        cond.age_goe.map(|v| member.age.goe(v)),
        cond.age_loe.map(|v| member.age.loe(v)),
        has_text(&cond.team_name).map(|v| team.name.eq(v)),
    ])
}
