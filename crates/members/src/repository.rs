//! Member store and search queries.

use crate::condition::{MemberSearchCondition, compose};
use crate::dto::MemberTeamDto;
use crate::entity::{Member, NewMember, Team, TeamRef};
use crate::schema::{QMember, QTeam};
use pgdsl::projection::Fields;
use pgdsl::{DslResult, Executor, QueryResults, SelectItem, fields, qb};
use tracing::debug;

/// Members and teams on top of any [`Executor`].
pub struct MemberRepository<E> {
    exec: E,
    member: QMember,
    team: QTeam,
}

impl<E: Executor> MemberRepository<E> {
    pub fn new(exec: E) -> Self {
        Self {
            exec,
            member: QMember::member(),
            team: QTeam::team(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.exec
    }

    pub fn into_executor(self) -> E {
        self.exec
    }

    pub async fn save_team(&self, name: &str) -> DslResult<Team> {
        let team_id = qb::insert_into(&self.team)
            .value(&self.team.name, name)
            .execute_returning(&self.exec, &self.team.team_id)
            .await?;
        Ok(Team {
            team_id,
            name: name.to_string(),
        })
    }

    pub async fn save(&self, member: &NewMember) -> DslResult<Member> {
        let m = &self.member;
        let member_id = qb::insert_into(m)
            .value(&m.username, member.username.clone())
            .value(&m.age, member.age)
            .value(&m.team_id, member.team_id)
            .execute_returning(&self.exec, &m.member_id)
            .await?;
        Ok(Member {
            member_id,
            username: member.username.clone(),
            age: member.age,
            team: member.team_id.map_or(TeamRef::None, TeamRef::Unloaded),
        })
    }

    pub async fn find_by_id(&self, member_id: i64) -> DslResult<Option<Member>> {
        qb::select_from(&self.member)
            .where_(self.member.member_id.eq(member_id))
            .fetch_one(&self.exec)
            .await
    }

    pub async fn find_all(&self) -> DslResult<Vec<Member>> {
        qb::select_from(&self.member)
            .order_by(self.member.member_id.asc())
            .fetch(&self.exec)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> DslResult<Vec<Member>> {
        qb::select_from(&self.member)
            .where_(self.member.username.eq(username))
            .order_by(self.member.member_id.asc())
            .fetch(&self.exec)
            .await
    }

    /// Overwrite every field of one member; returns the number of rows changed.
    pub async fn update(&self, member_id: i64, member: &NewMember) -> DslResult<u64> {
        let m = &self.member;
        let affected = qb::update(m)
            .set_nullable(&m.username, member.username.clone())
            .set(&m.age, member.age)
            .set_nullable(&m.team_id, member.team_id)
            .where_(m.member_id.eq(member_id))
            .execute(&self.exec)
            .await?;
        debug!(member_id, affected, "member update");
        Ok(affected)
    }

    /// Move a member into `team`, or out of any team with `None`.
    pub async fn change_team(&self, member_id: i64, team: Option<&Team>) -> DslResult<u64> {
        let m = &self.member;
        qb::update(m)
            .set_nullable(&m.team_id, team.map(|t| t.team_id))
            .where_(m.member_id.eq(member_id))
            .execute(&self.exec)
            .await
    }

    /// Remove one member; returns the number of rows deleted.
    pub async fn delete(&self, member_id: i64) -> DslResult<u64> {
        qb::delete(&self.member)
            .where_(self.member.member_id.eq(member_id))
            .execute(&self.exec)
            .await
    }

    fn search_projection(&self) -> Fields<MemberTeamDto> {
        let (m, t) = (&self.member, &self.team);
        let items: Vec<SelectItem> = vec![
            m.member_id.item(),
            m.username.item(),
            m.age.item(),
            t.team_id.item(),
            t.name.as_("team_name").item(),
        ];
        fields::<MemberTeamDto>(items)
    }

    /// Members (with their team) matching `condition`, in id order.
    pub async fn search(&self, condition: &MemberSearchCondition) -> DslResult<Vec<MemberTeamDto>> {
        debug!(?condition, "member search");
        let (m, t) = (&self.member, &self.team);
        qb::select(self.search_projection())
            .from(m)
            .left_join(&m.team, t)
            .where_(compose(Some(condition), m, t))
            .order_by(m.member_id.asc())
            .fetch(&self.exec)
            .await
    }

    /// One page of [`search`](Self::search) plus the unpaged total.
    pub async fn search_page(
        &self,
        condition: &MemberSearchCondition,
        offset: u64,
        limit: u64,
    ) -> DslResult<QueryResults<MemberTeamDto>> {
        debug!(?condition, offset, limit, "member search page");
        let (m, t) = (&self.member, &self.team);
        qb::select(self.search_projection())
            .from(m)
            .left_join(&m.team, t)
            .where_(compose(Some(condition), m, t))
            .order_by(m.member_id.asc())
            .offset(offset)
            .limit(limit)
            .fetch_results(&self.exec)
            .await
    }
}
