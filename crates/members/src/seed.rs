//! Demo data: two teams and a hundred members.

use crate::entity::NewMember;
use crate::repository::MemberRepository;
use pgdsl::{DslResult, Executor};
use tracing::info;

pub const DEMO_MEMBERS: i32 = 100;

/// Insert `teamA`, `teamB` and `member0..member99` (age = index), alternating
/// teams starting with `teamA`.
pub async fn seed_demo_data<E: Executor>(repo: &MemberRepository<E>) -> DslResult<()> {
    let team_a = repo.save_team("teamA").await?;
    let team_b = repo.save_team("teamB").await?;
    for i in 0..DEMO_MEMBERS {
        let team = if i % 2 == 0 { &team_a } else { &team_b };
        repo.save(&NewMember::new(format!("member{i}"), i).in_team(team))
            .await?;
    }
    info!(members = DEMO_MEMBERS, "seeded demo data");
    Ok(())
}
