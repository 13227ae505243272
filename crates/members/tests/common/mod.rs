#![allow(dead_code)]

use members::{MemberRepository, NewMember, QMember, QTeam, Team, memory_store};
use pgdsl::MemoryStore;

pub struct Fixture {
    pub repo: MemberRepository<MemoryStore>,
    pub m: QMember,
    pub t: QTeam,
    pub team_a: Team,
    pub team_b: Team,
}

impl Fixture {
    pub fn exec(&self) -> &MemoryStore {
        self.repo.executor()
    }

    pub async fn add(&self, member: NewMember) {
        self.repo.save(&member).await.unwrap();
    }
}

/// member1..member4, ages 10..40; 1-2 in teamA, 3-4 in teamB.
pub async fn fixture() -> Fixture {
    let repo = MemberRepository::new(memory_store().unwrap());
    let team_a = repo.save_team("teamA").await.unwrap();
    let team_b = repo.save_team("teamB").await.unwrap();
    for (name, age, team) in [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ] {
        repo.save(&NewMember::new(name, age).in_team(team))
            .await
            .unwrap();
    }
    Fixture {
        repo,
        m: QMember::member(),
        t: QTeam::team(),
        team_a,
        team_b,
    }
}
