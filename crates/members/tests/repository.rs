//! Repository round trips on the in-memory store.

mod common;

use members::seed::{DEMO_MEMBERS, seed_demo_data};
use members::{MemberRepository, MemberSearchCondition, NewMember, TeamRef, memory_store};

#[tokio::test]
async fn save_then_find() {
    let repo = MemberRepository::new(memory_store().unwrap());
    let saved = repo.save(&NewMember::new("member1", 10)).await.unwrap();

    let found = repo.find_by_id(saved.member_id).await.unwrap();
    assert_eq!(found, Some(saved.clone()));
    assert_eq!(repo.find_all().await.unwrap(), vec![saved.clone()]);
    assert_eq!(
        repo.find_by_username("member1").await.unwrap(),
        vec![saved]
    );
    assert!(repo.find_by_id(999).await.unwrap().is_none());
}

#[tokio::test]
async fn saved_member_references_team() {
    let repo = MemberRepository::new(memory_store().unwrap());
    let team = repo.save_team("teamA").await.unwrap();
    let saved = repo
        .save(&NewMember::new("member1", 10).in_team(&team))
        .await
        .unwrap();
    assert_eq!(saved.team, TeamRef::Unloaded(team.team_id));
}

#[tokio::test]
async fn update_overwrites_fields() {
    let f = common::fixture().await;
    let member1 = f.repo.find_by_username("member1").await.unwrap().remove(0);

    let changed = NewMember::new("renamed", 11).in_team(&f.team_b);
    assert_eq!(f.repo.update(member1.member_id, &changed).await.unwrap(), 1);
    let found = f.repo.find_by_id(member1.member_id).await.unwrap().unwrap();
    assert_eq!(found.username.as_deref(), Some("renamed"));
    assert_eq!(found.age, 11);
    assert_eq!(found.team, TeamRef::Unloaded(f.team_b.team_id));

    // None clears the nullable columns.
    let cleared = NewMember::anonymous(12);
    f.repo.update(member1.member_id, &cleared).await.unwrap();
    let found = f.repo.find_by_id(member1.member_id).await.unwrap().unwrap();
    assert_eq!(found.username, None);
    assert_eq!(found.team, TeamRef::None);

    // Other rows are untouched.
    let member2 = f.repo.find_by_username("member2").await.unwrap();
    assert_eq!(member2[0].age, 20);
    assert_eq!(member2[0].team, TeamRef::Unloaded(f.team_a.team_id));
}

#[tokio::test]
async fn update_of_missing_member_changes_nothing() {
    let f = common::fixture().await;
    let affected = f.repo.update(999, &NewMember::new("ghost", 1)).await.unwrap();
    assert_eq!(affected, 0);
    assert_eq!(f.repo.find_all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn change_team_moves_member() {
    let f = common::fixture().await;
    let member1 = f.repo.find_by_username("member1").await.unwrap().remove(0);

    f.repo
        .change_team(member1.member_id, Some(&f.team_b))
        .await
        .unwrap();
    let cond = MemberSearchCondition::default().team_name("teamB");
    let names: Vec<_> = f
        .repo
        .search(&cond)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|h| h.username)
        .collect();
    assert_eq!(names, vec!["member1", "member3", "member4"]);

    f.repo.change_team(member1.member_id, None).await.unwrap();
    let found = f.repo.find_by_id(member1.member_id).await.unwrap().unwrap();
    assert_eq!(found.team, TeamRef::None);
}

#[tokio::test]
async fn delete_by_id() {
    let f = common::fixture().await;
    let all = f.repo.find_all().await.unwrap();
    assert_eq!(f.repo.delete(all[0].member_id).await.unwrap(), 1);
    assert_eq!(f.repo.delete(all[0].member_id).await.unwrap(), 0);
    assert_eq!(f.repo.find_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn search_over_seeded_data() {
    let repo = MemberRepository::new(memory_store().unwrap());
    seed_demo_data(&repo).await.unwrap();
    assert_eq!(
        repo.executor().row_count("member").unwrap(),
        DEMO_MEMBERS as usize
    );

    let cond = MemberSearchCondition::default()
        .age_goe(35)
        .age_loe(40)
        .team_name("teamB");
    let hits = repo.search(&cond).await.unwrap();
    let names: Vec<_> = hits.iter().filter_map(|h| h.username.as_deref()).collect();
    assert_eq!(names, vec!["member35", "member37", "member39"]);

    let page = repo
        .search_page(&MemberSearchCondition::default().team_name("teamA"), 10, 5)
        .await
        .unwrap();
    assert_eq!(page.total, 50);
    assert_eq!(page.results.len(), 5);
    assert_eq!(page.results[0].username.as_deref(), Some("member20"));
}
