//! Integration tests for the group lifecycle.
//!
//! These tests drive the service end to end against the in-memory adapters
//! and check the matching, authorization and persistence guarantees.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{GroupId, MemberId, Version};
use domain::{
    DomainError, ErrorKind, Group, GroupError, GroupFilters, GroupPage, GroupRepository,
    GroupService, GroupStatus, InMemoryGroupRepository, InMemoryMemberDirectory, Member,
    MemberProfile, RepositoryError, SequentialIdentitySource,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Wraps the in-memory repository, counting writes and optionally failing them.
#[derive(Default)]
struct RecordingRepository {
    inner: InMemoryGroupRepository,
    updates: AtomicUsize,
    fail_updates: AtomicBool,
}

impl RecordingRepository {
    fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroupRepository for RecordingRepository {
    async fn create(&self, group: &Group) -> Result<Version, RepositoryError> {
        self.inner.create(group).await
    }

    async fn get_by_id(&self, group_id: &GroupId) -> Result<Group, RepositoryError> {
        self.inner.get_by_id(group_id).await
    }

    async fn update(&self, group: &Group) -> Result<Version, RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("disk full".into()));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(group).await
    }

    async fn search(&self, filters: &GroupFilters) -> Result<GroupPage, RepositoryError> {
        self.inner.search(filters).await
    }
}

type TestService =
    GroupService<RecordingRepository, InMemoryMemberDirectory, SequentialIdentitySource>;

fn member(id: &str) -> Member {
    Member::new(id, MemberProfile::new(id.to_uppercase(), format!("{id}@example.com")))
}

fn id(s: &str) -> MemberId {
    MemberId::new(s)
}

fn create_service() -> TestService {
    let directory =
        InMemoryMemberDirectory::with_members(["u1", "u2", "u3", "u4", "u5", "u6"].map(member));
    GroupService::new(
        RecordingRepository::default(),
        directory,
        SequentialIdentitySource::new("group"),
    )
}

/// Creates a group owned by `u1` with the given extra members.
async fn group_with_members(service: &TestService, others: &[&str]) -> GroupId {
    let group = service.create_group(&id("u1"), "Secret Santa").await.unwrap();
    for other in others {
        service
            .add_member(group.id(), &id("u1"), &id(other))
            .await
            .unwrap();
    }
    group.id().clone()
}

fn assert_single_cycle(group: &Group) {
    let n = group.member_count();
    let matches = group.matches();
    assert_eq!(matches.len(), n);

    let givers: HashSet<_> = matches.iter().map(|m| &m.giver).collect();
    let receivers: HashSet<_> = matches.iter().map(|m| &m.receiver).collect();
    assert_eq!(givers.len(), n);
    assert_eq!(receivers.len(), n);
    for m in group.members() {
        assert!(givers.contains(&m.id));
        assert!(receivers.contains(&m.id));
    }
    assert!(matches.iter().all(|m| m.giver != m.receiver));

    // Following giver -> receiver from any member visits everyone once.
    let start = &group.members()[0].id;
    let mut current = start;
    for step in 1..=n {
        current = &matches.iter().find(|m| &m.giver == current).unwrap().receiver;
        if step < n {
            assert_ne!(current, start);
        }
    }
    assert_eq!(current, start);
}

mod matching {
    use super::*;

    #[tokio::test]
    async fn every_group_size_produces_a_single_cycle() {
        let all = ["u2", "u3", "u4", "u5", "u6"];
        for extra in 2..=all.len() {
            let service = create_service();
            let group_id = group_with_members(&service, &all[..extra]).await;

            for seed in 0..10 {
                let mut rng = StdRng::seed_from_u64(seed);
                let group = service
                    .generate_matches(&group_id, &id("u1"), &mut rng)
                    .await
                    .unwrap();
                assert_eq!(group.status(), GroupStatus::Matched);
                assert_single_cycle(&group);
            }
        }
    }

    #[tokio::test]
    async fn too_few_members_is_conflict_for_any_requester() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2"]).await;

        for requester in ["u1", "u2", "u5"] {
            let mut rng = StdRng::seed_from_u64(1);
            let err = service
                .generate_matches(&group_id, &id(requester), &mut rng)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert_eq!(
                err.to_string(),
                "group must have at least 3 users to generate matches"
            );
        }
    }

    #[tokio::test]
    async fn regenerating_draws_a_fresh_valid_cycle() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3", "u4"]).await;

        let mut rng = StdRng::seed_from_u64(11);
        let first = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();
        let second = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();

        assert_single_cycle(&first);
        assert_single_cycle(&second);
        assert_eq!(second.version(), first.version().next());
    }

    #[tokio::test]
    async fn each_member_sees_only_their_receiver() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3", "u4"]).await;

        let mut rng = StdRng::seed_from_u64(5);
        let group = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();

        for m in group.matches() {
            let receiver = service.get_member_match(&group_id, &m.giver).await.unwrap();
            assert_eq!(receiver.id, m.receiver);
            assert_eq!(receiver.profile.email, format!("{}@example.com", m.receiver));
        }

        let err = service
            .get_member_match(&group_id, &id("u6"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "match not found for the given user");
    }

    #[tokio::test]
    async fn match_lookup_before_draw_is_conflict() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;

        let err = service
            .get_member_match(&group_id, &id("u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Group(GroupError::MatchNotFound)));
    }
}

mod membership {
    use super::*;

    #[tokio::test]
    async fn adding_twice_leaves_group_unchanged() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2"]).await;
        let before = service.get_group(&group_id).await.unwrap();
        let writes = service.repository().update_count();

        let after = service
            .add_member(&group_id, &id("u1"), &id("u2"))
            .await
            .unwrap();

        assert_eq!(after.members(), before.members());
        assert_eq!(after.updated_at(), before.updated_at());
        assert_eq!(service.repository().update_count(), writes);
    }

    #[tokio::test]
    async fn members_can_join_and_leave_themselves() {
        let service = create_service();
        let group_id = group_with_members(&service, &[]).await;

        let group = service
            .add_member(&group_id, &id("u3"), &id("u3"))
            .await
            .unwrap();
        assert!(group.is_member(&id("u3")));

        let group = service
            .remove_member(&group_id, &id("u3"), &id("u3"))
            .await
            .unwrap();
        assert!(!group.is_member(&id("u3")));
    }

    #[tokio::test]
    async fn owner_can_never_be_removed() {
        for others in [&[][..], &["u2"][..], &["u2", "u3", "u4"][..]] {
            let service = create_service();
            let group_id = group_with_members(&service, others).await;

            for requester in ["u1", "u2"] {
                let err = service
                    .remove_member(&group_id, &id(requester), &id("u1"))
                    .await
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Forbidden);
                assert_eq!(err.to_string(), "cannot remove group owner");
            }

            let group = service.get_group(&group_id).await.unwrap();
            assert!(group.is_member(&id("u1")));
        }
    }

    #[tokio::test]
    async fn membership_is_locked_while_matched() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;
        let mut rng = StdRng::seed_from_u64(2);
        service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();

        let err = service
            .add_member(&group_id, &id("u1"), &id("u4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Group(GroupError::MembershipLocked)));

        let err = service
            .remove_member(&group_id, &id("u2"), &id("u2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        service.reopen_group(&group_id, &id("u1")).await.unwrap();
        let group = service
            .add_member(&group_id, &id("u1"), &id("u4"))
            .await
            .unwrap();
        assert_eq!(group.member_count(), 4);
    }
}

mod authorization {
    use super::*;

    #[tokio::test]
    async fn outsiders_are_forbidden_without_mutation() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;
        let before = service.get_group(&group_id).await.unwrap();
        let writes = service.repository().update_count();
        let outsider = id("u5");

        let err = service
            .add_member(&group_id, &outsider, &id("u4"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service
            .remove_member(&group_id, &outsider, &id("u2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let mut rng = StdRng::seed_from_u64(0);
        let err = service
            .generate_matches(&group_id, &outsider, &mut rng)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service.archive_group(&group_id, &outsider).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = service.reopen_group(&group_id, &outsider).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        assert_eq!(service.get_group(&group_id).await.unwrap(), before);
        assert_eq!(service.repository().update_count(), writes);
    }

    #[tokio::test]
    async fn members_cannot_act_on_other_members() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;

        let err = service
            .remove_member(&group_id, &id("u2"), &id("u3"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "only the group owner can remove other users");

        let err = service
            .add_member(&group_id, &id("u2"), &id("u4"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "only the group owner can add other users");
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn reopen_after_matching_clears_matches() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;
        let mut rng = StdRng::seed_from_u64(9);
        service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();

        let group = service.reopen_group(&group_id, &id("u1")).await.unwrap();
        assert_eq!(group.status(), GroupStatus::Open);
        assert!(group.matches().is_empty());

        let group = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();
        assert_single_cycle(&group);
    }

    #[tokio::test]
    async fn redundant_transitions_are_conflicts_and_leave_group_unchanged() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2"]).await;

        let err = service.reopen_group(&group_id, &id("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "group is already open");

        let archived = service.archive_group(&group_id, &id("u1")).await.unwrap();
        assert_eq!(archived.status(), GroupStatus::Archived);

        let err = service.archive_group(&group_id, &id("u1")).await.unwrap_err();
        assert_eq!(err.to_string(), "group is already archived");
        assert_eq!(service.get_group(&group_id).await.unwrap(), archived);
    }

    #[tokio::test]
    async fn archive_keeps_matches_until_reopened() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2", "u3"]).await;
        let mut rng = StdRng::seed_from_u64(4);
        let matched = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap();

        let archived = service.archive_group(&group_id, &id("u1")).await.unwrap();
        assert_eq!(archived.matches(), matched.matches());

        let err = service
            .generate_matches(&group_id, &id("u1"), &mut rng)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot generate matches for an archived group");

        let err = service
            .get_member_match(&group_id, &id("u2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let reopened = service.reopen_group(&group_id, &id("u1")).await.unwrap();
        assert!(reopened.matches().is_empty());
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn storage_failures_are_wrapped_with_context() {
        let service = create_service();
        let group_id = group_with_members(&service, &["u2"]).await;
        service.repository().fail_updates();

        let err = service
            .add_member(&group_id, &id("u1"), &id("u3"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "error updating group: storage error: disk full");

        let stored = service.get_group(&group_id).await.unwrap();
        assert!(!stored.is_member(&id("u3")));
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_storage() {
        let service = create_service();
        let err = service.create_group(&id("u1"), "   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(service.repository().inner.group_count().await, 0);
    }

    #[tokio::test]
    async fn stale_copies_lose_the_race() {
        let service = create_service();
        let group_id = group_with_members(&service, &[]).await;

        let mut stale = service.get_group(&group_id).await.unwrap();
        service
            .add_member(&group_id, &id("u1"), &id("u2"))
            .await
            .unwrap();

        stale.add_member(&id("u1"), member("u3")).unwrap();
        let result = service.repository().update(&stale).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn search_lists_groups_for_a_member() {
        let service = create_service();
        let family = service.create_group(&id("u1"), "Family").await.unwrap();
        service
            .add_member(family.id(), &id("u1"), &id("u2"))
            .await
            .unwrap();
        service.create_group(&id("u1"), "Office").await.unwrap();
        service.create_group(&id("u3"), "Book Club").await.unwrap();

        let page = service
            .search_groups(&GroupFilters::for_member(id("u2")))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, *family.id());

        let page = service
            .search_groups(&GroupFilters::for_member(id("u1")))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
