//! Group service sequencing storage and directory I/O around the aggregate.

use common::{GroupId, MemberId};
use rand::Rng;

use crate::error::DomainError;
use crate::ports::{GroupRepository, IdentitySource, MemberDirectory};

use super::{Group, GroupFilters, GroupPage, Member};

/// Service for managing gift exchange groups.
///
/// Each operation loads its own copy of the group, applies one aggregate
/// method and writes the result back only if the group changed. Aggregate
/// errors pass through untouched; a failed operation never writes.
pub struct GroupService<R, D, I> {
    repository: R,
    directory: D,
    identity: I,
}

impl<R, D, I> GroupService<R, D, I>
where
    R: GroupRepository,
    D: MemberDirectory,
    I: IdentitySource,
{
    /// Creates a new group service.
    pub fn new(repository: R, directory: D, identity: I) -> Self {
        Self {
            repository,
            directory,
            identity,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns a reference to the member directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Creates a new group owned by `owner_id`.
    #[tracing::instrument(skip(self))]
    pub async fn create_group(&self, owner_id: &MemberId, name: &str) -> Result<Group, DomainError> {
        let owner = self.resolve_member(owner_id).await?;
        let mut group = Group::create(&self.identity, name, owner)?;

        let version = self
            .repository
            .create(&group)
            .await
            .map_err(|e| DomainError::repository("error inserting group", e))?;
        group.set_version(version);

        metrics::counter!("groups_created_total").increment(1);
        tracing::info!(group_id = %group.id(), "group created");
        Ok(group)
    }

    /// Loads a group by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_group(&self, group_id: &GroupId) -> Result<Group, DomainError> {
        self.load(group_id).await
    }

    /// Adds `member_id` to a group on behalf of `requester_id`.
    #[tracing::instrument(skip(self))]
    pub async fn add_member(
        &self,
        group_id: &GroupId,
        requester_id: &MemberId,
        member_id: &MemberId,
    ) -> Result<Group, DomainError> {
        let mut group = self.load(group_id).await?;

        // Existing members are a no-op; skip the directory round trip.
        if group.is_member(member_id) {
            return Ok(group);
        }

        let candidate = self.resolve_member(member_id).await?;
        if group.add_member(requester_id, candidate)? {
            self.save(&mut group).await?;
            metrics::counter!("group_members_added_total").increment(1);
            tracing::info!(group_id = %group_id, member_id = %member_id, "member added");
        }

        Ok(group)
    }

    /// Removes `member_id` from a group on behalf of `requester_id`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_member(
        &self,
        group_id: &GroupId,
        requester_id: &MemberId,
        member_id: &MemberId,
    ) -> Result<Group, DomainError> {
        let mut group = self.load(group_id).await?;

        if group.remove_member(requester_id, member_id)? {
            self.save(&mut group).await?;
            metrics::counter!("group_members_removed_total").increment(1);
            tracing::info!(group_id = %group_id, member_id = %member_id, "member removed");
        }

        Ok(group)
    }

    /// Draws gift assignments for a group using `rng`.
    #[tracing::instrument(skip(self, rng))]
    pub async fn generate_matches<G>(
        &self,
        group_id: &GroupId,
        requester_id: &MemberId,
        rng: &mut G,
    ) -> Result<Group, DomainError>
    where
        G: Rng + Send + ?Sized,
    {
        let mut group = self.load(group_id).await?;

        group.generate_matches(requester_id, rng)?;
        self.save(&mut group).await?;

        metrics::counter!("group_matches_generated_total").increment(1);
        tracing::info!(
            group_id = %group_id,
            member_count = group.member_count(),
            "matches generated"
        );
        Ok(group)
    }

    /// Returns the member that `member_id` must gift in a group.
    #[tracing::instrument(skip(self))]
    pub async fn get_member_match(
        &self,
        group_id: &GroupId,
        member_id: &MemberId,
    ) -> Result<Member, DomainError> {
        let group = self.load(group_id).await?;
        let receiver = group.match_for(member_id)?;
        Ok(receiver.clone())
    }

    /// Reopens a matched or archived group.
    #[tracing::instrument(skip(self))]
    pub async fn reopen_group(
        &self,
        group_id: &GroupId,
        requester_id: &MemberId,
    ) -> Result<Group, DomainError> {
        let mut group = self.load(group_id).await?;

        group.reopen(requester_id)?;
        self.save(&mut group).await?;

        metrics::counter!("groups_reopened_total").increment(1);
        tracing::info!(group_id = %group_id, "group reopened");
        Ok(group)
    }

    /// Archives a group.
    #[tracing::instrument(skip(self))]
    pub async fn archive_group(
        &self,
        group_id: &GroupId,
        requester_id: &MemberId,
    ) -> Result<Group, DomainError> {
        let mut group = self.load(group_id).await?;

        group.archive(requester_id)?;
        self.save(&mut group).await?;

        metrics::counter!("groups_archived_total").increment(1);
        tracing::info!(group_id = %group_id, "group archived");
        Ok(group)
    }

    /// Searches group summaries.
    #[tracing::instrument(skip(self))]
    pub async fn search_groups(&self, filters: &GroupFilters) -> Result<GroupPage, DomainError> {
        filters.validate()?;

        self.repository
            .search(filters)
            .await
            .map_err(|e| DomainError::repository("error searching groups", e))
    }

    async fn load(&self, group_id: &GroupId) -> Result<Group, DomainError> {
        self.repository
            .get_by_id(group_id)
            .await
            .map_err(|e| DomainError::repository("error loading group", e))
    }

    async fn save(&self, group: &mut Group) -> Result<(), DomainError> {
        let version = self
            .repository
            .update(group)
            .await
            .map_err(|e| DomainError::repository("error updating group", e))?;
        group.set_version(version);
        Ok(())
    }

    async fn resolve_member(&self, member_id: &MemberId) -> Result<Member, DomainError> {
        self.directory
            .get_by_id(member_id)
            .await
            .map_err(DomainError::directory)
    }
}
