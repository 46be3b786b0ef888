//! Group repository port and in-memory adapter.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{GroupId, MemberId, Version};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::group::{Group, GroupFilters, GroupPage, GroupSortField, SortDirection};

/// Errors raised by group repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("group not found: {0}")]
    NotFound(GroupId),

    /// The owner already has a group with this name.
    #[error("owner {owner_id} already has a group named {name:?}")]
    DuplicateName { owner_id: MemberId, name: String },

    /// The stored version did not match the version the caller loaded.
    #[error(
        "concurrency conflict for group {group_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        group_id: GroupId,
        expected: Version,
        actual: Version,
    },

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Durable store for groups, keyed by group ID.
///
/// Implementations arbitrate concurrent writers with optimistic concurrency:
/// `update` only succeeds when the stored version equals `group.version()`.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Stores a new group and returns its first version.
    ///
    /// Fails with `DuplicateName` if the owner already has a group with the
    /// same name.
    async fn create(&self, group: &Group) -> Result<Version, RepositoryError>;

    /// Loads a group by ID.
    async fn get_by_id(&self, group_id: &GroupId) -> Result<Group, RepositoryError>;

    /// Replaces a stored group and returns its new version.
    async fn update(&self, group: &Group) -> Result<Version, RepositoryError>;

    /// Returns one page of group summaries matching `filters`.
    async fn search(&self, filters: &GroupFilters) -> Result<GroupPage, RepositoryError>;
}

/// In-memory group repository for testing.
///
/// Provides the same semantics as the PostgreSQL implementation, including
/// version checks and per-owner name uniqueness.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGroupRepository {
    groups: Arc<RwLock<HashMap<GroupId, Group>>>,
}

impl InMemoryGroupRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored groups.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    /// Removes all groups.
    pub async fn clear(&self) {
        self.groups.write().await.clear();
    }

    fn check_unique_name(
        groups: &HashMap<GroupId, Group>,
        group: &Group,
    ) -> Result<(), RepositoryError> {
        let taken = groups.values().any(|existing| {
            existing.id() != group.id()
                && existing.owner_id() == group.owner_id()
                && existing.name() == group.name()
        });
        if taken {
            return Err(RepositoryError::DuplicateName {
                owner_id: group.owner_id().clone(),
                name: group.name().to_string(),
            });
        }
        Ok(())
    }

    fn matches_filters(group: &Group, filters: &GroupFilters) -> bool {
        if let Some(ref name) = filters.name
            && !group.name().to_lowercase().contains(&name.to_lowercase())
        {
            return false;
        }
        if let Some(status) = filters.status
            && group.status() != status
        {
            return false;
        }
        if let Some(ref owner_id) = filters.owner_id
            && group.owner_id() != owner_id
        {
            return false;
        }
        if let Some(ref member_id) = filters.member_id
            && !group.is_member(member_id)
        {
            return false;
        }
        true
    }

    fn compare(a: &Group, b: &Group, filters: &GroupFilters) -> Ordering {
        let ordering = match filters.sort_by {
            GroupSortField::Name => a.name().cmp(b.name()),
            GroupSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
            GroupSortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        };
        let ordering = match filters.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id().cmp(b.id()))
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: &Group) -> Result<Version, RepositoryError> {
        let mut groups = self.groups.write().await;

        if let Some(existing) = groups.get(group.id()) {
            return Err(RepositoryError::ConcurrencyConflict {
                group_id: group.id().clone(),
                expected: Version::initial(),
                actual: existing.version(),
            });
        }
        Self::check_unique_name(&groups, group)?;

        let mut stored = group.clone();
        stored.set_version(Version::first());
        groups.insert(stored.id().clone(), stored);

        Ok(Version::first())
    }

    async fn get_by_id(&self, group_id: &GroupId) -> Result<Group, RepositoryError> {
        self.groups
            .read()
            .await
            .get(group_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(group_id.clone()))
    }

    async fn update(&self, group: &Group) -> Result<Version, RepositoryError> {
        let mut groups = self.groups.write().await;

        let current = groups
            .get(group.id())
            .map(Group::version)
            .ok_or_else(|| RepositoryError::NotFound(group.id().clone()))?;

        if current != group.version() {
            return Err(RepositoryError::ConcurrencyConflict {
                group_id: group.id().clone(),
                expected: group.version(),
                actual: current,
            });
        }
        Self::check_unique_name(&groups, group)?;

        let new_version = current.next();
        let mut stored = group.clone();
        stored.set_version(new_version);
        groups.insert(stored.id().clone(), stored);

        Ok(new_version)
    }

    async fn search(&self, filters: &GroupFilters) -> Result<GroupPage, RepositoryError> {
        let groups = self.groups.read().await;

        let mut matching: Vec<&Group> = groups
            .values()
            .filter(|g| Self::matches_filters(g, filters))
            .collect();
        matching.sort_by(|a, b| Self::compare(a, b, filters));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filters.offset)
            .take(filters.limit)
            .map(Group::summary)
            .collect();

        Ok(GroupPage {
            items,
            total,
            limit: filters.limit,
            offset: filters.offset,
        })
    }
}
