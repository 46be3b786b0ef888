//! Member directory port and in-memory adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::MemberId;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::group::Member;

/// Errors raised while resolving a member.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("member not found: {0}")]
    NotFound(MemberId),

    #[error("member directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves member identifiers to member profiles.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Looks up a member by ID.
    async fn get_by_id(&self, member_id: &MemberId) -> Result<Member, DirectoryError>;
}

/// In-memory member directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberDirectory {
    members: Arc<RwLock<HashMap<MemberId, Member>>>,
}

impl InMemoryMemberDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `members`.
    pub fn with_members(members: impl IntoIterator<Item = Member>) -> Self {
        let members = members.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self {
            members: Arc::new(RwLock::new(members)),
        }
    }

    /// Inserts or replaces a member.
    pub async fn insert(&self, member: Member) {
        self.members.write().await.insert(member.id.clone(), member);
    }

    /// Returns the number of known members.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn get_by_id(&self, member_id: &MemberId) -> Result<Member, DirectoryError> {
        self.members
            .read()
            .await
            .get(member_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(member_id.clone()))
    }
}
