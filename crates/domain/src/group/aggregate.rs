//! Group aggregate implementation.

use chrono::{DateTime, Utc};
use common::{GroupId, MemberId, Version};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ports::IdentitySource;

use super::{
    GroupError, GroupStatus, GroupSummary, Match, Member,
    matching::{self, MIN_MEMBERS_FOR_MATCHING},
};

/// Group aggregate root.
///
/// A group is a single consistency boundary: every method either applies its
/// change completely or returns an error and leaves the group untouched.
/// Mutating methods that can be no-ops return `true` when the group actually
/// changed, so callers know whether it needs to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,

    /// Stored version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    name: String,

    owner_id: MemberId,

    /// Members in join order. Always contains the owner.
    members: Vec<Member>,

    status: GroupStatus,

    /// Empty while open; kept as history when archived from `Matched`.
    #[serde(default)]
    matches: Vec<Match>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Group {
    /// Returns the group identifier.
    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// Returns the stored version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the stored version.
    ///
    /// Called by the service after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_id(&self) -> &MemberId {
        &self.owner_id
    }

    /// Returns true if `member_id` owns this group.
    pub fn is_owner(&self, member_id: &MemberId) -> bool {
        &self.owner_id == member_id
    }

    /// Returns the members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Returns a member by ID.
    pub fn member(&self, member_id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == member_id)
    }

    /// Returns true if `member_id` belongs to this group.
    pub fn is_member(&self, member_id: &MemberId) -> bool {
        self.member(member_id).is_some()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn status(&self) -> GroupStatus {
        self.status
    }

    /// Returns the current (or archived) gift assignments.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the listing projection of this group.
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
            status: self.status,
            member_count: self.members.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

// Command methods
impl Group {
    /// Creates a new open group owned by `owner`.
    ///
    /// The name is trimmed and must not be empty. The identifier is minted by
    /// `identity` only after the name has been validated.
    pub fn create<I: IdentitySource + ?Sized>(
        identity: &I,
        name: impl AsRef<str>,
        owner: Member,
    ) -> Result<Self, GroupError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(GroupError::EmptyName);
        }

        let id = identity.generate()?;
        let now = Utc::now();

        Ok(Self {
            id,
            version: Version::initial(),
            name: name.to_string(),
            owner_id: owner.id.clone(),
            members: vec![owner],
            status: GroupStatus::Open,
            matches: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Adds `candidate` to the group.
    ///
    /// Members may add themselves; only the owner may add someone else.
    /// Adding an existing member is a no-op.
    pub fn add_member(
        &mut self,
        requester_id: &MemberId,
        candidate: Member,
    ) -> Result<bool, GroupError> {
        if self.is_member(&candidate.id) {
            return Ok(false);
        }

        if !self.is_owner(requester_id) && requester_id != &candidate.id {
            return Err(GroupError::OnlyOwnerCanAddMembers);
        }

        if !self.matches.is_empty() {
            return Err(GroupError::MembershipLocked);
        }

        self.members.push(candidate);
        self.touch();
        Ok(true)
    }

    /// Removes `target_id` from the group.
    ///
    /// Members may remove themselves; only the owner may remove someone else.
    /// The owner can never be removed. Removing a non-member is a no-op.
    pub fn remove_member(
        &mut self,
        requester_id: &MemberId,
        target_id: &MemberId,
    ) -> Result<bool, GroupError> {
        if self.is_owner(target_id) {
            return Err(GroupError::CannotRemoveOwner);
        }

        if !self.is_owner(requester_id) && requester_id != target_id {
            return Err(GroupError::OnlyOwnerCanRemoveMembers);
        }

        let Some(index) = self.members.iter().position(|m| &m.id == target_id) else {
            return Ok(false);
        };

        if !self.matches.is_empty() {
            return Err(GroupError::MembershipLocked);
        }

        self.members.remove(index);
        self.touch();
        Ok(true)
    }

    /// Draws a fresh gift cycle and moves the group to `Matched`.
    ///
    /// Calling this on a matched group replaces the previous draw.
    pub fn generate_matches<R: Rng + ?Sized>(
        &mut self,
        requester_id: &MemberId,
        rng: &mut R,
    ) -> Result<&[Match], GroupError> {
        if self.members.len() < MIN_MEMBERS_FOR_MATCHING {
            return Err(GroupError::NotEnoughMembers {
                member_count: self.members.len(),
            });
        }

        if !self.is_owner(requester_id) {
            return Err(GroupError::OnlyOwnerCanGenerateMatches);
        }

        if !self.status.can_generate_matches() {
            return Err(GroupError::GroupArchived);
        }

        let ids = self.member_ids();
        let matches = matching::assign_cycle(&ids, rng);
        debug_assert!(matching::is_single_cycle(&ids, &matches));

        self.matches = matches;
        self.status = GroupStatus::Matched;
        self.touch();
        Ok(&self.matches)
    }

    /// Returns the member that `member_id` must gift.
    pub fn match_for(&self, member_id: &MemberId) -> Result<&Member, GroupError> {
        if self.status != GroupStatus::Matched {
            return Err(GroupError::MatchNotFound);
        }

        self.matches
            .iter()
            .find(|m| &m.giver == member_id)
            .and_then(|m| self.member(&m.receiver))
            .ok_or(GroupError::MatchNotFound)
    }

    /// Moves the group back to `Open`, discarding any matches.
    pub fn reopen(&mut self, requester_id: &MemberId) -> Result<(), GroupError> {
        if !self.is_owner(requester_id) {
            return Err(GroupError::OnlyOwnerCanReopen);
        }

        if !self.status.can_reopen() {
            return Err(GroupError::AlreadyOpen);
        }

        self.status = GroupStatus::Open;
        self.matches.clear();
        self.touch();
        Ok(())
    }

    /// Archives the group. Existing matches are kept as history.
    pub fn archive(&mut self, requester_id: &MemberId) -> Result<(), GroupError> {
        if !self.is_owner(requester_id) {
            return Err(GroupError::OnlyOwnerCanArchive);
        }

        if !self.status.can_archive() {
            return Err(GroupError::AlreadyArchived);
        }

        self.status = GroupStatus::Archived;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
