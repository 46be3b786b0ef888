//! Value objects for the group domain.

use common::MemberId;
use serde::{Deserialize, Serialize};

/// Display profile cached alongside a member reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Display name.
    pub name: String,

    /// Contact address.
    pub email: String,
}

impl MemberProfile {
    /// Creates a new profile.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A member reference embedded in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's identifier.
    pub id: MemberId,

    /// Profile resolved from the member directory when the member joined.
    pub profile: MemberProfile,
}

impl Member {
    /// Creates a new member reference.
    pub fn new(id: impl Into<MemberId>, profile: MemberProfile) -> Self {
        Self {
            id: id.into(),
            profile,
        }
    }

    /// Returns the member's display name.
    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

/// One gift assignment: `giver` buys a gift for `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub giver: MemberId,
    pub receiver: MemberId,
}

impl Match {
    /// Creates a new match.
    pub fn new(giver: MemberId, receiver: MemberId) -> Self {
        debug_assert_ne!(giver, receiver, "a member cannot gift themselves");
        Self { giver, receiver }
    }
}
