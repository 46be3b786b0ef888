//! Group aggregate and related types.

mod aggregate;
pub mod matching;
mod query;
mod service;
mod state;
mod value_objects;

pub use aggregate::Group;
pub use query::{
    DEFAULT_LIMIT, FilterError, GroupFilters, GroupPage, GroupSortField, GroupSummary, MAX_LIMIT,
    SortDirection,
};
pub use service::GroupService;
pub use state::{GroupStatus, ParseGroupStatusError};
pub use value_objects::{Match, Member, MemberProfile};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::ports::IdentityError;

/// Errors that can occur during group operations.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Group name is empty or whitespace.
    #[error("group name must not be empty")]
    EmptyName,

    #[error("only the group owner can add other users")]
    OnlyOwnerCanAddMembers,

    /// The owner can never leave or be removed from their own group.
    #[error("cannot remove group owner")]
    CannotRemoveOwner,

    #[error("only the group owner can remove other users")]
    OnlyOwnerCanRemoveMembers,

    #[error("only the group owner can generate matches")]
    OnlyOwnerCanGenerateMatches,

    #[error("only the group owner can reopen the group")]
    OnlyOwnerCanReopen,

    #[error("only the group owner can archive the group")]
    OnlyOwnerCanArchive,

    /// Not enough members for a draw.
    #[error("group must have at least 3 users to generate matches")]
    NotEnoughMembers { member_count: usize },

    /// Matches cannot be drawn for an archived group.
    #[error("cannot generate matches for an archived group")]
    GroupArchived,

    /// Membership is frozen while the group holds matches.
    #[error("cannot change members while matches are assigned; reopen the group first")]
    MembershipLocked,

    #[error("match not found for the given user")]
    MatchNotFound,

    #[error("group is already open")]
    AlreadyOpen,

    #[error("group is already archived")]
    AlreadyArchived,

    /// The identity source failed while creating a group.
    #[error("error generating group id: {0}")]
    Identity(#[from] IdentityError),
}

impl GroupError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GroupError::EmptyName => ErrorKind::Validation,
            GroupError::OnlyOwnerCanAddMembers
            | GroupError::CannotRemoveOwner
            | GroupError::OnlyOwnerCanRemoveMembers
            | GroupError::OnlyOwnerCanGenerateMatches
            | GroupError::OnlyOwnerCanReopen
            | GroupError::OnlyOwnerCanArchive => ErrorKind::Forbidden,
            GroupError::NotEnoughMembers { .. }
            | GroupError::GroupArchived
            | GroupError::MembershipLocked
            | GroupError::MatchNotFound
            | GroupError::AlreadyOpen
            | GroupError::AlreadyArchived => ErrorKind::Conflict,
            GroupError::Identity(_) => ErrorKind::Internal,
        }
    }
}
