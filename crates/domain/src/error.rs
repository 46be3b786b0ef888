//! Domain error types.

use common::{GroupId, MemberId, Version};
use thiserror::Error;

use crate::group::{FilterError, GroupError};
use crate::ports::{DirectoryError, RepositoryError};

/// Failure category, independent of which layer raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; the caller can fix it and retry.
    Validation,
    /// The requester may not perform the operation.
    Forbidden,
    /// The current state does not allow the operation.
    Conflict,
    /// A referenced group or member does not exist.
    NotFound,
    /// Storage or collaborator failure.
    Internal,
}

/// Errors that can occur during group service operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A group rule was violated.
    #[error(transparent)]
    Group(#[from] GroupError),

    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("a group named {name:?} already exists for this owner")]
    DuplicateName { name: String },

    /// Another operation updated the group between load and save.
    #[error("group {group_id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        group_id: GroupId,
        expected: Version,
        actual: Version,
    },

    #[error("invalid search filters: {0}")]
    InvalidFilters(#[from] FilterError),

    /// Unexpected repository failure, with the operation that hit it.
    #[error("{context}: {source}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },

    /// Unexpected member directory failure.
    #[error("error resolving member: {0}")]
    Directory(#[source] DirectoryError),
}

impl DomainError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Group(e) => e.kind(),
            DomainError::GroupNotFound(_) | DomainError::MemberNotFound(_) => ErrorKind::NotFound,
            DomainError::DuplicateName { .. } | DomainError::ConcurrencyConflict { .. } => {
                ErrorKind::Conflict
            }
            DomainError::InvalidFilters(_) => ErrorKind::Validation,
            DomainError::Repository { .. } | DomainError::Directory(_) => ErrorKind::Internal,
        }
    }

    /// Translates a repository error, keeping typed failures and wrapping the
    /// rest with `context`.
    pub(crate) fn repository(context: &'static str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(group_id) => DomainError::GroupNotFound(group_id),
            RepositoryError::DuplicateName { name, .. } => DomainError::DuplicateName { name },
            RepositoryError::ConcurrencyConflict {
                group_id,
                expected,
                actual,
            } => DomainError::ConcurrencyConflict {
                group_id,
                expected,
                actual,
            },
            other => DomainError::Repository {
                context,
                source: other,
            },
        }
    }

    /// Translates a member directory error.
    pub(crate) fn directory(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(member_id) => DomainError::MemberNotFound(member_id),
            other => DomainError::Directory(other),
        }
    }
}
