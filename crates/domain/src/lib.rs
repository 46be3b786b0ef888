//! Domain layer for the gift exchange service.
//!
//! This crate provides:
//! - The `Group` aggregate with its lifecycle state machine
//! - The single-cycle matching algorithm
//! - `GroupService`, which sequences storage and directory I/O around the aggregate
//! - Ports for the group repository, member directory and ID generation, with
//!   in-memory adapters

pub mod error;
pub mod group;
pub mod ports;

pub use error::{DomainError, ErrorKind};
pub use group::{
    DEFAULT_LIMIT, FilterError, Group, GroupError, GroupFilters, GroupPage, GroupService,
    GroupSortField, GroupStatus, GroupSummary, MAX_LIMIT, Match, Member, MemberProfile,
    SortDirection,
};
pub use ports::{
    DirectoryError, GroupRepository, IdentitySource, InMemoryGroupRepository,
    InMemoryMemberDirectory, MemberDirectory, RepositoryError, SequentialIdentitySource,
    UuidIdentitySource,
};
