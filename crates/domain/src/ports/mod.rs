//! Collaborators the group service depends on, with in-memory adapters.

mod directory;
mod identity;
mod repository;

pub use directory::{DirectoryError, InMemoryMemberDirectory, MemberDirectory};
pub use identity::{IdentityError, IdentitySource, SequentialIdentitySource, UuidIdentitySource};
pub use repository::{GroupRepository, InMemoryGroupRepository, RepositoryError};
