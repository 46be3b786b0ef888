//! PostgreSQL adapters for the gift exchange service.
//!
//! Groups are persisted by [`PostgresGroupRepository`] with optimistic
//! versioning; member profiles are resolved by [`PostgresMemberDirectory`].

pub mod directory;
pub mod error;
pub mod postgres;

pub use directory::PostgresMemberDirectory;
pub use error::{Result, StoreError};
pub use postgres::PostgresGroupRepository;
