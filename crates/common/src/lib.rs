//! Shared types for the gift exchange workspace.

mod types;

pub use types::{GroupId, MemberId, Version};
