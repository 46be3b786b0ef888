//! Identity source port and adapters.

use std::sync::atomic::{AtomicU64, Ordering};

use common::GroupId;
use thiserror::Error;

/// Errors raised while minting a new identifier.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity source unavailable: {0}")]
    Unavailable(String),
}

/// Produces globally unique group identifiers.
pub trait IdentitySource: Send + Sync {
    /// Mints a new identifier.
    fn generate(&self) -> Result<GroupId, IdentityError>;
}

/// Identity source backed by random UUID v4 values.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdentitySource;

impl IdentitySource for UuidIdentitySource {
    fn generate(&self) -> Result<GroupId, IdentityError> {
        Ok(GroupId::random())
    }
}

/// Identity source that hands out `"{prefix}-1"`, `"{prefix}-2"`, ...
///
/// Useful wherever predictable identifiers are easier to assert on.
#[derive(Debug)]
pub struct SequentialIdentitySource {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdentitySource {
    /// Creates a sequence starting at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdentitySource for SequentialIdentitySource {
    fn generate(&self) -> Result<GroupId, IdentityError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(GroupId::new(format!("{}-{n}", self.prefix)))
    }
}
