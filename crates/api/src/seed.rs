//! Loading the member directory from a JSON file at start-up.

use std::path::Path;

use domain::{Member, MemberProfile};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading a members file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read members file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse members file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct SeedMember {
    id: String,
    name: String,
    email: String,
}

/// Parses a JSON array of `{"id", "name", "email"}` objects.
pub fn parse_members(json: &str) -> Result<Vec<Member>, SeedError> {
    let members: Vec<SeedMember> = serde_json::from_str(json)?;
    Ok(members
        .into_iter()
        .map(|m| Member::new(m.id, MemberProfile::new(m.name, m.email)))
        .collect())
}

/// Reads and parses a members file.
pub async fn load_members(path: impl AsRef<Path>) -> Result<Vec<Member>, SeedError> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_members(&json)
}
