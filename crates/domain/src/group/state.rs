//! Group lifecycle state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lifecycle status of a gift exchange group.
///
/// State transitions (all owner-only):
/// ```text
/// Open ──generate──► Matched ──archive──► Archived
///  │ ▲                  │                    │
///  │ └─────reopen───────┘                    │
///  │ ▲                                       │
///  │ └─────────────────reopen────────────────┘
///  └──────────────────archive──────────────► Archived
/// ```
///
/// There is no terminal state: an archived group can be reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    /// Members can join and leave; no matches exist.
    #[default]
    Open,

    /// Every member has been assigned a receiver.
    Matched,

    /// The exchange is over. Matches from a previous draw are kept as history.
    Archived,
}

impl GroupStatus {
    /// Returns true if matches can be drawn in this status.
    pub fn can_generate_matches(&self) -> bool {
        matches!(self, GroupStatus::Open | GroupStatus::Matched)
    }

    /// Returns true if the group can be reopened from this status.
    pub fn can_reopen(&self) -> bool {
        !matches!(self, GroupStatus::Open)
    }

    /// Returns true if the group can be archived from this status.
    pub fn can_archive(&self) -> bool {
        !matches!(self, GroupStatus::Archived)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Open => "open",
            GroupStatus::Matched => "matched",
            GroupStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group status: {0}")]
pub struct ParseGroupStatusError(pub String);

impl FromStr for GroupStatus {
    type Err = ParseGroupStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(GroupStatus::Open),
            "matched" => Ok(GroupStatus::Matched),
            "archived" => Ok(GroupStatus::Archived),
            _ => Err(ParseGroupStatusError(s.to_string())),
        }
    }
}
