//! Read-side types for listing and searching groups.

use chrono::{DateTime, Utc};
use common::{GroupId, MemberId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::GroupStatus;

/// Default page size for group searches.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page size a search may request.
pub const MAX_LIMIT: usize = 100;

/// Read-only projection of a group used in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub owner_id: MemberId,
    pub status: GroupStatus,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field used to order search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSortField {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl GroupSortField {
    /// Returns the column name used by SQL-backed repositories.
    pub fn column(&self) -> &'static str {
        match self {
            GroupSortField::Name => "name",
            GroupSortField::CreatedAt => "created_at",
            GroupSortField::UpdatedAt => "updated_at",
        }
    }
}

/// Direction of the search ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Invalid search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("limit must be between 1 and {MAX_LIMIT}, got {0}")]
    InvalidLimit(usize),

    #[error("offset must not exceed {max}, got {0}", max = i64::MAX)]
    InvalidOffset(usize),
}

/// Builder for group search queries.
///
/// All filters are optional and combined with AND. `name` matches as a
/// case-insensitive substring; `member_id` matches groups that contain the
/// member (owner included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFilters {
    /// Filter by name substring.
    pub name: Option<String>,

    /// Filter by lifecycle status.
    pub status: Option<GroupStatus>,

    /// Filter by owner.
    pub owner_id: Option<MemberId>,

    /// Filter by membership.
    pub member_id: Option<MemberId>,

    /// Maximum number of summaries to return.
    pub limit: usize,

    /// Number of summaries to skip.
    pub offset: usize,

    pub sort_by: GroupSortField,
    pub sort_direction: SortDirection,
}

impl Default for GroupFilters {
    fn default() -> Self {
        Self {
            name: None,
            status: None,
            owner_id: None,
            member_id: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: GroupSortField::default(),
            sort_direction: SortDirection::default(),
        }
    }
}

impl GroupFilters {
    /// Creates a query with no filters and default pagination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the groups a member belongs to.
    pub fn for_member(member_id: MemberId) -> Self {
        Self {
            member_id: Some(member_id),
            ..Default::default()
        }
    }

    /// Filters by name substring.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filters by status.
    pub fn status(mut self, status: GroupStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by owner.
    pub fn owner_id(mut self, owner_id: MemberId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Filters by member.
    pub fn member_id(mut self, member_id: MemberId) -> Self {
        self.member_id = Some(member_id);
        self
    }

    /// Limits the number of summaries returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Skips this many summaries before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the ordering.
    pub fn sort(mut self, field: GroupSortField, direction: SortDirection) -> Self {
        self.sort_by = field;
        self.sort_direction = direction;
        self
    }

    /// Checks the pagination parameters.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(FilterError::InvalidLimit(self.limit));
        }
        // Storage binds pagination as BIGINT.
        if i64::try_from(self.offset).is_err() {
            return Err(FilterError::InvalidOffset(self.offset));
        }
        Ok(())
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPage {
    pub items: Vec<GroupSummary>,

    /// Number of groups matching the filters, ignoring pagination.
    pub total: u64,

    pub limit: usize,
    pub offset: usize,
}
