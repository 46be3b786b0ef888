//! Group lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{GroupId, MemberId};
use domain::{
    DEFAULT_LIMIT, Group, GroupFilters, GroupPage, GroupRepository, GroupService, GroupSortField,
    GroupStatus, Member, MemberDirectory, SortDirection, UuidIdentitySource,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ActingMember;

/// Shared application state accessible from all handlers.
pub struct AppState<R, D> {
    pub group_service: GroupService<R, D, UuidIdentitySource>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    /// Parsed with `GroupStatus::from_str`, so any letter case is accepted.
    pub status: Option<String>,
    pub owner_id: Option<String>,
    pub member_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<GroupSortField>,
    pub sort_direction: Option<SortDirection>,
}

impl SearchParams {
    fn into_filters(self) -> Result<GroupFilters, ApiError> {
        let mut filters = GroupFilters::new()
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .offset(self.offset.unwrap_or(0))
            .sort(
                self.sort_by.unwrap_or_default(),
                self.sort_direction.unwrap_or_default(),
            );

        if let Some(name) = self.name.filter(|n| !n.trim().is_empty()) {
            filters = filters.name(name.trim());
        }
        if let Some(status) = self.status {
            let status = status
                .parse::<GroupStatus>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            filters = filters.status(status);
        }
        if let Some(owner_id) = self.owner_id {
            filters = filters.owner_id(MemberId::new(owner_id));
        }
        if let Some(member_id) = self.member_id {
            filters = filters.member_id(MemberId::new(member_id));
        }
        Ok(filters)
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.to_string(),
            name: member.profile.name.clone(),
            email: member.profile.email.clone(),
        }
    }
}

/// Group as returned to clients. The match list is never exposed; members
/// look up their own receiver through `/matches/me`.
#[derive(Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub status: GroupStatus,
    pub version: i64,
    pub members: Vec<MemberResponse>,
    pub has_matches: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id().to_string(),
            name: group.name().to_string(),
            owner_id: group.owner_id().to_string(),
            status: group.status(),
            version: group.version().as_i64(),
            members: group.members().iter().map(MemberResponse::from).collect(),
            has_matches: !group.matches().is_empty(),
            created_at: group.created_at(),
            updated_at: group.updated_at(),
        }
    }
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub giver_id: String,
    pub receiver: MemberResponse,
}

// -- Handlers --

/// POST /groups — create a group owned by the acting member.
#[tracing::instrument(skip(state, body))]
pub async fn create<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(owner_id): ActingMember,
    body: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let group = state
        .group_service
        .create_group(&owner_id, &req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from(&group))))
}

/// GET /groups — search group summaries.
#[tracing::instrument(skip(state, params))]
pub async fn list<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<GroupPage>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let filters = params.into_filters()?;
    let page = state.group_service.search_groups(&filters).await?;

    Ok(Json(page))
}

/// GET /groups/{id} — load a group.
#[tracing::instrument(skip(state))]
pub async fn get<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    Path(id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let group = state.group_service.get_group(&GroupId::new(id)).await?;
    Ok(Json(GroupResponse::from(&group)))
}

/// POST /groups/{id}/members — add a member.
#[tracing::instrument(skip(state, body))]
pub async fn add_member<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(requester_id): ActingMember,
    Path(id): Path<String>,
    body: Result<Json<AddMemberRequest>, JsonRejection>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let group = state
        .group_service
        .add_member(
            &GroupId::new(id),
            &requester_id,
            &MemberId::new(req.member_id),
        )
        .await?;

    Ok(Json(GroupResponse::from(&group)))
}

/// DELETE /groups/{id}/members/{member_id} — remove a member.
#[tracing::instrument(skip(state))]
pub async fn remove_member<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(requester_id): ActingMember,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let group = state
        .group_service
        .remove_member(&GroupId::new(id), &requester_id, &MemberId::new(member_id))
        .await?;

    Ok(Json(GroupResponse::from(&group)))
}

/// POST /groups/{id}/matches — draw gift assignments.
#[tracing::instrument(skip(state))]
pub async fn generate_matches<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(requester_id): ActingMember,
    Path(id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let mut rng = StdRng::from_entropy();
    let group = state
        .group_service
        .generate_matches(&GroupId::new(id), &requester_id, &mut rng)
        .await?;

    Ok(Json(GroupResponse::from(&group)))
}

/// GET /groups/{id}/matches/me — the acting member's receiver.
#[tracing::instrument(skip(state))]
pub async fn my_match<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(member_id): ActingMember,
    Path(id): Path<String>,
) -> Result<Json<MatchResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let receiver = state
        .group_service
        .get_member_match(&GroupId::new(id), &member_id)
        .await?;

    Ok(Json(MatchResponse {
        giver_id: member_id.to_string(),
        receiver: MemberResponse::from(&receiver),
    }))
}

/// POST /groups/{id}/reopen — move a group back to open.
#[tracing::instrument(skip(state))]
pub async fn reopen<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(requester_id): ActingMember,
    Path(id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let group = state
        .group_service
        .reopen_group(&GroupId::new(id), &requester_id)
        .await?;

    Ok(Json(GroupResponse::from(&group)))
}

/// POST /groups/{id}/archive — archive a group.
#[tracing::instrument(skip(state))]
pub async fn archive<R, D>(
    State(state): State<Arc<AppState<R, D>>>,
    ActingMember(requester_id): ActingMember,
    Path(id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError>
where
    R: GroupRepository + 'static,
    D: MemberDirectory + 'static,
{
    let group = state
        .group_service
        .archive_group(&GroupId::new(id), &requester_id)
        .await?;

    Ok(Json(GroupResponse::from(&group)))
}
