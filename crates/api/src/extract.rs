//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::MemberId;

use crate::error::ApiError;

/// Header carrying the ID of the member making the request.
pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// The member on whose behalf a request is made, read from `x-member-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingMember(pub MemberId);

impl<S> FromRequestParts<S> for ActingMember
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(MEMBER_ID_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("missing {MEMBER_ID_HEADER} header")))?;

        let member_id = value
            .to_str()
            .map(str::trim)
            .map_err(|_| ApiError::BadRequest(format!("invalid {MEMBER_ID_HEADER} header")))?;

        if member_id.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "empty {MEMBER_ID_HEADER} header"
            )));
        }

        Ok(ActingMember(MemberId::new(member_id)))
    }
}
