use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use super::RpcJson;
use crate::common::UserId;
use crate::domains::chats::activities::{reconcile_organisers, ReconcileReport};
use crate::server::app::AppState;
use crate::server::error::ApiError;

pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisersChangedRequest {
    pub course_id: String,
    pub organiser_ids: Vec<UserId>,
}

fn require_internal_token(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let presented = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if !expected.is_empty() && token == expected => Ok(()),
        _ => {
            warn!("Rejected internal call with missing or wrong token");
            Err(ApiError::unauthorized("Invalid internal token"))
        }
    }
}

/// Fired by the course system whenever a course's organiser list changes
pub async fn organisers_changed_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    RpcJson(req): RpcJson<OrganisersChangedRequest>,
) -> Result<Json<ReconcileReport>, ApiError> {
    require_internal_token(&headers, &state.internal_api_token)?;

    let course_id = req.course_id.trim();
    if course_id.is_empty() {
        return Err(ApiError::bad_request("courseId must not be empty"));
    }

    let report = reconcile_organisers(course_id, &req.organiser_ids, &state.deps).await?;
    Ok(Json(report))
}
