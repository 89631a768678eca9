//! Administrative trigger endpoints

use super::{ApiError, ApiResult};
use crate::enrollment::ReconcileOutcome;
use crate::error::Error;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use rollcall_common::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct BlacklistRequest {
    pub blacklisted: bool,
}

/// POST /api/users/:id/blacklist
pub async fn set_blacklist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<BlacklistRequest>,
) -> ApiResult<Json<Value>> {
    state
        .engine
        .set_join_blacklisted(UserId(id), request.blacklisted)
        .await?;
    Ok(Json(json!({ "user_id": id, "blacklisted": request.blacklisted })))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
    pub courses: usize,
}

/// POST /api/catalogue/refresh
///
/// A failed refresh is not an HTTP error; the response says whether the
/// snapshot was replaced.
pub async fn refresh_catalogue(State(state): State<AppState>) -> Json<RefreshResponse> {
    let refreshed = state.catalogue.refresh(&state.catalogue_sources).await;
    Json(RefreshResponse {
        refreshed,
        courses: state.catalogue.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub course: String,
    pub writes: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// POST /api/reconcile/:code
pub async fn reconcile_course(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ReconcileResponse>> {
    let code = state.directory.normalize(&code).await;
    let course = state
        .directory
        .get_course(&code)
        .await?
        .ok_or_else(|| ApiError(Error::NotFound(format!("No course {}", code))))?;

    match state
        .reconciler
        .apply_channel_permissions(course.channel_id)
        .await?
    {
        ReconcileOutcome::Converged(summary) => Ok(Json(ReconcileResponse {
            course: course.code,
            writes: summary.writes(),
            skipped: summary.members_skipped,
            failed: summary.roles_failed + summary.members_failed,
        })),
        ReconcileOutcome::NotACourse => Err(ApiError(Error::NotFound(format!(
            "Channel for {} is not linked",
            course.code
        )))),
    }
}
