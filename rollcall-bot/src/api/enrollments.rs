//! Enrollment inspection endpoints

use super::ApiResult;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use rollcall_common::UserId;

/// GET /api/users/:id/courses
pub async fn user_courses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.engine.user_courses(UserId(id)).await?))
}

/// GET /api/courses/:code/members
pub async fn course_members(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<UserId>>> {
    let code = state.directory.normalize(&code).await;
    Ok(Json(state.engine.course_members(&code).await?))
}
