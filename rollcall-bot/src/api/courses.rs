//! Directory inspection endpoints

use super::{ApiError, ApiResult};
use crate::error::Error;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rollcall_common::db::{Category, Course, CourseAlias};
use serde::Deserialize;

/// GET /api/courses
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(state.directory.list_courses().await?))
}

/// GET /api/courses/:code
///
/// The code is normalized before lookup, so `comp102` finds `COMP-102`.
pub async fn get_course(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Course>> {
    let code = state.directory.normalize(&code).await;
    let course = state
        .directory
        .get_course(&code)
        .await?
        .ok_or_else(|| ApiError(Error::NotFound(format!("No course {}", code))))?;
    Ok(Json(course))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.directory.list_categories().await?))
}

#[derive(Debug, Deserialize)]
pub struct AliasQuery {
    /// Include hidden aliases in the listing
    #[serde(default)]
    pub hidden: bool,
}

/// GET /api/aliases?hidden=true
pub async fn list_aliases(
    State(state): State<AppState>,
    Query(query): Query<AliasQuery>,
) -> ApiResult<Json<Vec<CourseAlias>>> {
    Ok(Json(state.directory.list_aliases(query.hidden).await?))
}
