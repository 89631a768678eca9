//! rollcall-bot library
//!
//! Enrollment engine, permission reconciler, course directory, catalogue
//! refresh, and the admin HTTP API. The chat-platform adapter and the
//! command presentation layer live out of tree and consume this crate.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod course;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod gateway;

pub use error::{Error, Result};

use course::{CatalogueCache, CatalogueSource, CourseDirectory};
use enrollment::{EnrollmentEngine, Reconciler};

/// Application state shared across HTTP handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub directory: CourseDirectory,
    pub engine: EnrollmentEngine,
    pub reconciler: Reconciler,
    pub catalogue: Arc<CatalogueCache>,
    pub catalogue_sources: Arc<Vec<Arc<dyn CatalogueSource>>>,
    /// Static bearer token for protected routes; None disables auth
    pub bearer_token: Option<String>,
}

/// Build the admin API router
///
/// The health endpoint is public; everything else goes through the bearer
/// token middleware (a no-op when no token is configured).
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/courses", get(api::courses::list_courses))
        .route("/api/courses/:code", get(api::courses::get_course))
        .route("/api/courses/:code/members", get(api::enrollments::course_members))
        .route("/api/categories", get(api::courses::list_categories))
        .route("/api/aliases", get(api::courses::list_aliases))
        .route("/api/users/:id/courses", get(api::enrollments::user_courses))
        .route("/api/users/:id/blacklist", post(api::admin::set_blacklist))
        .route("/api/catalogue/refresh", post(api::admin::refresh_catalogue))
        .route("/api/reconcile/:code", post(api::admin::reconcile_course))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new().merge(api::health::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
