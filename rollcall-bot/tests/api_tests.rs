//! Tests for the admin HTTP API

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use rollcall_bot::course::{CatalogueCache, CatalogueSource, CourseDirectory};
use rollcall_bot::enrollment::{EnrollmentEngine, EnrollmentStatus, Reconciler};
use rollcall_bot::gateway::{ChannelKind, GuildDirectory, MemoryGuild};
use rollcall_bot::{build_router, AppState};
use rollcall_common::db::init_memory_database;
use rollcall_common::{ChannelId, PermissionPolicy, PermissionSet, RoleId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const VERIFIED_ROLE: RoleId = RoleId(900);

async fn app_state(bearer_token: Option<String>) -> (AppState, Arc<MemoryGuild>) {
    let db = init_memory_database().await.unwrap();
    let guild = Arc::new(MemoryGuild::new());
    guild.add_role(VERIFIED_ROLE);

    let policy = PermissionPolicy {
        everyone: PermissionSet::new(0, 1024),
        verified: PermissionSet::new(0, 1024),
        member: PermissionSet::new(3072, 0),
        verified_role_id: VERIFIED_ROLE,
        role_overrides: Vec::new(),
    };

    let catalogue = Arc::new(CatalogueCache::new());
    let directory = CourseDirectory::new(db.clone(), guild.clone());
    let reconciler = Reconciler::new(db.clone(), guild.clone(), policy, Duration::ZERO);
    let engine = EnrollmentEngine::new(
        db.clone(),
        guild.clone(),
        guild.clone(),
        directory.clone(),
        catalogue.clone(),
        reconciler.clone(),
        false,
    );

    let sources: Arc<Vec<Arc<dyn CatalogueSource>>> = Arc::new(Vec::new());
    let state = AppState {
        db,
        directory,
        engine,
        reconciler,
        catalogue,
        catalogue_sources: sources,
        bearer_token,
    };
    (state, guild)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let (state, _guild) = app_state(Some("sekrit".to_string())).await;
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "rollcall-bot");
}

#[tokio::test]
async fn test_protected_route_rejects_missing_token() {
    let (state, _guild) = app_state(Some("sekrit".to_string())).await;
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/api/courses").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_accepts_token() {
    let (state, _guild) = app_state(Some("sekrit".to_string())).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get("/api/courses")
                .header(header::AUTHORIZATION, "Bearer sekrit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_token_disables_auth() {
    let (state, guild) = app_state(None).await;

    guild.insert_channel(ChannelId(42), "comp-102", ChannelKind::Text);
    let channel = guild.channel(ChannelId(42)).await.unwrap().unwrap();
    state.directory.link_channel(&channel).await.unwrap();

    let app = build_router(state);
    let response = app
        .oneshot(Request::get("/api/courses/comp102").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["code"], "COMP-102");
}

#[tokio::test]
async fn test_unknown_course_is_404() {
    let (state, _guild) = app_state(None).await;
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/api/courses/none-999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_endpoint_reports_writes() {
    let (state, guild) = app_state(None).await;
    let user = UserId(7);

    guild.insert_channel(ChannelId(42), "comp-102", ChannelKind::Text);
    let channel = guild.channel(ChannelId(42)).await.unwrap().unwrap();
    state.directory.link_channel(&channel).await.unwrap();
    guild.add_member(user);
    assert_eq!(
        state.engine.enroll_user("COMP-102", user).await,
        EnrollmentStatus::Success
    );

    let app = build_router(state);
    let response = app
        .oneshot(
            Request::post("/api/reconcile/COMP-102")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["course"], "COMP-102");
    // Enrollment already reconciled the channel; the manual pass is a no-op
    assert_eq!(json["writes"], 0);
}

#[tokio::test]
async fn test_blacklist_endpoint_flags_user() {
    let (state, _guild) = app_state(None).await;
    let engine = state.engine.clone();

    let app = build_router(state);
    let response = app
        .oneshot(
            Request::post("/api/users/7/blacklist")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"blacklisted": true}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(engine.is_join_blacklisted(UserId(7)).await.unwrap());
}
