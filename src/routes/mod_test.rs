use super::*;
use axum::http::Method;

use crate::state::test_helpers::{principal, seed_workspace, test_app_state};
use test_helpers::send;

#[tokio::test]
async fn healthz_is_open() {
    let (status, _) = send(app(test_app_state()), Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_404_not_401() {
    let (status, _) = send(app(test_app_state()), Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn me_without_session_is_401() {
    let (status, body) = send(app(test_app_state()), Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn me_returns_principal() {
    let user = principal(Some(Plan::Free));
    let (status, body) = send(app(test_app_state()), Method::GET, "/api/auth/me", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["subscription_plan"], "free");
}

#[tokio::test]
async fn notes_require_authentication() {
    let (status, _) = send(app(test_app_state()), Method::GET, "/api/notes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn notes_open_to_every_plan() {
    let state = test_app_state();
    for plan in Plan::ALL {
        let user = principal(Some(plan));
        seed_workspace(&state, user.id).await;
        let (status, body) = send(app(state.clone()), Method::GET, "/api/notes", Some(&user), None).await;
        assert_eq!(status, StatusCode::OK, "{plan}");
        assert_eq!(body, serde_json::json!([]));
    }
}

#[tokio::test]
async fn notes_admit_principal_without_plan() {
    let state = test_app_state();
    let user = principal(None);
    seed_workspace(&state, user.id).await;
    let (status, body) = send(app(state), Method::GET, "/api/notes", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn events_forbid_free_plan() {
    let user = principal(Some(Plan::Free));
    let (status, body) = send(app(test_app_state()), Method::GET, "/api/events", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Require PREMIUM or ENTERPRISE plan");
}

#[tokio::test]
async fn events_admit_enterprise() {
    let state = test_app_state();
    let user = principal(Some(Plan::Enterprise));
    seed_workspace(&state, user.id).await;
    let (status, _) = send(app(state), Method::GET, "/api/events", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn export_is_premium_only() {
    let user = principal(Some(Plan::Enterprise));
    let (status, body) = send(app(test_app_state()), Method::GET, "/api/export.jsonl", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Require PREMIUM plan");
}

#[test]
fn event_plans_exclude_free() {
    let plans = event_plans();
    assert!(!plans.contains(Plan::Free));
    assert!(plans.contains(Plan::Premium));
    assert!(plans.contains(Plan::Enterprise));
}
