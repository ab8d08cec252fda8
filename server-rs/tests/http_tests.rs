use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use matchday_api::cache::Cache;
use matchday_api::config::{Config, StoreBackend};
use matchday_api::middleware::auth::Claims;
use matchday_api::models::{CapacityClass, Match, MatchStatus, UserAccount};
use matchday_api::store::MemoryRosterStore;
use matchday_api::{build_router, AppState};

const SECRET: &str = "http-test-secret";

fn app(store: &MemoryRosterStore) -> Router {
    let mut config = Config::from_env();
    config.jwt.secret = SECRET.to_string();
    config.store = StoreBackend::Memory;
    config.cors_origins = vec!["*".to_string()];
    build_router(AppState::new(
        config,
        Arc::new(store.clone()),
        Cache::disabled(),
    ))
}

fn token(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp: now + 3600,
            iat: now,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn seed_user(store: &MemoryRosterStore, balance_cents: i64, is_admin: bool) -> Uuid {
    let id = Uuid::new_v4();
    store
        .seed_user(UserAccount {
            id,
            display_name: "Player".into(),
            balance_cents,
            is_admin,
        })
        .await;
    id
}

async fn seed_match(store: &MemoryRosterStore, occupied: i32) -> Uuid {
    let id = Uuid::new_v4();
    store
        .seed_match(Match {
            id,
            location: "Can Dragó".into(),
            starts_at: Utc::now() + Duration::days(3),
            duration_minutes: 60,
            price_cents: 500,
            capacity_class: CapacityClass::F7,
            gender: "mixed".into(),
            places_occupied: occupied,
            block_spots_team1: 0,
            block_spots_team2: 0,
            has_teams: false,
            status: MatchStatus::Active,
        })
        .await;
    id
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_memory_store() {
    let store = MemoryRosterStore::new();
    let (status, body) = send(&app(&store), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["ok"], true);
    // Redis is disabled in tests.
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let store = MemoryRosterStore::new();
    let m = seed_match(&store, 0).await;
    let (status, body) = send(
        &app(&store),
        "POST",
        &format!("/api/v1/matches/{m}/join"),
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_match_id_is_a_validation_error() {
    let store = MemoryRosterStore::new();
    let user = seed_user(&store, 0, false).await;
    let (status, body) = send(
        &app(&store),
        "POST",
        "/api/v1/matches/not-a-uuid/join",
        Some(user),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MATCH_ID_INVALID");
}

#[tokio::test]
async fn join_and_full_match_over_http() {
    let store = MemoryRosterStore::new();
    let app = app(&store);
    let a = seed_user(&store, 1000, false).await;
    let b = seed_user(&store, 1000, false).await;
    let m = seed_match(&store, 13).await;
    let uri = format!("/api/v1/matches/{m}/join");

    let (status, body) = send(&app, "POST", &uri, Some(a), Some(json!({"withBalance": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "PLAYER_JOINED_SUCCESSFULLY");
    assert_eq!(body["metadata"]["updated_places_occupied"], 14);
    assert_eq!(body["metadata"]["new_balance"], 500);

    let (status, body) = send(&app, "POST", &uri, Some(b), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "MATCH_FULL");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn leave_accepts_an_empty_body() {
    let store = MemoryRosterStore::new();
    let app = app(&store);
    let a = seed_user(&store, 0, false).await;
    let m = seed_match(&store, 0).await;

    send(&app, "POST", &format!("/api/v1/matches/{m}/join"), Some(a), Some(json!({}))).await;
    let (status, body) = send(&app, "POST", &format!("/api/v1/matches/{m}/leave"), Some(a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "PLAYER_LEFT_SUCCESSFULLY");
    assert_eq!(body["metadata"]["updated_places_occupied"], 0);
}

#[tokio::test]
async fn only_global_admins_create_matches() {
    let store = MemoryRosterStore::new();
    let app = app(&store);
    let admin = seed_user(&store, 0, true).await;
    let plain = seed_user(&store, 0, false).await;
    let payload = json!({
        "location": "Camp Municipal de Sants",
        "startsAt": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "durationMinutes": 60,
        "priceCents": 550,
        "capacityClass": "F8",
        "gender": "mixed",
    });

    let (status, body) = send(&app, "POST", "/api/v1/matches", Some(plain), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, "POST", "/api/v1/matches", Some(admin), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], "MATCH_CREATED_SUCCESSFULLY");
    let id: Uuid = serde_json::from_value(body["metadata"]["match"]["id"].clone()).unwrap();

    let (status, body) = send(&app, "GET", &format!("/api/v1/matches/{id}"), Some(plain), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["match"]["places_occupied"], 0);
    assert_eq!(body["metadata"]["match"]["status"], "active");
}

#[tokio::test]
async fn invalid_body_keeps_the_envelope() {
    let store = MemoryRosterStore::new();
    let app = app(&store);
    let admin = seed_user(&store, 0, true).await;
    let m = seed_match(&store, 0).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/matches/{m}/block-spots"),
        Some(admin),
        Some(json!({"team": "left"})),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["success"], false);
}
