use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::config::StoreBackend;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let store_ok = state.store.health_check().await.is_ok();
    let redis_ok = state.cache.health_check().await;

    let status = if store_ok && redis_ok { "healthy" } else { "degraded" };
    let backend = match state.config.store {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };
    Json(json!({
        "status": status,
        "store": { "backend": backend, "ok": store_ok },
        "redis": redis_ok,
        "timestamp": chrono::Utc::now(),
    }))
}
