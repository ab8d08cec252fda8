use axum::{
    http::HeaderValue,
    middleware as axum_mw,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use cache::Cache;
use config::Config;
use services::{MatchCache, Revalidator, RosterEngine};
use store::RosterStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RosterStore>,
    pub engine: RosterEngine,
    pub cache: Cache,
    pub config: Arc<Config>,
    pub revalidator: Revalidator,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RosterStore>, cache: Cache) -> Self {
        let revalidator = Revalidator::new(&config.revalidate);
        let engine = RosterEngine::new(
            store.clone(),
            MatchCache::new(
                cache.clone(),
                config.redis.match_ttl_secs,
                config.redis.invalidation_hold_secs,
            ),
            revalidator.clone(),
            config.roster,
        );
        Self {
            store,
            engine,
            cache,
            config: Arc::new(config),
            revalidator,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let list: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    base.allow_origin(AllowOrigin::list(list))
}

pub fn build_router(state: AppState) -> Router {
    let match_routes = Router::new()
        .route("/", post(routes::matches::create_match))
        .route("/:id", get(routes::matches::get_match))
        .route("/:id/roster", get(routes::matches::get_roster))
        .route("/:id/permissions", get(routes::matches::get_permissions))
        .route("/:id/join", post(routes::matches::join_match))
        .route("/:id/leave", post(routes::matches::leave_match))
        .route("/:id/friends", post(routes::matches::add_friend))
        .route("/:id/friends/:tempId", delete(routes::matches::remove_friend))
        .route("/:id/switch-team", post(routes::matches::switch_team))
        .route("/:id/block-spots", post(routes::matches::block_spots))
        .route("/:id/substitute", post(routes::matches::request_substitute))
        .route(
            "/:id/substitute/cancel",
            post(routes::matches::cancel_substitute),
        )
        .route("/:id/sort-teams", post(routes::matches::sort_teams))
        .route("/:id/cancel", post(routes::matches::cancel_match))
        .route("/:id/finish", post(routes::matches::finish_match))
        .route(
            "/:id/players/:playerId/remove",
            post(routes::matches::remove_player),
        )
        .route(
            "/:id/players/:playerId/flags",
            patch(routes::matches::update_player_flags),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let api = Router::new().nest("/matches", match_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
