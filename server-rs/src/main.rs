use std::sync::Arc;

use matchday_api::cache::Cache;
use matchday_api::config::{Config, StoreBackend};
use matchday_api::store::{MemoryRosterStore, PgRosterStore, RosterStore};
use matchday_api::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let store: Arc<dyn RosterStore> = match config.store {
        StoreBackend::Postgres => Arc::new(PgRosterStore::new(db::create_pool(&config).await?)),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryRosterStore::new())
        }
    };
    let cache = Cache::connect(&config).await;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, store, cache);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Matchday API listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
