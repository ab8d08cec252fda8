use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;
use crate::store::StoreResult;

pub async fn create_pool(config: &Config) -> StoreResult<PgPool> {
    let url = config.database_url();
    let pool = PgPoolOptions::new()
        .min_connections(config.db.pool_min)
        .max_connections(config.db.pool_max)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&url)
        .await?;

    if config.db.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}
