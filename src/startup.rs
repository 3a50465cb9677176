use crate::config::Config;
use crate::db::connection::{DbPool, pool_stats};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Pings the pool once a minute so a dead database shows up in the logs
/// before the next request hits it.
pub fn spawn_db_health_check(db: DbPool) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match db.acquire().await {
                Ok(conn) => {
                    drop(conn);
                    debug!("{}", pool_stats(&db));
                }
                Err(e) => {
                    error!("Database connection health check failed: {}", e);
                }
            }
        }
    });
}
