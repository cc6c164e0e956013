use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_path).await?;
        db::init_schema(&db).await?;
        Ok(Self { db, config })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let db = db::connect_in_memory().await;
        let config = Arc::new(AppConfig {
            database_path: ":memory:".into(),
        });
        Self { db, config }
    }
}
