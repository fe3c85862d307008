use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::db;
use crate::media::MediaStore;
use crate::repository::{PromptRepository, SqlitePromptRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub repo: Arc<dyn PromptRepository>,
    pub media: MediaStore,
    /// Author of prompts created without one
    pub system_user_id: String,
}

impl AppState {
    /// Open the database, apply migrations and resolve the system user.
    pub fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let pool = db::create_pool(&config.db_path())?;
        db::run_migrations(&pool)?;
        let system_user_id = db::ensure_system_user(&pool, &config.prompts.system_user)?;

        let media = MediaStore::new(config.media_path(), config.storage.max_upload_bytes);
        std::fs::create_dir_all(media.root())?;

        Ok(Self {
            repo: Arc::new(SqlitePromptRepository::new(pool.clone())),
            db: pool,
            config,
            media,
            system_user_id,
        })
    }
}
