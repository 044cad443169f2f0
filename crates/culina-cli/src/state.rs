//! Application state wiring the infrastructure together.
//!
//! `AppState` holds the configuration and concrete repository instances
//! used by the chat loop and the listing commands. The pipeline is generic
//! over repository traits; AppState pins them to the SQLite
//! implementations.

use std::path::PathBuf;
use std::sync::Arc;

use culina_infra::config::{load_chat_config, resolve_data_dir};
use culina_infra::sqlite::catalog::SqliteRecipeCatalog;
use culina_infra::sqlite::pool::DatabasePool;
use culina_infra::sqlite::transcript::SqliteTranscriptRepository;
use culina_types::config::ChatConfig;

/// Shared application state for all CLI commands.
pub struct AppState {
    pub config: Arc<ChatConfig>,
    pub transcripts: Arc<SqliteTranscriptRepository>,
    pub catalog: Arc<SqliteRecipeCatalog>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// configuration, open the database, wire repositories.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = Arc::new(load_chat_config(&data_dir).await);
        let db_pool = DatabasePool::open_in_data_dir(&data_dir).await?;

        let transcripts = Arc::new(SqliteTranscriptRepository::new(db_pool.clone()));
        let catalog = Arc::new(SqliteRecipeCatalog::new(db_pool.clone()));

        Ok(Self {
            config,
            transcripts,
            catalog,
            data_dir,
            db_pool,
        })
    }
}
