pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;

use tracing::info;

use crate::commands::AppState;
use crate::config::InsightsConfig;
use crate::db::DbPool;
use crate::error::AppResult;

const DATABASE_FILE: &str = "tempo.sqlite";

/// Initialise logging, open the database under `data_dir` and build the
/// shared state from environment configuration.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    crate::utils::logger::init_logging(&data_dir.join("logs"))?;

    let config = InsightsConfig::from_env()?;
    let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
    info!(
        target: "app::db",
        db_path = %pool.path().display(),
        "database ready"
    );

    AppState::new(pool, config)
}
