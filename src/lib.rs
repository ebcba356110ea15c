pub mod admin;
pub mod commands;
pub mod config;
pub mod core;
pub mod csv_format;
pub mod db;
pub mod extractor;
pub mod importer;
pub mod providers;
pub mod security;
pub mod storage;
pub mod sync;

use crate::config::AppConfig;
use crate::core::errors::AppResult;
use crate::db::Database;
use crate::storage::BucketStore;
use tracing_subscriber::EnvFilter;

fn sqlx_debug_enabled() -> bool {
    matches!(
        std::env::var("HELPDESK_SQLX_DEBUG")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn log_filter(level: &str, sqlx_debug: bool) -> EnvFilter {
    let base = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    if sqlx_debug {
        base
    } else {
        match "sqlx::query=warn".parse() {
            Ok(directive) => base.add_directive(directive),
            Err(_) => base,
        }
    }
}

/// Installs the global subscriber. `level` is usually the resolved
/// `logging.level` (which `HELPDESK_LOG` already overrides).
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, sqlx_debug_enabled()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: BucketStore,
    pub config: AppConfig,
}

impl AppState {
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let data_dir = config.resolved_data_dir()?;
        let db = Database::new(&data_dir).await?;
        let store = BucketStore::new(config.resolved_storage_root()?)?;
        tracing::info!(data_dir = %data_dir.display(), "helpdesk state ready");
        Ok(Self { db, store, config })
    }
}
