//! Application configuration.
//!
//! The file is TOML and carries an explicit `version`. Older layouts are
//! migrated in [`upgrade`] before deserialization so the rest of the crate
//! only ever sees the current shape.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AppError, AppResult};

pub const CURRENT_VERSION: i64 = 2;
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Keys the version 1 file kept at the top level.
const LEGACY_UI_KEYS: [&str; 3] = ["theme", "primary_color", "sidebar_order"];
const LEGACY_GRAPH_KEYS: [&str; 2] = ["tenant_id", "client_id"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "current_version")]
    pub version: i64,
    /// Root for the database and bucket store; defaults to `./.helpdesk`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            data_dir: None,
            storage: StorageConfig::default(),
            graph: GraphConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket root; `<data_dir>/buckets` when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default = "default_graph_base")]
    pub graph_base: String,
    /// Upper bound on `@odata.nextLink` pages followed per collection.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            authority: default_authority(),
            graph_base: default_graph_base(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub sidebar_order: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            primary_color: None,
            sidebar_order: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `helpdesk_lib=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn current_version() -> i64 {
    CURRENT_VERSION
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_graph_base() -> String {
    DEFAULT_GRAPH_BASE.to_string()
}

fn default_max_pages() -> usize {
    50
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_theme() -> String {
    "system".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    /// Environment overrides are applied last.
    pub fn load(path: &Path) -> AppResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
                .map_err(|err| AppError::Config(format!("{}: {err}", path.display())))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let value: toml::Value = toml::from_str(content)?;
        let upgraded = upgrade(value)?;
        let config: AppConfig = upgraded.try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|err| AppError::Config(err.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        if self.graph.max_pages == 0 {
            errors.push("graph.max_pages must be positive");
        }
        if self.graph.timeout_secs == 0 {
            errors.push("graph.timeout_secs must be positive");
        }
        if !self.graph.authority.starts_with("http") {
            errors.push("graph.authority must be an http(s) url");
        }
        if !self.graph.graph_base.starts_with("http") {
            errors.push("graph.graph_base must be an http(s) url");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(errors.join("; ")))
        }
    }

    /// `HELPDESK_DATA_DIR` and `HELPDESK_LOG` win over the file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("HELPDESK_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("HELPDESK_LOG").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    pub fn resolved_data_dir(&self) -> AppResult<PathBuf> {
        crate::db::default_data_dir(self.data_dir.clone())
    }

    pub fn resolved_storage_root(&self) -> AppResult<PathBuf> {
        match &self.storage.root {
            Some(root) => Ok(root.clone()),
            None => Ok(self.resolved_data_dir()?.join("buckets")),
        }
    }
}

/// Migrates a raw config table to [`CURRENT_VERSION`].
///
/// A file without `version` is treated as version 1: its flat UI and tenant
/// keys move under `[ui]` and `[graph]`.
pub fn upgrade(value: toml::Value) -> AppResult<toml::Value> {
    let toml::Value::Table(mut table) = value else {
        return Err(AppError::Config("config root must be a table".to_string()));
    };
    let version = match table.get("version") {
        None => 1,
        Some(toml::Value::Integer(v)) => *v,
        Some(other) => {
            return Err(AppError::Config(format!("version must be an integer, got {other}")));
        }
    };

    match version {
        1 => {
            let mut ui = take_section(&mut table, "ui")?;
            for key in LEGACY_UI_KEYS {
                if let Some(v) = table.remove(key) {
                    ui.insert(key.to_string(), v);
                }
            }
            let mut graph = take_section(&mut table, "graph")?;
            for key in LEGACY_GRAPH_KEYS {
                if let Some(v) = table.remove(key) {
                    graph.insert(key.to_string(), v);
                }
            }
            table.insert("ui".to_string(), toml::Value::Table(ui));
            table.insert("graph".to_string(), toml::Value::Table(graph));
            table.insert("version".to_string(), toml::Value::Integer(CURRENT_VERSION));
            tracing::info!("upgraded config from version 1");
            Ok(toml::Value::Table(table))
        }
        CURRENT_VERSION => Ok(toml::Value::Table(table)),
        other => Err(AppError::Config(format!(
            "unsupported config version {other} (this build understands up to {CURRENT_VERSION})"
        ))),
    }
}

fn take_section(table: &mut toml::Table, key: &str) -> AppResult<toml::Table> {
    match table.remove(key) {
        None => Ok(toml::Table::new()),
        Some(toml::Value::Table(section)) => Ok(section),
        Some(_) => Err(AppError::Config(format!("[{key}] must be a table"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.graph.authority, DEFAULT_AUTHORITY);
        assert_eq!(config.graph.max_pages, 50);
    }

    #[test]
    fn version_one_flat_keys_are_upgraded() {
        let legacy = r#"
            theme = "dark"
            sidebar_order = ["tickets", "devices"]
            tenant_id = "contoso"
            client_id = "app-123"
        "#;
        let config = AppConfig::from_toml_str(legacy).unwrap();
        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.ui.theme, "dark");
        assert_eq!(config.ui.sidebar_order, vec!["tickets", "devices"]);
        assert_eq!(config.graph.tenant_id, "contoso");
        assert_eq!(config.graph.client_id, "app-123");
        assert_eq!(config.graph.graph_base, DEFAULT_GRAPH_BASE);
    }

    #[test]
    fn current_version_parses_sections() {
        let current = r#"
            version = 2
            data_dir = "/srv/helpdesk"

            [graph]
            tenant_id = "t"
            client_id = "c"
            max_pages = 3

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::from_toml_str(current).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/helpdesk")));
        assert_eq!(config.graph.max_pages, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn future_version_is_rejected() {
        let err = AppConfig::from_toml_str("version = 7").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn zero_max_pages_fails_validation() {
        let err = AppConfig::from_toml_str("version = 2\n[graph]\nmax_pages = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_pages"));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "HELPDESK_DATA_DIR" => Some("/tmp/hd".to_string()),
            "HELPDESK_LOG" => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/hd")));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn save_then_load_keeps_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("helpdesk.toml");
        let mut config = AppConfig::default();
        config.graph.tenant_id = "contoso".to_string();
        config.save(&path).unwrap();
        let loaded = AppConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.graph.tenant_id, "contoso");
    }
}
