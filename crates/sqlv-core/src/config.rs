//! Configuration management for sqlv
//!
//! Loads configuration with priority:
//! 1. sqlv.toml (or specified config file)
//! 2. Environment variables (`SQLV_BASE_URL`, `${VAR}` references)
//! 3. Defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "sqlv.toml";

/// sqlv configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlvConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the console backend (can reference env var with ${VAR_NAME})
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// How concurrent table loads are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOrdering {
    /// Every resolved load replaces the view; the last one to resolve wins.
    #[default]
    Completion,
    /// A resolved load is applied only while its table is still the latest request.
    Selection,
}

/// Table view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Rows requested per table load
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub load_ordering: LoadOrdering,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub json_logs: bool,

    pub service_name: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            load_ordering: LoadOrdering::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: None,
        }
    }
}

impl SqlvConfig {
    /// Load configuration with the following priority:
    /// 1. sqlv.toml in current directory or a parent
    /// 2. Environment variables
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file.
    ///
    /// An explicit path must exist. Without one, a missing sqlv.toml falls back
    /// to defaults.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_config_file()?,
        };

        let mut config = match config_path {
            Some(config_path) => {
                tracing::debug!("Loading configuration from: {:?}", config_path);

                let contents = fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

                Self::from_toml(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };

        config.resolve_env_vars();

        Ok(config)
    }

    /// Parse configuration from TOML text without touching the environment.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: SqlvConfig = toml::from_str(contents)?;
        if config.view.page_size == 0 {
            anyhow::bail!("view.page_size must be greater than zero");
        }
        Ok(config)
    }

    /// Find sqlv.toml by searching current directory and parents
    fn find_config_file() -> Result<Option<PathBuf>> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Resolve ${VAR_NAME} references and the SQLV_BASE_URL override
    fn resolve_env_vars(&mut self) {
        if let Some(resolved) = Self::resolve_env_var(&self.gateway.base_url) {
            self.gateway.base_url = resolved;
        }

        if let Ok(url) = env::var("SQLV_BASE_URL") {
            if !url.trim().is_empty() {
                self.gateway.base_url = url;
            }
        }

        if let Some(ref name) = self.observability.service_name {
            self.observability.service_name = Self::resolve_env_var(name);
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SqlvConfig::default();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.view.page_size, 100);
        assert_eq!(config.view.load_ordering, LoadOrdering::Completion);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = SqlvConfig::from_toml(
            r#"
            [view]
            load_ordering = "selection"
            "#,
        )
        .unwrap();

        assert_eq!(config.view.load_ordering, LoadOrdering::Selection);
        assert_eq!(config.view.page_size, 100);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = SqlvConfig::from_toml("[view]\npage_size = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gateway]\nbase_url = \"http://db.internal:8000\"").unwrap();

        let config = SqlvConfig::load_from(Some(file.path())).unwrap();
        // SQLV_BASE_URL may be set in the environment running the tests
        if env::var("SQLV_BASE_URL").is_err() {
            assert_eq!(config.gateway.base_url, "http://db.internal:8000");
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = SqlvConfig::load_from(Some(Path::new("/nonexistent/sqlv.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_env_var() {
        unsafe {
            env::set_var("SQLV_TEST_VAR", "test_value");
        }

        let resolved = SqlvConfig::resolve_env_var("${SQLV_TEST_VAR}");
        assert_eq!(resolved, Some("test_value".to_string()));

        let not_var = SqlvConfig::resolve_env_var("plain_value");
        assert_eq!(not_var, Some("plain_value".to_string()));

        unsafe {
            env::remove_var("SQLV_TEST_VAR");
        }
    }
}
