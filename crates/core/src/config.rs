//! Application configuration.
//!
//! Settings are read from `config.toml` under the user's config directory and
//! can be overridden with `MEEPLE_*` environment variables, using `__` to
//! reach nested keys (for example `MEEPLE_LOOKUP__REPORT_ERRORS=true`).

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory name used below the platform config and data directories.
pub const APP_DIR: &str = "meeple";

const CONFIG_FILE: &str = "config.toml";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the collection file, covers and logs live.
    pub data_dir: PathBuf,
    /// Remote metadata lookup settings.
    pub lookup: LookupConfig,
    /// Export settings.
    pub export: ExportConfig,
}

/// Settings for the BoardGameGeek lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Search endpoint, queried with `query`, `type` and `exact`.
    pub search_endpoint: String,
    /// Item endpoint, queried with `id` and `stats`.
    pub thing_endpoint: String,
    /// Surface request and parse failures instead of reporting no results.
    pub report_errors: bool,
    /// Per-request timeout. Unset means the HTTP client default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Settings for the clipboard export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// How long the "copied" confirmation stays visible.
    pub banner_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lookup: LookupConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            search_endpoint: "https://boardgamegeek.com/xmlapi2/search".to_string(),
            thing_endpoint: "https://boardgamegeek.com/xmlapi2/thing".to_string(),
            report_errors: false,
            timeout_secs: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { banner_seconds: 5 }
    }
}

impl LookupConfig {
    /// Configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ExportConfig {
    /// Duration of the export confirmation banner.
    pub fn banner_duration(&self) -> Duration {
        Duration::from_secs(self.banner_seconds)
    }
}

impl AppConfig {
    /// Load settings from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load settings from `path` plus environment overrides. A missing file
    /// yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("MEEPLE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Directory holding log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Default location of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write the default config file if none exists yet and return its path.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let serialized =
        toml::to_string_pretty(&AppConfig::default()).context("failed to serialize config")?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write config {}", path.display()))?;
    info!(path = %path.display(), "Default configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.lookup, LookupConfig::default());
        assert_eq!(config.export.banner_seconds, 5);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"data_dir = "/tmp/meeple-test"

[lookup]
report_errors = true
timeout_secs = 12
"#,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/tmp/meeple-test"));
        assert!(config.lookup.report_errors);
        assert_eq!(config.lookup.timeout(), Some(Duration::from_secs(12)));
        assert_eq!(
            config.lookup.search_endpoint,
            LookupConfig::default().search_endpoint
        );
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/meeple-test/logs"));
        Ok(())
    }

    #[test]
    fn default_config_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        fs::write(&path, "[export]\nbanner_seconds = 9\n")?;
        write_default_config(&path)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.export.banner_seconds, 9);
        Ok(())
    }
}
