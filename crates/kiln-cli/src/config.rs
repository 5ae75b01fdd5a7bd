//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `KILN_*` environment variables, `__` between nested keys
//!    (`KILN_TOOLS__PACKAGE_MANAGER=uv`)
//! 3. `./.kiln.toml`
//! 4. The `--config` file, or the platform config file
//! 5. Built-in defaults (always present)

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use kiln_core::{
    application::RouterConfig,
    domain::{DEFAULT_PYTHON_VERSION, Layout, ScriptEntry},
};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// File name of the per-directory config.
pub const LOCAL_CONFIG_FILE: &str = ".kiln.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Defaults for the project options.
    pub defaults: Defaults,
    /// Output settings.
    pub output: OutputConfig,
    /// External tool settings.
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub python_version: String,
    pub layout: Layout,
    pub script_entry: ScriptEntry,
    pub editable_install: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub package_manager: String,
    pub fastapi_archive_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            output: OutputConfig::default(),
            tools: ToolsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            python_version: DEFAULT_PYTHON_VERSION.into(),
            layout: Layout::default(),
            script_entry: ScriptEntry::default(),
            editable_install: false,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let router = RouterConfig::default();
        Self {
            package_manager: router.package_manager,
            fastapi_archive_url: router.web_app_archive_url,
        }
    }
}

impl AppConfig {
    /// Load configuration, layering files and environment over the defaults.
    ///
    /// An explicit `config_file` must exist; the default locations are
    /// optional.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        Self::load_from(config_file, Self::config_path().as_deref(), Path::new(LOCAL_CONFIG_FILE))
    }

    fn load_from(
        explicit: Option<&PathBuf>,
        user: Option<&Path>,
        local: &Path,
    ) -> anyhow::Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("encoding default config")?;
        let mut builder = Config::builder().add_source(defaults);

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = user {
                    builder = builder
                        .add_source(File::from(path).format(FileFormat::Toml).required(false));
                }
            }
        }

        let config = builder
            .add_source(File::from(local).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("KILN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("reading configuration sources")?;

        config
            .try_deserialize()
            .context("configuration has invalid values")
    }

    /// Path to the user configuration file, if the platform has one.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "kiln", "kiln")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Router settings derived from the `tools` section.
    pub fn router_config(&self, install: bool) -> RouterConfig {
        RouterConfig {
            package_manager: self.tools.package_manager.clone(),
            web_app_archive_url: self.tools.fastapi_archive_url.clone(),
            install,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn missing(dir: &TempDir) -> PathBuf {
        dir.path().join("nope.toml")
    }

    #[test]
    fn defaults_match_core() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.defaults.python_version, "3.12");
        assert_eq!(cfg.defaults.layout, Layout::Nested);
        assert_eq!(cfg.tools.package_manager, "uv");
        assert!(cfg.tools.fastapi_archive_url.ends_with(".tar.gz"));
    }

    #[test]
    fn load_without_files_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(None, Some(&missing(&dir)), &missing(&dir)).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn local_file_overrides_user_file() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.toml");
        let local = dir.path().join("local.toml");
        fs::write(&user, "[defaults]\npython_version = \"3.11\"\nlayout = \"flat\"\n").unwrap();
        fs::write(&local, "[defaults]\npython_version = \"3.13\"\n").unwrap();

        let cfg = AppConfig::load_from(None, Some(&user), &local).unwrap();
        assert_eq!(cfg.defaults.python_version, "3.13");
        assert_eq!(cfg.defaults.layout, Layout::Flat);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let explicit = missing(&dir);
        assert!(AppConfig::load_from(Some(&explicit), None, &missing(&dir)).is_err());
    }

    #[test]
    fn invalid_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.toml");
        fs::write(&file, "[defaults]\nlayout = \"sideways\"\n").unwrap();
        assert!(AppConfig::load_from(Some(&file), None, &missing(&dir)).is_err());
    }

    #[test]
    fn router_config_uses_tools_section() {
        let mut cfg = AppConfig::default();
        cfg.tools.package_manager = "/opt/uv".into();
        let router = cfg.router_config(false);
        assert_eq!(router.package_manager, "/opt/uv");
        assert!(!router.install);
    }
}
