//! `kiln config`: inspect configuration and write a starter file.

use std::path::PathBuf;

use crate::{
    cli::{ConfigCommands, ConfigInitArgs},
    config::{AppConfig, LOCAL_CONFIG_FILE},
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            output.print(&value)?;
        }

        ConfigCommands::List => {
            output.header("Current Configuration:")?;
            output.print(&to_toml(&config)?)?;
        }

        ConfigCommands::Path => match AppConfig::config_path() {
            Some(path) => output.print(&path.display().to_string())?,
            None => output.print(LOCAL_CONFIG_FILE)?,
        },

        ConfigCommands::Init(args) => {
            let path = write_default(&args)?;
            output.success(&format!("Wrote {}", path.display()))?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Look up a dotted key in the serialised config.
fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })?;

    let unknown = || CliError::ConfigError {
        message: format!("Unknown config key: '{key}'"),
        source: None,
    };
    let value = key
        .split('.')
        .try_fold(&tree, |node, part| node.get(part))
        .ok_or_else(unknown)?;

    Ok(match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Object(_) => return Err(unknown()),
        other => other.to_string(),
    })
}

fn to_toml(config: &AppConfig) -> CliResult<String> {
    toml::to_string_pretty(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })
}

fn write_default(args: &ConfigInitArgs) -> CliResult<PathBuf> {
    let path = match (&args.path, args.local) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from(LOCAL_CONFIG_FILE),
        (None, false) => AppConfig::config_path().ok_or_else(|| CliError::ConfigError {
            message: "no user config directory on this platform; use --local".into(),
            source: None,
        })?,
    };

    if path.exists() && !args.force {
        return Err(CliError::ConfigError {
            message: format!("{} already exists (use --force to overwrite)", path.display()),
            source: None,
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_cli_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, to_toml(&AppConfig::default())?)
        .with_cli_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_known_keys() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "defaults.python_version").unwrap(), "3.12");
        assert_eq!(get_config_value(&cfg, "defaults.layout").unwrap(), "nested");
        assert_eq!(get_config_value(&cfg, "tools.package_manager").unwrap(), "uv");
        assert_eq!(get_config_value(&cfg, "output.no_color").unwrap(), "false");
    }

    #[test]
    fn get_unknown_or_section_key_is_error() {
        let cfg = AppConfig::default();
        for key in ["does.not.exist", "defaults"] {
            assert!(matches!(
                get_config_value(&cfg, key),
                Err(CliError::ConfigError { .. })
            ));
        }
    }

    #[test]
    fn init_writes_loadable_defaults_and_refuses_to_clobber() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = ConfigInitArgs {
            local: false,
            force: false,
            path: Some(dir.path().join("kiln").join("config.toml")),
        };

        let path = write_default(&args).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: AppConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed, AppConfig::default());

        assert!(write_default(&args).is_err());
        assert!(write_default(&ConfigInitArgs { force: true, ..args }).is_ok());
    }
}
