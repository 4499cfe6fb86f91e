//! Settings file management
//!
//! The settings file lists the configuration kinds the CLI knows about:
//!
//! ```toml
//! schema_dir = "/opt/opennms/share/xsds"
//!
//! [[kinds]]
//! name = "vacuumd"
//! schema = "vacuumd-configuration.xsd"
//! root_element = "VacuumdConfiguration"
//!
//! [kinds.value_names]
//! statement = "sql"
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use xmlconf_config::ConfigDefinition;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory schema resources are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,

    #[serde(default)]
    pub kinds: Vec<ConfigDefinition>,
}

impl Settings {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;

        let mut names: Vec<&str> = settings.kinds.iter().map(|k| k.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            bail!("kind '{}' is defined more than once", pair[0]);
        }

        Ok(settings)
    }

    pub fn kind(&self, name: &str) -> Result<&ConfigDefinition> {
        self.kinds.iter().find(|k| k.name == name).ok_or_else(|| {
            let known: Vec<&str> = self.kinds.iter().map(|k| k.name.as_str()).collect();
            anyhow!("unknown kind '{name}' (known kinds: {})", known.join(", "))
        })
    }
}

/// Get the default settings file path
pub fn default_settings_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "opennms", "xmlconf")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("settings.toml"))
}

/// Load settings from `path`, or from the default location.
///
/// An explicit path must exist; a missing default file yields empty settings.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_settings_path()?, false),
    };

    if !explicit && !path.exists() {
        debug!("no settings file at {:?}", path);
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file: {:?}", path))?;
    let mut settings = Settings::from_toml(&contents)
        .with_context(|| format!("Failed to parse settings file: {:?}", path))?;

    // relative schema directories are relative to the settings file
    if let (Some(dir), Some(parent)) = (settings.schema_dir.as_mut(), path.parent()) {
        if dir.is_relative() {
            *dir = parent.join(&*dir);
        }
    }

    Ok(settings)
}

/// Parse an `element=key` value-name override.
pub fn parse_value_name(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((element, key)) if !element.is_empty() && !key.is_empty() => {
            Ok((element.to_owned(), key.to_owned()))
        }
        _ => bail!("expected ELEMENT=KEY, got '{arg}'"),
    }
}
