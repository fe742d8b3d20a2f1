// src/system/settings.rs

use crate::core::paths::Installation;
use crate::models::InputStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize settings to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Installation-wide settings, stored in `<home>/settings.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// The container runtime used for sandboxed runs.
    pub sandbox_runtime: String,
    /// Where the working directory is mounted inside the sandbox.
    pub sandbox_app_path: String,
    /// How inputs are collected when no flag says otherwise.
    pub input_strategy: InputStrategy,
    /// The command the default builder runs in a formula's `src` directory.
    pub build_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sandbox_runtime: "docker".to_string(),
            sandbox_app_path: "/app".to_string(),
            input_strategy: InputStrategy::Prompt,
            build_command: "make build".to_string(),
        }
    }
}

/// Loads the settings of an installation, writing the defaults on first use.
pub fn load_settings(installation: &Installation) -> Result<Settings, SettingsError> {
    let settings_path = installation.settings_file();
    if !settings_path.exists() {
        let defaults = Settings::default();
        if let Some(dir) = settings_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&settings_path, toml::to_string_pretty(&defaults)?)?;
        log::debug!("Default settings written to '{}'", settings_path.display());
        Ok(defaults)
    } else {
        let content = fs::read_to_string(&settings_path)?;
        Ok(toml::from_str(&content)?)
    }
}
