// src/core/paths.rs

//! Resolution of a formula's on-disk and remote artifact locations.
//!
//! Nothing here touches the filesystem except [`Installation::discover`]: the
//! resolver functions only build paths and URLs from an explicit
//! [`Installation`], so tests can pick any home directory and OS.

use crate::constants::{
    BIN_DIR, DEFAULT_CONFIG, FORMULAS_DIR, HOME_DIRNAME, HOME_ENV, OS_PLACEHOLDER, REPO_DIR,
    SETTINGS_FILENAME, TMP_DIR, TREE_FILENAME,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffixes that already make a file runnable on Windows.
const WINDOWS_EXEC_SUFFIXES: &[&str] = &[".exe", ".bat", ".cmd"];

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the user's home directory.")]
    HomeDirNotFound,
    #[error("Could not expand installation path '{template}': {reason}")]
    Expansion { template: String, reason: String },
    #[error("Could not create installation directory at '{path}': {source}")]
    HomeDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The operating system formulas are resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl Os {
    /// Detects the operating system this binary was compiled for.
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    /// Maps a platform name (`linux`, `macos`/`darwin`, `windows`) to an `Os`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::Darwin,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }

    /// The identifier substituted for `${so}` in binary templates.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
            Self::Other(name) => name,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Where formulas are installed and which platform they run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub home: PathBuf,
    pub os: Os,
}

impl Installation {
    pub fn new(home: impl Into<PathBuf>, os: Os) -> Self {
        Self {
            home: home.into(),
            os,
        }
    }

    /// Locates the installation home (`$RIT_HOME` or `~/.rit`) for the current
    /// OS, creating the directory when it doesn't exist yet.
    pub fn discover() -> Result<Self, PathError> {
        let home = match std::env::var(HOME_ENV) {
            Ok(template) if !template.trim().is_empty() => expand_home_template(&template)?,
            _ => dirs::home_dir()
                .ok_or(PathError::HomeDirNotFound)?
                .join(HOME_DIRNAME),
        };

        if !home.exists() {
            fs::create_dir_all(&home).map_err(|e| PathError::HomeDirCreation {
                path: home.display().to_string(),
                source: e,
            })?;
        }
        log::debug!("Installation home resolved to '{}'", home.display());

        Ok(Self::new(home, Os::current()))
    }

    /// `<home>/formulas/<path>`
    pub fn formula_path(&self, path: &str) -> PathBuf {
        self.home.join(FORMULAS_DIR).join(path)
    }

    /// Substitutes the OS placeholder in `bin` and appends `.exe` on Windows,
    /// unless the name already carries an executable suffix.
    pub fn bin_name(&self, bin: &str) -> String {
        let resolved = bin.replace(OS_PLACEHOLDER, self.os.identifier());
        if self.os.is_windows()
            && !WINDOWS_EXEC_SUFFIXES
                .iter()
                .any(|suffix| resolved.ends_with(suffix))
        {
            format!("{resolved}.exe")
        } else {
            resolved
        }
    }

    /// `<home>/repo`
    pub fn repo_root(&self) -> PathBuf {
        self.home.join(REPO_DIR)
    }

    /// `<home>/repo/<repo>/tree.json`
    pub fn tree_file(&self, repo: &str) -> PathBuf {
        self.repo_root().join(repo).join(TREE_FILENAME)
    }

    /// `<home>/tmp`, the parent of every per-run scratch directory.
    pub fn tmp_root(&self) -> PathBuf {
        self.home.join(TMP_DIR)
    }

    /// `<home>/settings.toml`
    pub fn settings_file(&self) -> PathBuf {
        self.home.join(SETTINGS_FILENAME)
    }

    /// `<home>/.<input>.cache`
    pub fn input_cache_file(&self, input_name: &str) -> PathBuf {
        self.home.join(format!(".{input_name}.cache"))
    }
}

/// `<formula_dir>/bin`
pub fn bin_path(formula_dir: &Path) -> PathBuf {
    formula_dir.join(BIN_DIR)
}

/// `<bin_path>/<bin_name>`
pub fn bin_file_path(bin_path: &Path, bin_name: &str) -> PathBuf {
    bin_path.join(bin_name)
}

/// `<repo_url>/bin/<bin_name>.zip`
pub fn bin_url(repo_url: &str, bin_name: &str) -> String {
    format!("{repo_url}/bin/{bin_name}.zip")
}

/// The configured config name, or `config.json`.
pub fn config_name(config_override: &str) -> &str {
    if config_override.is_empty() {
        DEFAULT_CONFIG
    } else {
        config_override
    }
}

/// `<formula_dir>/<config_name>`
pub fn config_path(formula_dir: &Path, config_name: &str) -> PathBuf {
    formula_dir.join(config_name)
}

/// `<repo_url>/<config_name>`
pub fn config_url(repo_url: &str, config_name: &str) -> String {
    format!("{repo_url}/{config_name}")
}

/// Expands `~` and environment variables in a user supplied home path.
fn expand_home_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
