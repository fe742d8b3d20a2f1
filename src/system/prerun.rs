// src/system/prerun.rs

//! The preparing phase: locate (or fetch) a formula's artifacts, stage them in
//! a per-run scratch directory and, when asked to, build a sandbox image.

use crate::constants::{DOCKERFILE, ENV_FILENAME};
use crate::core::commons;
use crate::core::paths::{self, Installation};
use crate::models::{Definition, FormulaConfig};
use crate::system::executor;
use crate::system::fetcher::{ArtifactFetcher, FetchError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Formula binary '{path}' is not installed and the formula has no repository URL.")]
    BinaryNotFound { path: PathBuf },
    #[error("Formula config '{path}' could not be found.")]
    ConfigNotFound { path: PathBuf },
    #[error("Formula config '{path}' is malformed: {source}")]
    ConfigDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PrepareError + '_ {
    move |source| PrepareError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where a prepared formula is going to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxMode {
    /// Sandboxing was not requested.
    Local,
    /// A sandbox image was built and is named `container_id`.
    Sandboxed { container_id: String },
    /// Sandboxing was requested but no usable container could be produced.
    FallbackToLocal { reason: String },
}

impl SandboxMode {
    /// The sandbox identifier, or an empty string when running locally.
    pub fn container_id(&self) -> &str {
        match self {
            Self::Sandboxed { container_id } => container_id,
            Self::Local | Self::FallbackToLocal { .. } => "",
        }
    }

    pub fn is_sandboxed(&self) -> bool {
        matches!(self, Self::Sandboxed { .. })
    }
}

/// The execution context of a single formula invocation.
///
/// The scratch directory is owned by the setup: it is removed by
/// [`Setup::release`], or when the setup is dropped after an early failure.
#[derive(Debug)]
pub struct Setup {
    pub pwd: PathBuf,
    pub bin_name: String,
    pub config: FormulaConfig,
    pub sandbox: SandboxMode,
    scratch: TempDir,
}

impl Setup {
    pub fn new(
        pwd: PathBuf,
        scratch: TempDir,
        bin_name: String,
        config: FormulaConfig,
        sandbox: SandboxMode,
    ) -> Self {
        Self {
            pwd,
            bin_name,
            config,
            sandbox,
            scratch,
        }
    }

    pub fn tmp_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn container_id(&self) -> &str {
        self.sandbox.container_id()
    }

    /// The staged executable.
    pub fn bin_file(&self) -> PathBuf {
        paths::bin_file_path(self.tmp_dir(), &self.bin_name)
    }

    /// The environment file handed to the sandbox runtime.
    pub fn env_file(&self) -> PathBuf {
        self.tmp_dir().join(ENV_FILENAME)
    }

    /// Deletes the scratch directory.
    pub fn release(self) -> std::io::Result<()> {
        self.scratch.close()
    }
}

/// Produces the `Setup` of a formula invocation.
pub trait PreRunner {
    fn pre_run(&self, def: &Definition, sandbox: bool) -> Result<Setup, PrepareError>;
}

/// Prepares formulas installed under an [`Installation`].
#[derive(Debug)]
pub struct DefaultPreRunner<F> {
    installation: Installation,
    sandbox_runtime: String,
    fetcher: F,
    pwd: Option<PathBuf>,
}

impl<F: ArtifactFetcher> DefaultPreRunner<F> {
    pub fn new(installation: Installation, sandbox_runtime: impl Into<String>, fetcher: F) -> Self {
        Self {
            installation,
            sandbox_runtime: sandbox_runtime.into(),
            fetcher,
            pwd: None,
        }
    }

    /// Uses `pwd` instead of the process working directory.
    pub fn with_pwd(mut self, pwd: impl Into<PathBuf>) -> Self {
        self.pwd = Some(pwd.into());
        self
    }

    /// Makes sure the binary and config of `def` exist under the installation,
    /// fetching them from the formula's repository when they don't.
    fn ensure_installed(&self, def: &Definition, bin_name: &str) -> Result<PathBuf, PrepareError> {
        let formula_dir = self.installation.formula_path(&def.path);
        let bin_dir = paths::bin_path(&formula_dir);
        let bin_file = paths::bin_file_path(&bin_dir, bin_name);

        if !bin_file.exists() {
            if def.repo_url.is_empty() {
                return Err(PrepareError::BinaryNotFound { path: bin_file });
            }
            let url = paths::bin_url(&def.repo_url, bin_name);
            log::info!("Formula '{}' not installed, fetching '{}'", def.path, url);
            self.fetcher.fetch_bundle(&url, &bin_dir)?;
            if !bin_file.exists() {
                return Err(PrepareError::BinaryNotFound { path: bin_file });
            }
        }

        let config_name = paths::config_name(&def.config);
        let config_file = paths::config_path(&formula_dir, config_name);
        if !config_file.exists() && !def.repo_url.is_empty() {
            self.fetcher
                .fetch_file(&paths::config_url(&def.repo_url, config_name), &config_file)?;
        }

        Ok(formula_dir)
    }

    /// Builds a sandbox image from the staged files, or explains why not.
    fn resolve_sandbox(&self, scratch: &Path) -> SandboxMode {
        if !scratch.join(DOCKERFILE).exists() {
            return SandboxMode::FallbackToLocal {
                reason: format!("formula has no {DOCKERFILE}"),
            };
        }
        if !executor::is_executable_in_path(&self.sandbox_runtime) {
            return SandboxMode::FallbackToLocal {
                reason: format!("'{}' is not installed", self.sandbox_runtime),
            };
        }

        let container_id = Uuid::new_v4().to_string();
        let build = format!("{} build -t {} .", self.sandbox_runtime, container_id);
        match executor::execute_command(&build, scratch, &HashMap::new()) {
            Ok(()) => SandboxMode::Sandboxed { container_id },
            Err(e) => SandboxMode::FallbackToLocal {
                reason: e.to_string(),
            },
        }
    }
}

impl<F: ArtifactFetcher> PreRunner for DefaultPreRunner<F> {
    fn pre_run(&self, def: &Definition, sandbox: bool) -> Result<Setup, PrepareError> {
        let bin_name = self.installation.bin_name(&def.bin);
        let formula_dir = self.ensure_installed(def, &bin_name)?;

        let config_file = paths::config_path(&formula_dir, paths::config_name(&def.config));
        let config = load_config(&config_file)?;

        let tmp_root = self.installation.tmp_root();
        fs::create_dir_all(&tmp_root).map_err(io_error(&tmp_root))?;
        let scratch = tempfile::Builder::new()
            .prefix("rit-")
            .tempdir_in(&tmp_root)
            .map_err(io_error(&tmp_root))?;

        let bin_dir = paths::bin_path(&formula_dir);
        commons::copy_dir(&bin_dir, scratch.path()).map_err(io_error(&bin_dir))?;
        make_executable(&paths::bin_file_path(scratch.path(), &bin_name))?;
        log::debug!(
            "Formula '{}' staged in '{}'",
            def.path,
            scratch.path().display()
        );

        let pwd = match &self.pwd {
            Some(pwd) => pwd.clone(),
            None => std::env::current_dir().map_err(io_error(Path::new(".")))?,
        };

        let mode = if sandbox {
            let mode = self.resolve_sandbox(scratch.path());
            if let SandboxMode::FallbackToLocal { reason } = &mode {
                log::warn!("Sandbox unavailable ({}), running '{}' locally.", reason, def.path);
            }
            mode
        } else {
            SandboxMode::Local
        };

        Ok(Setup::new(pwd, scratch, bin_name, config, mode))
    }
}

/// Reads a formula's `config.json`.
pub fn load_config(path: &Path) -> Result<FormulaConfig, PrepareError> {
    if !path.exists() {
        return Err(PrepareError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&content).map_err(|source| PrepareError::ConfigDecode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), PrepareError> {
    use std::os::unix::fs::PermissionsExt;

    if !path.exists() {
        return Ok(());
    }
    let mut permissions = fs::metadata(path).map_err(io_error(path))?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions).map_err(io_error(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), PrepareError> {
    Ok(())
}
