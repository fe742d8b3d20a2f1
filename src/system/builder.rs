// src/system/builder.rs

//! Building a workspace formula and syncing the result into the
//! installation, so the formula can be run like any installed one.

use crate::constants::{BUILD_LOCK_FILENAME, LOCAL_REPO, SRC_DIR, TREE_FILENAME, WORKSPACE_TREE_DIR};
use crate::core::commons;
use crate::core::paths::{self, Installation};
use crate::core::tree_store::{self, StoreError};
use crate::state::TreeJournal;
use crate::system::executor::{self, ExecutionError};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Formula sources '{path}' do not exist.")]
    SourceNotFound { path: PathBuf },
    #[error("Build produced no output in '{path}'.")]
    OutputNotFound { path: PathBuf },
    #[error("Build command failed: {0}")]
    Command(#[from] ExecutionError),
    #[error("Filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not lock '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tree(#[from] StoreError),
    #[error("{0}")]
    Other(String),
}

/// Compiles a formula of a workspace into `<workspace>/<formula>/bin`.
pub trait Builder {
    fn build(&self, workspace: &Path, formula_path: &str) -> Result<(), BuildError>;
}

impl<F> Builder for F
where
    F: Fn(&Path, &str) -> Result<(), BuildError>,
{
    fn build(&self, workspace: &Path, formula_path: &str) -> Result<(), BuildError> {
        self(workspace, formula_path)
    }
}

/// Runs the configured build command (`make build` by default) in the
/// formula's `src` directory.
#[derive(Debug, Clone)]
pub struct MakeBuilder {
    command: String,
}

impl MakeBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Builder for MakeBuilder {
    fn build(&self, workspace: &Path, formula_path: &str) -> Result<(), BuildError> {
        let src = workspace.join(formula_path).join(SRC_DIR);
        if !src.is_dir() {
            return Err(BuildError::SourceNotFound { path: src });
        }
        log::debug!("Running '{}' in '{}'", self.command, src.display());
        executor::execute_command(&self.command, &src, &HashMap::new())?;
        Ok(())
    }
}

/// What a sync put into the installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synced {
    pub bin_dir: PathBuf,
    pub config_file: Option<PathBuf>,
    pub tree_updated: bool,
}

/// Copies the build output of `formula_path` into the installation and
/// merges the workspace tree into the `local` tree.
///
/// Syncs are serialized through an exclusive lock on `<home>/.build.lock`.
pub fn sync_formula(
    installation: &Installation,
    workspace: &Path,
    formula_path: &str,
) -> Result<Synced, BuildError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BuildError::Io { path, source }
    };

    fs::create_dir_all(&installation.home).map_err(io_error(&installation.home))?;
    let lock_path = installation.home.join(BUILD_LOCK_FILENAME);
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| BuildError::Lock {
            path: lock_path.clone(),
            source,
        })?;
    lock.lock_exclusive().map_err(|source| BuildError::Lock {
        path: lock_path.clone(),
        source,
    })?;

    let workspace_formula = workspace.join(formula_path);
    let built_bin = paths::bin_path(&workspace_formula);
    if !built_bin.is_dir() {
        return Err(BuildError::OutputNotFound { path: built_bin });
    }

    let formula_dir = installation.formula_path(formula_path);
    let bin_dir = paths::bin_path(&formula_dir);
    commons::replace_dir(&built_bin, &bin_dir).map_err(io_error(&bin_dir))?;

    let config_name = paths::config_name("");
    let workspace_config = paths::config_path(&workspace_formula, config_name);
    let config_file = if workspace_config.is_file() {
        let dest = paths::config_path(&formula_dir, config_name);
        fs::copy(&workspace_config, &dest).map_err(io_error(&dest))?;
        Some(dest)
    } else {
        log::warn!(
            "Formula '{}' has no {} in the workspace.",
            formula_path,
            config_name
        );
        None
    };

    let workspace_tree = tree_store::load_tree(
        &workspace.join(WORKSPACE_TREE_DIR).join(TREE_FILENAME),
    )?;
    let mut journal = TreeJournal::open(installation.tree_file(LOCAL_REPO))?;
    journal.merge(&workspace_tree);
    let tree_updated = journal.commit()?;

    drop(lock);
    log::info!("Formula '{}' synced into '{}'", formula_path, formula_dir.display());

    Ok(Synced {
        bin_dir,
        config_file,
        tree_updated,
    })
}
