// src/core/workspace.rs

//! A formula workspace: the directory formulas are developed in before they
//! are built into the installation.
//!
//! ```text
//! <workspace>/
//!   Makefile            FORMULAS=<path> <path> ...
//!   tree/tree.json      the workspace's own command tree
//!   <path>/config.json
//!   <path>/src/         sources, built with `make build`
//!   <path>/bin/         build output
//! ```

use crate::constants::{DEFAULT_CONFIG, MAKEFILE, SRC_DIR, TREE_FILENAME, WORKSPACE_TREE_DIR};
use crate::core::tree::FormulaCommand;
use crate::core::tree_store::{self, StoreError, TreeSet};
use crate::models::{Command, FormulaConfig, Language};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FORMULAS_VAR: &str = "FORMULAS=";

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Workspace '{0}' has a Makefile but no tree/tree.json.")]
    TreeJsonNotFound(PathBuf),
    #[error("Workspace '{0}' has a tree/tree.json but no Makefile.")]
    MakefileNotFound(PathBuf),
    #[error("Filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens the workspace at `root`.
    ///
    /// A workspace with neither a Makefile nor a tree document is new and
    /// valid; one that has exactly one of the two is rejected.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let workspace = Self { root: root.into() };
        let has_tree = workspace.tree_file().is_file();
        let has_makefile = workspace.makefile().is_file();

        match (has_makefile, has_tree) {
            (true, false) => Err(WorkspaceError::TreeJsonNotFound(workspace.root)),
            (false, true) => Err(WorkspaceError::MakefileNotFound(workspace.root)),
            _ => Ok(workspace),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<workspace>/tree/tree.json`
    pub fn tree_file(&self) -> PathBuf {
        self.root.join(WORKSPACE_TREE_DIR).join(TREE_FILENAME)
    }

    pub fn makefile(&self) -> PathBuf {
        self.root.join(MAKEFILE)
    }

    pub fn formula_dir(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Registers `command` in the workspace tree and lays out its directory.
    ///
    /// Fails with a collision, writing nothing, when an installed repository
    /// or the workspace itself already owns the command.
    pub fn create_formula(
        &self,
        installed: &TreeSet,
        command: &FormulaCommand,
        language: Language,
    ) -> Result<Command, WorkspaceError> {
        let leaf = tree_store::register_formula(&self.tree_file(), installed, command, language)?;

        let path = command.path();
        let dir = self.formula_dir(&path);
        let src = dir.join(SRC_DIR);
        fs::create_dir_all(&src).map_err(io_error(&src))?;

        let config_file = dir.join(DEFAULT_CONFIG);
        if !config_file.exists() {
            let config = FormulaConfig {
                command: command.command_line(),
                description: format!("{} formula", language),
                inputs: Vec::new(),
            };
            let content = serde_json::to_string_pretty(&config).map_err(StoreError::from)?;
            fs::write(&config_file, content).map_err(io_error(&config_file))?;
        }

        self.add_to_makefile(&path)?;
        log::debug!("Formula '{}' created in '{}'", path, dir.display());
        Ok(leaf)
    }

    /// Lists `path` in the `FORMULAS=` line of the workspace Makefile,
    /// creating the Makefile when the workspace is new.
    fn add_to_makefile(&self, path: &str) -> Result<(), WorkspaceError> {
        let makefile = self.makefile();
        let content = if makefile.is_file() {
            fs::read_to_string(&makefile).map_err(io_error(&makefile))?
        } else {
            String::new()
        };

        let updated = with_formula(&content, path);
        if updated != content {
            fs::write(&makefile, updated).map_err(io_error(&makefile))?;
        }
        Ok(())
    }
}

/// Returns `makefile` with `path` appended to its `FORMULAS=` line.
fn with_formula(makefile: &str, path: &str) -> String {
    if makefile.trim().is_empty() {
        return format!(
            "{FORMULAS_VAR}{path}\n\nbuild:\n\t@for formula in $(FORMULAS); do $(MAKE) -C $$formula/{SRC_DIR} build; done\n"
        );
    }

    let mut found = false;
    let mut lines: Vec<String> = makefile
        .lines()
        .map(|line| match line.strip_prefix(FORMULAS_VAR) {
            Some(listed) if !found => {
                found = true;
                if listed.split_whitespace().any(|f| f == path) {
                    line.to_string()
                } else if listed.trim().is_empty() {
                    format!("{FORMULAS_VAR}{path}")
                } else {
                    format!("{FORMULAS_VAR}{} {path}", listed.trim_end())
                }
            }
            _ => line.to_string(),
        })
        .collect();

    if !found {
        lines.insert(0, format!("{FORMULAS_VAR}{path}"));
    }
    let mut updated = lines.join("\n");
    updated.push('\n');
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::TreeError;

    fn parse(command: &str) -> FormulaCommand {
        FormulaCommand::parse(command).unwrap()
    }

    #[test]
    fn test_half_initialized_workspaces_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MAKEFILE), "").unwrap();
        assert!(matches!(
            Workspace::open(dir.path()),
            Err(WorkspaceError::TreeJsonNotFound(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(WORKSPACE_TREE_DIR)).unwrap();
        fs::write(dir.path().join(WORKSPACE_TREE_DIR).join(TREE_FILENAME), "{}").unwrap();
        assert!(matches!(
            Workspace::open(dir.path()),
            Err(WorkspaceError::MakefileNotFound(_))
        ));
    }

    #[test]
    fn test_create_formula_in_new_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let leaf = workspace
            .create_formula(&TreeSet::default(), &parse("rit db migrate"), Language::Go)
            .unwrap();
        assert_eq!(leaf.parent, "root_db");
        assert_eq!(leaf.formula.unwrap().bin, "migrate-${so}");

        assert!(dir.path().join("db/migrate/src").is_dir());
        let config: FormulaConfig = serde_json::from_str(
            &fs::read_to_string(dir.path().join("db/migrate/config.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(config.command, "rit db migrate");

        // The workspace is complete now and reopens cleanly.
        let reopened = Workspace::open(dir.path()).unwrap();
        reopened
            .create_formula(&TreeSet::default(), &parse("rit db seed"), Language::Shell)
            .unwrap();
        let makefile = fs::read_to_string(reopened.makefile()).unwrap();
        assert!(makefile.starts_with("FORMULAS=db/migrate db/seed\n"));
    }

    #[test]
    fn test_installed_command_is_a_collision() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let mut installed_tree = crate::models::Tree::default();
        installed_tree
            .insert_formula(&parse("rit db migrate"), Language::Shell)
            .unwrap();
        let mut installed = TreeSet::default();
        installed.insert("commons", installed_tree);

        let err = workspace
            .create_formula(&installed, &parse("rit db migrate"), Language::Shell)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Store(StoreError::Tree(TreeError::CommandAlreadyExists { .. }))
        ));
        assert!(!workspace.tree_file().exists());
        assert!(!workspace.makefile().exists());
    }

    #[test]
    fn test_makefile_formula_list() {
        let makefile = "FORMULAS=a/b\n\nbuild:\n\techo\n";
        assert_eq!(with_formula(makefile, "c/d"), "FORMULAS=a/b c/d\n\nbuild:\n\techo\n");
        assert_eq!(with_formula(makefile, "a/b"), makefile);
        assert_eq!(with_formula("build:\n", "a/b"), "FORMULAS=a/b\nbuild:\n");
    }
}
