// src/core/tree_store.rs

//! Persistence of repository trees and the set of all installed trees.

use crate::constants::{LOCAL_REPO, ROOT_COMMAND};
use crate::core::paths::Installation;
use crate::core::tree::{FormulaCommand, TreeError, parent_id};
use crate::models::{Command, Language, Tree};
use crate::state::TreeJournal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Tree document '{path}' is malformed: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode tree document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to replace tree document '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Loads a tree document.
///
/// A missing or unreadable file yields an empty tree (and its directory is
/// created); malformed content is an error.
pub fn load_tree(path: &Path) -> Result<Tree, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("No readable tree at '{}' ({}), starting empty.", path.display(), e);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(io_error(dir))?;
            }
            return Ok(Tree::default());
        }
    };

    if content.trim().is_empty() {
        return Ok(Tree::default());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a tree document with tab indentation.
///
/// The document is written to a temporary file beside the target and renamed
/// over it, so readers only ever see the old or the new content.
pub fn save_tree(path: &Path, tree: &Tree) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    tree.serialize(&mut serializer)?;
    buffer.push(b'\n');

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    temp.write_all(&buffer).map_err(io_error(temp.path()))?;
    temp.as_file().sync_all().map_err(io_error(path))?;
    temp.persist(path).map_err(|source| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!("Tree document written to '{}'", path.display());
    Ok(())
}

/// Every installed repository's tree, keyed by repository name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSet {
    trees: BTreeMap<String, Tree>,
}

impl TreeSet {
    /// Loads `<home>/repo/<name>/tree.json` for every repository directory.
    pub fn load(installation: &Installation) -> Result<Self, StoreError> {
        let root = installation.repo_root();
        let mut set = Self::default();

        if !root.exists() {
            return Ok(set);
        }

        for entry in fs::read_dir(&root).map_err(io_error(&root))? {
            let entry = entry.map_err(io_error(&root))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let tree = load_tree(&installation.tree_file(&name))?;
            set.insert(name, tree);
        }
        log::debug!("Loaded {} repository tree(s).", set.trees.len());
        Ok(set)
    }

    /// Adds (or replaces) a repository's tree, tagging its commands with the
    /// repository name.
    pub fn insert(&mut self, repo: impl Into<String>, mut tree: Tree) {
        let repo = repo.into();
        for command in &mut tree.commands {
            command.repo.clone_from(&repo);
        }
        self.trees.insert(repo, tree);
    }

    pub fn get(&self, repo: &str) -> Option<&Tree> {
        self.trees.get(repo)
    }

    pub fn repos(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.trees.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    /// Fails when any repository already registers the leaf of `command`.
    pub fn verify_unique(&self, command: &FormulaCommand) -> Result<(), TreeError> {
        let parent = command.leaf_parent();
        let usage = command.leaf();
        match self.trees.values().find(|tree| tree.contains(&parent, usage)) {
            Some(_) => Err(TreeError::CommandAlreadyExists {
                command: command.tokens().join(" "),
                parent,
            }),
            None => Ok(()),
        }
    }

    /// Walks `tokens` from the root and returns the command they name. When
    /// several repositories define the same node the `local` one wins.
    pub fn find_command(&self, tokens: &[String]) -> Option<&Command> {
        let last = tokens.len().checked_sub(1)?;
        let parent = parent_id(tokens, last);
        let usage = tokens.get(last)?;

        self.trees
            .get(LOCAL_REPO)
            .and_then(|tree| tree.find(&parent, usage))
            .or_else(|| self.trees.values().find_map(|tree| tree.find(&parent, usage)))
    }

    /// The children of the node named by `tokens` (the root when empty),
    /// merged across repositories and sorted by usage.
    pub fn children_of(&self, tokens: &[String]) -> Vec<&Command> {
        let parent = if tokens.is_empty() {
            ROOT_COMMAND.to_string()
        } else {
            parent_id(tokens, tokens.len())
        };

        let mut children: Vec<&Command> = Vec::new();
        for tree in self.trees.values() {
            for child in tree.children(&parent) {
                if !children.iter().any(|c| c.usage == child.usage) {
                    children.push(child);
                }
            }
        }
        children.sort_by(|a, b| a.usage.cmp(&b.usage));
        children
    }
}

/// Registers a new formula command in the tree document at `tree_file`,
/// after checking that no installed repository already owns it.
///
/// Nothing is written when validation fails.
pub fn register_formula(
    tree_file: &Path,
    installed: &TreeSet,
    command: &FormulaCommand,
    language: Language,
) -> Result<Command, StoreError> {
    installed.verify_unique(command)?;

    let mut journal = TreeJournal::open(tree_file)?;
    journal.insert_formula(command, language)?;
    let leaf = journal
        .find(&command.leaf_parent(), command.leaf())
        .cloned()
        .unwrap_or_default();
    journal.commit()?;
    Ok(leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::Os;

    fn parse(command: &str) -> FormulaCommand {
        FormulaCommand::parse(command).unwrap()
    }

    #[test]
    fn test_load_missing_document_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo").join("local").join("tree.json");

        let tree = load_tree(&path).unwrap();
        assert!(tree.commands.is_empty());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_load_malformed_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_tree(&path).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_save_uses_tab_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let mut tree = Tree::default();
        tree.insert_formula(&parse("rit db migrate"), Language::Shell).unwrap();

        save_tree(&path, &tree).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n\t\"commands\": ["));
        assert_eq!(load_tree(&path).unwrap(), tree);
    }

    #[test]
    fn test_tree_set_loads_every_repository() {
        let dir = tempfile::tempdir().unwrap();
        let inst = Installation::new(dir.path(), Os::Linux);

        let mut commons = Tree::default();
        commons.insert_formula(&parse("rit aws create bucket"), Language::Go).unwrap();
        save_tree(&inst.tree_file("commons"), &commons).unwrap();
        let mut local = Tree::default();
        local.insert_formula(&parse("rit db migrate"), Language::Shell).unwrap();
        save_tree(&inst.tree_file(LOCAL_REPO), &local).unwrap();

        let set = TreeSet::load(&inst).unwrap();
        assert_eq!(set.repos().count(), 2);
        let tokens: Vec<String> = ["aws", "create", "bucket"].iter().map(|s| s.to_string()).collect();
        let found = set.find_command(&tokens).unwrap();
        assert_eq!(found.repo, "commons");
        assert!(found.is_leaf());
    }

    #[test]
    fn test_verify_unique_checks_all_repositories() {
        let mut other = Tree::default();
        other.insert_formula(&parse("rit db migrate"), Language::Shell).unwrap();
        let mut set = TreeSet::default();
        set.insert("commons", other);

        let err = set.verify_unique(&parse("rit db migrate")).unwrap_err();
        assert!(matches!(err, TreeError::CommandAlreadyExists { .. }));
        assert!(set.verify_unique(&parse("rit db seed")).is_ok());
    }

    #[test]
    fn test_register_formula_rejects_shadowing_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let workspace_tree = dir.path().join("tree").join("tree.json");

        let mut other = Tree::default();
        other.insert_formula(&parse("rit db migrate"), Language::Shell).unwrap();
        let mut set = TreeSet::default();
        set.insert("commons", other);

        let result = register_formula(&workspace_tree, &set, &parse("rit db migrate"), Language::Go);
        assert!(result.is_err());
        assert!(!workspace_tree.exists());

        let leaf =
            register_formula(&workspace_tree, &set, &parse("rit db seed"), Language::Go).unwrap();
        assert_eq!(leaf.formula.unwrap().path, "db/seed");
        assert!(load_tree(&workspace_tree).unwrap().contains("root_db", "seed"));
    }

    #[test]
    fn test_children_of_root_merges_repositories() {
        let mut a = Tree::default();
        a.insert_formula(&parse("rit db migrate"), Language::Shell).unwrap();
        let mut b = Tree::default();
        b.insert_formula(&parse("rit db seed"), Language::Shell).unwrap();
        b.insert_formula(&parse("rit aws list"), Language::Shell).unwrap();
        let mut set = TreeSet::default();
        set.insert("a", a);
        set.insert("b", b);

        let roots: Vec<&str> = set.children_of(&[]).iter().map(|c| c.usage.as_str()).collect();
        assert_eq!(roots, vec!["aws", "db"]);
        assert_eq!(set.children_of(&["db".to_string()]).len(), 2);
    }

    #[test]
    fn test_children_of_nested_group() {
        let mut tree = Tree::default();
        tree.insert_formula(&parse("rit db migrate up"), Language::Shell).unwrap();
        tree.insert_formula(&parse("rit db migrate down"), Language::Shell).unwrap();
        let mut set = TreeSet::default();
        set.insert(LOCAL_REPO, tree);

        let group: Vec<String> = vec!["db".into(), "migrate".into()];
        let children = set.children_of(&group);
        let usages: Vec<&str> = children.iter().map(|c| c.usage.as_str()).collect();
        assert_eq!(usages, vec!["down", "up"]);
        assert!(children.iter().all(|c| c.parent == "root_db_migrate"));
    }
}
