// src/state.rs

use crate::core::tree_store::{self, StoreError};
use crate::models::Tree;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// The state of a tree document between loading and committing.
#[derive(Debug)]
enum TreeState {
    /// Loaded and never mutated.
    Pristine(Tree),
    /// Mutable access was requested. The snapshot is kept to decide whether the
    /// document needs rewriting at all.
    Dirty { original: Tree, current: Tree },
}

/// A tree document loaded from disk that is written back only if its content
/// actually changed.
#[derive(Debug)]
pub struct TreeJournal {
    path: PathBuf,
    state: TreeState,
}

impl TreeJournal {
    /// Loads the document at `path`, tolerating a missing file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tree = tree_store::load_tree(&path)?;
        Ok(Self {
            path,
            state: TreeState::Pristine(tree),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compares the current tree against the snapshot taken before the first
    /// mutation.
    pub fn needs_saving(&self) -> bool {
        match &self.state {
            TreeState::Pristine(_) => false,
            TreeState::Dirty { original, current } => original != current,
        }
    }

    /// Persists the tree if it changed. Returns whether a write happened.
    pub fn commit(self) -> Result<bool, StoreError> {
        match self.state {
            TreeState::Dirty { original, current } if original != current => {
                tree_store::save_tree(&self.path, &current)?;
                Ok(true)
            }
            _ => {
                log::debug!("'{}' unchanged, skipping write.", self.path.display());
                Ok(false)
            }
        }
    }
}

impl Deref for TreeJournal {
    type Target = Tree;

    fn deref(&self) -> &Tree {
        match &self.state {
            TreeState::Pristine(tree) => tree,
            TreeState::Dirty { current, .. } => current,
        }
    }
}

impl DerefMut for TreeJournal {
    fn deref_mut(&mut self) -> &mut Tree {
        if let TreeState::Pristine(tree) = &mut self.state {
            let tree = std::mem::take(tree);
            self.state = TreeState::Dirty {
                original: tree.clone(),
                current: tree,
            };
        }

        match &mut self.state {
            TreeState::Dirty { current, .. } => current,
            TreeState::Pristine(tree) => tree,
        }
    }
}
