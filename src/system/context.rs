// src/system/context.rs

use crate::constants::CONTEXTS_FILENAME;
use crate::models::ContextHolder;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Could not read contexts file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Contexts file '{path}' is malformed: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Finds the context currently active for the user.
pub trait ContextFinder {
    fn find(&self) -> Result<ContextHolder, ContextError>;
}

/// Reads the active context from `<home>/contexts`.
#[derive(Debug, Clone)]
pub struct FileContextFinder {
    path: PathBuf,
}

impl FileContextFinder {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            path: home.into().join(CONTEXTS_FILENAME),
        }
    }
}

impl ContextFinder for FileContextFinder {
    fn find(&self) -> Result<ContextHolder, ContextError> {
        if !self.path.exists() {
            return Ok(ContextHolder::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ContextError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ContextError::Decode {
            path: self.path.clone(),
            source,
        })
    }
}

/// A context that never changes.
#[derive(Debug, Clone, Default)]
pub struct FixedContext(pub String);

impl ContextFinder for FixedContext {
    fn find(&self) -> Result<ContextHolder, ContextError> {
        Ok(ContextHolder {
            current_context: self.0.clone(),
            all: vec![self.0.clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let finder = FileContextFinder::new(dir.path());
        assert_eq!(finder.find().unwrap().current_context, "");
    }

    #[test]
    fn test_reads_current_context() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONTEXTS_FILENAME),
            r#"{"current_context":"prod","all":["dev","prod"]}"#,
        )
        .unwrap();
        let holder = FileContextFinder::new(dir.path()).find().unwrap();
        assert_eq!(holder.current_context, "prod");
        assert_eq!(holder.all.len(), 2);
    }

    #[test]
    fn test_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONTEXTS_FILENAME), "prod").unwrap();
        assert!(matches!(
            FileContextFinder::new(dir.path()).find(),
            Err(ContextError::Decode { .. })
        ));
    }
}
