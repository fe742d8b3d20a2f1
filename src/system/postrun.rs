// src/system/postrun.rs

use crate::system::executor;
use crate::system::prerun::{SandboxMode, Setup};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("Could not remove env file '{path}': {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not remove scratch directory '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Releases everything a successful run left behind.
pub trait PostRunner {
    fn post_run(&self, setup: Setup) -> Result<(), FinalizeError>;
}

#[derive(Debug, Clone)]
pub struct DefaultPostRunner {
    sandbox_runtime: String,
}

impl DefaultPostRunner {
    pub fn new(sandbox_runtime: impl Into<String>) -> Self {
        Self {
            sandbox_runtime: sandbox_runtime.into(),
        }
    }
}

impl PostRunner for DefaultPostRunner {
    fn post_run(&self, setup: Setup) -> Result<(), FinalizeError> {
        let env_file = setup.env_file();
        if env_file.exists() {
            fs::remove_file(&env_file).map_err(|source| FinalizeError::EnvFile {
                path: env_file.clone(),
                source,
            })?;
        }

        if let SandboxMode::Sandboxed { container_id } = &setup.sandbox {
            let remove = format!("{} rmi -f {}", self.sandbox_runtime, container_id);
            if let Err(e) = executor::execute_command(&remove, setup.tmp_dir(), &HashMap::new()) {
                log::warn!("Sandbox image '{}' was not removed: {}", container_id, e);
            }
        }

        let tmp_dir = setup.tmp_dir().to_path_buf();
        setup
            .release()
            .map_err(|source| FinalizeError::Scratch { path: tmp_dir, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormulaConfig;

    fn setup(sandbox: SandboxMode) -> Setup {
        let scratch = tempfile::tempdir().unwrap();
        Setup::new(
            PathBuf::from("."),
            scratch,
            "run.sh".to_string(),
            FormulaConfig::default(),
            sandbox,
        )
    }

    #[test]
    fn test_scratch_and_env_file_are_removed() {
        let setup = setup(SandboxMode::Local);
        fs::write(setup.env_file(), "PWD=/app\n").unwrap();
        let tmp_dir = setup.tmp_dir().to_path_buf();

        DefaultPostRunner::new("docker").post_run(setup).unwrap();
        assert!(!tmp_dir.exists());
    }

    #[test]
    fn test_failed_image_removal_is_not_fatal() {
        let setup = setup(SandboxMode::Sandboxed {
            container_id: "4b1c0f4e".to_string(),
        });
        let tmp_dir = setup.tmp_dir().to_path_buf();

        DefaultPostRunner::new("no-such-container-runtime-42")
            .post_run(setup)
            .unwrap();
        assert!(!tmp_dir.exists());
    }
}
