// src/system/fetcher.rs

//! Downloads formula artifacts that aren't installed locally yet.

use crate::system::executor::{self, ExecutionError};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const UNZIP: &str = "unzip";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to '{url}' failed: {reason}")]
    Http { url: String, reason: String },
    #[error("Filesystem error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' is needed to extract formula bundles but was not found in PATH.")]
    ExtractorMissing { program: String },
    #[error("Could not extract bundle '{url}': {source}")]
    Extract {
        url: String,
        #[source]
        source: ExecutionError,
    },
}

/// Retrieves remote formula artifacts.
pub trait ArtifactFetcher {
    /// Downloads the zip bundle at `url` and extracts it into `dest_dir`.
    fn fetch_bundle(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError>;

    /// Downloads a single file to `dest`.
    fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Fetches artifacts over HTTP and extracts bundles with the system `unzip`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("Downloading '{}'", url);
        let http_error = |reason: String| FetchError::Http {
            url: url.to_string(),
            reason,
        };
        let mut response = ureq::get(url).call().map_err(|e| http_error(e.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| http_error(e.to_string()))
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch_bundle(&self, url: &str, dest_dir: &Path) -> Result<(), FetchError> {
        ensure_installed(UNZIP)?;
        let bytes = self.download(url)?;
        fs::create_dir_all(dest_dir).map_err(|source| FetchError::Io {
            path: dest_dir.to_path_buf(),
            source,
        })?;

        let mut archive = NamedTempFile::new_in(dest_dir).map_err(|source| FetchError::Io {
            path: dest_dir.to_path_buf(),
            source,
        })?;
        archive.write_all(&bytes).map_err(|source| FetchError::Io {
            path: archive.path().to_path_buf(),
            source,
        })?;

        let command_line = format!(
            "{UNZIP} -o -q {} -d {}",
            quote(archive.path()),
            quote(dest_dir)
        );
        executor::execute_command(&command_line, dest_dir, &HashMap::new()).map_err(|source| {
            FetchError::Extract {
                url: url.to_string(),
                source,
            }
        })
    }

    fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let bytes = self.download(url)?;
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir).map_err(|source| FetchError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(dest, bytes).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}

fn ensure_installed(program: &str) -> Result<(), FetchError> {
    if executor::is_executable_in_path(program) {
        Ok(())
    } else {
        Err(FetchError::ExtractorMissing {
            program: program.to_string(),
        })
    }
}

fn quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    match shlex::try_quote(&raw) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_survives_shell_splitting() {
        let quoted = quote(Path::new("/tmp/with space/a.zip"));
        assert_eq!(shlex::split(&quoted).unwrap(), vec!["/tmp/with space/a.zip".to_string()]);
        assert_eq!(quote(Path::new("/tmp/plain.zip")), "/tmp/plain.zip");
    }

    #[test]
    fn test_missing_extractor_is_reported_by_name() {
        let err = ensure_installed("rit-no-such-extractor").unwrap_err();
        assert!(matches!(
            &err,
            FetchError::ExtractorMissing { program } if program == "rit-no-such-extractor"
        ));
        assert!(err.to_string().contains("not found in PATH"));
    }

    #[test]
    fn test_unreachable_url_is_an_http_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HttpFetcher
            .fetch_file("http://127.0.0.1:9/config.json", &dir.path().join("config.json"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { .. }));
    }
}
