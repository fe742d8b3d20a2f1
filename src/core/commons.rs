// src/core/commons.rs

// Filesystem helpers shared by the run and build paths.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copies the contents of `from` into `to`, creating `to` and
/// overwriting files that already exist there.
pub fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Replaces `to` with a copy of `from`.
pub fn replace_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    copy_dir(from, to)
}
