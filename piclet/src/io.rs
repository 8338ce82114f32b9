//! IO utilities.

use std::path::{Path, PathBuf};

use crate::error::{with_err_context, ErrorContext, Result};

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::create_dir_all(path), || {
        ErrorContext::CreateDir(path.to_path_buf())
    })?;
    Ok(())
}

pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let data = with_err_context(std::fs::read_to_string(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })?;
    Ok(data)
}

/// Moves a fully written file into its final location.
pub fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    with_err_context(std::fs::rename(from, to), || {
        ErrorContext::CreateFile(to.to_path_buf())
    })?;
    Ok(())
}

pub fn copy_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    with_err_context(std::fs::copy(from, to), || {
        ErrorContext::CreateFile(to.to_path_buf())
    })?;
    Ok(())
}

/// Removes a file, ignoring whether it existed.
pub(crate) fn remove_if_exists(path: impl AsRef<Path>) {
    let _ = std::fs::remove_file(path);
}

/// Lists the regular files in `dir`, sorted by file name.
pub fn sorted_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = with_err_context(std::fs::read_dir(dir), || {
        ErrorContext::ReadFile(dir.to_path_buf())
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
