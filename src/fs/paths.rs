//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::fs::naming::filenamify;

/// Folder holding everything downloaded for the configured account.
pub fn account_folder(config: &Config) -> Result<PathBuf> {
    Ok(config.download_folder().join(config.account_identity()?))
}

/// Project directory of a product under an account folder.
pub fn project_dir(account_folder: &Path, product_title: &str) -> PathBuf {
    account_folder.join(filenamify(product_title))
}

/// Ensure a directory exists, creating it if necessary.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Temporary sibling a file is written to before being moved into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Write `contents` to `path` so that `path` only appears once complete.
pub async fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    tokio::fs::write(&partial, contents).await?;
    tokio::fs::rename(&partial, path).await?;
    Ok(())
}
