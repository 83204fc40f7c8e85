//! Filesystem helpers shared by the built-in kinds

use std::io;
use std::path::Path;
use tokio::fs;

/// Write through a sibling temp file and rename into place
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents).await?;
    fs::rename(&temp_path, path).await
}

/// Read a file that may not exist yet
pub(crate) async fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Target of a symlink, `None` if `link` is absent or not a link
pub(crate) async fn link_target(link: &Path) -> Option<std::path::PathBuf> {
    let metadata = fs::symlink_metadata(link).await.ok()?;
    if !metadata.file_type().is_symlink() {
        return None;
    }
    fs::read_link(link).await.ok()
}

pub(crate) async fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

#[cfg(unix)]
pub(crate) async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    fs::symlink(target, link).await
}

#[cfg(windows)]
pub(crate) async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if fs::metadata(target).await.map(|m| m.is_dir()).unwrap_or(false) {
        fs::symlink_dir(target, link).await
    } else {
        fs::symlink_file(target, link).await
    }
}
