//! Write-to-temp then rename, so a present file is never a truncated one.

use crate::error::{DocfoldError, DocfoldResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sibling temporary path used while `path` is being produced
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".docfold.tmp");
    path.with_file_name(name)
}

/// Atomically replace `path` with `content`.
///
/// Parent directories are created as needed. On failure the temporary
/// file is removed and `path` is left as it was.
pub async fn write_atomic(path: &Path, content: &[u8]) -> DocfoldResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| DocfoldError::io(format!("creating directory {}", parent.display()), e))?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = fs::write(&tmp, content).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(DocfoldError::io(format!("writing {}", tmp.display()), e));
    }

    rename_into_place(&tmp, path).await
}

/// Rename a finished temporary file over its final path
pub async fn rename_into_place(tmp: &Path, path: &Path) -> DocfoldResult<()> {
    if let Err(e) = fs::rename(tmp, path).await {
        let _ = fs::remove_file(tmp).await;
        return Err(DocfoldError::io(
            format!("renaming {} to {}", tmp.display(), path.display()),
            e,
        ));
    }
    Ok(())
}
