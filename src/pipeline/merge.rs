//! Merge a document tree into one markdown file
//!
//! Files are concatenated in lexicographic order of their path relative to
//! the tree root, each with trailing whitespace trimmed and separated by a
//! single blank line. The same tree always merges to the same bytes.

use super::fetch::has_extension;
use crate::atomic::write_atomic;
use crate::error::{DocfoldError, DocfoldResult};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Merge the documents under `docs_dir` into `output`; returns the file count
pub async fn merge_documents(
    docs_dir: &Path,
    extensions: &[String],
    output: &Path,
) -> DocfoldResult<usize> {
    let root = docs_dir.to_path_buf();
    let extensions = extensions.to_vec();
    let (count, merged) = tokio::task::spawn_blocking(move || concatenate(&root, &extensions))
        .await
        .map_err(|e| DocfoldError::Internal(format!("merge task failed: {}", e)))??;

    write_atomic(output, merged.as_bytes()).await?;
    info!("Merged {} documents into {}", count, output.display());
    Ok(count)
}

fn concatenate(root: &Path, extensions: &[String]) -> DocfoldResult<(usize, String)> {
    let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| DocfoldError::Io {
            context: format!("walking {}", root.display()),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| DocfoldError::Internal(e.to_string()))?
                .to_path_buf();
            files.push((relative, entry.into_path()));
        }
    }

    if files.is_empty() {
        return Err(DocfoldError::NothingToMerge(root.to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut parts = Vec::with_capacity(files.len());
    for (_, path) in &files {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DocfoldError::io(format!("reading {}", path.display()), e))?;
        parts.push(content.trim_end().to_string());
    }

    let mut merged = parts.join("\n\n");
    merged.push('\n');
    Ok((files.len(), merged))
}
