//! Sparse materialization of the documentation subtree
//!
//! The repository is cloned shallow, blobless and sparse into a temporary
//! directory next to the target. Only markdown files under the docs path
//! are copied into a staging tree, which is renamed onto the target once
//! complete. The clone is always removed, and a failed fetch leaves no
//! target directory behind.

use crate::config::schema::{PipelineConfig, SourceConfig};
use crate::error::{DocfoldError, DocfoldResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Materializes a versioned document tree locally
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Populate `target` (which must not exist) with the document tree
    async fn materialize(&self, target: &Path) -> DocfoldResult<()>;
}

/// Fetcher using a shallow sparse `git` checkout
#[derive(Debug, Clone)]
pub struct GitSparseFetcher {
    clone_url: String,
    branch: Option<String>,
    docs_path: String,
    extensions: Vec<String>,
    timeout: Duration,
}

impl GitSparseFetcher {
    pub fn from_config(source: &SourceConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            clone_url: source.clone_url(),
            branch: source.branch.clone(),
            docs_path: source.docs_path.trim_matches('/').to_string(),
            extensions: source.extensions.clone(),
            timeout: Duration::from_secs(pipeline.fetch_timeout_secs),
        }
    }

    async fn git(&self, args: &[&str]) -> DocfoldResult<()> {
        debug!("Executing: git {:?}", args);

        let output = Command::new("git")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DocfoldError::command_failed(format!("git {}", args.join(" ")), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocfoldError::FetchFailed {
                reason: format!("git {} failed: {}", args[0], stderr.trim()),
            });
        }
        Ok(())
    }

    async fn fetch_into(&self, checkout: &Path, docs: &Path) -> DocfoldResult<usize> {
        let checkout_arg = checkout.to_string_lossy().into_owned();

        let mut clone = vec!["clone", "--depth", "1", "--filter=blob:none", "--sparse"];
        if let Some(ref branch) = self.branch {
            clone.extend(["--branch", branch.as_str()]);
        }
        clone.extend([self.clone_url.as_str(), checkout_arg.as_str()]);
        self.git(&clone).await?;

        self.git(&["-C", &checkout_arg, "sparse-checkout", "set", &self.docs_path])
            .await?;

        let source_root = checkout.join(&self.docs_path);
        if !source_root.is_dir() {
            return Err(DocfoldError::FetchFailed {
                reason: format!("{} not found in {}", self.docs_path, self.clone_url),
            });
        }

        // The copy outlives this future if it is dropped; the flag stops it
        // and the copy thread removes the staging directory itself
        let cancel = CancelOnDrop::default();
        let cancelled = cancel.flag();
        let docs = docs.to_path_buf();
        let extensions = self.extensions.clone();
        let copied = tokio::task::spawn_blocking(move || {
            let result = copy_markdown_tree(&source_root, &docs, &extensions, &cancelled);
            if cancelled.load(Ordering::SeqCst) {
                if let Some(staging) = docs.parent() {
                    let _ = std::fs::remove_dir_all(staging);
                }
            }
            result
        })
        .await
        .map_err(|e| DocfoldError::Internal(format!("copy task failed: {}", e)))??;
        cancel.disarm();

        if copied == 0 {
            return Err(DocfoldError::FetchFailed {
                reason: format!("no markdown files under {}", self.docs_path),
            });
        }
        Ok(copied)
    }
}

#[async_trait]
impl DocumentFetcher for GitSparseFetcher {
    async fn materialize(&self, target: &Path) -> DocfoldResult<()> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let staging = tempfile::Builder::new()
            .prefix(".docfold-fetch-")
            .tempdir_in(&parent)
            .map_err(|e| {
                DocfoldError::io(format!("creating staging directory in {}", parent.display()), e)
            })?;
        let checkout = staging.path().join("checkout");
        let docs = staging.path().join("docs");

        let copied = tokio::time::timeout(self.timeout, self.fetch_into(&checkout, &docs))
            .await
            .map_err(|_| DocfoldError::Timeout {
                operation: "document fetch".to_string(),
                secs: self.timeout.as_secs(),
            })??;

        fs::rename(&docs, target).await.map_err(|e| {
            DocfoldError::io(format!("moving documents into {}", target.display()), e)
        })?;

        info!("Fetched {} documents into {}", copied, target.display());
        Ok(())
    }
}

/// Raises its flag when dropped unless disarmed first
#[derive(Default)]
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
    disarmed: bool,
}

impl CancelOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn disarm(mut self) {
        self.disarmed = true;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.disarmed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Copy files with a matching extension from `src` into `dst`, keeping
/// relative paths and skipping `.git` directories. Returns the file count.
///
/// Stops with [`DocfoldError::Interrupted`] once `cancelled` is set.
pub fn copy_markdown_tree(
    src: &Path,
    dst: &Path,
    extensions: &[String],
    cancelled: &AtomicBool,
) -> DocfoldResult<usize> {
    let mut copied = 0;

    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        if cancelled.load(Ordering::SeqCst) {
            return Err(DocfoldError::Interrupted);
        }
        let entry = entry.map_err(|e| DocfoldError::FetchFailed {
            reason: format!("walking {}: {}", src.display(), e),
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| DocfoldError::Internal(e.to_string()))?;
        let dest = dst.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DocfoldError::io(format!("creating {}", parent.display()), e))?;
        }
        std::fs::copy(entry.path(), &dest)
            .map_err(|e| DocfoldError::io(format!("copying {}", entry.path().display()), e))?;
        copied += 1;
    }

    Ok(copied)
}

/// Whether `path` has one of `extensions` (case-insensitive, no dot)
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}
