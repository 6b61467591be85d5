//! Idempotency gates
//!
//! A stage's output path is the only record that the stage ran. Before
//! doing work, the orchestrator asks a gate what to do about an existing
//! output; the answer comes from the injected [`OverwritePolicy`] and, for
//! `Prompt`, from the operator through a [`Prompter`].

use crate::artifact::ArtifactPaths;
use crate::error::{DocfoldError, DocfoldResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// What to do when a stage output already exists
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Ask the operator
    #[default]
    Prompt,
    /// Always redo the stage
    Redo,
    /// Always keep the existing output
    Skip,
    /// Treat an existing output as an error
    Fail,
}

/// Source of yes/no answers for `OverwritePolicy::Prompt`
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, message: &str) -> DocfoldResult<bool>;
}

/// Gate decision for merge and render outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing there; produce it
    Absent,
    /// It existed, the operator chose to redo it, and it has been removed
    PresentConfirmedRedo,
    /// It exists and is kept as is
    PresentSkip,
}

impl GateDecision {
    /// Whether the stage should run
    pub fn should_run(self) -> bool {
        !matches!(self, Self::PresentSkip)
    }
}

/// Gate decision for the fetched document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// No document tree yet
    NotExist,
    /// The tree and its merged document were deleted for a re-fetch
    Deleted,
    /// Keep the existing tree and skip fetching
    Continue,
}

impl FetchDecision {
    pub fn should_fetch(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Reusable gate for single-path stage outputs
pub struct StageGate<'a> {
    policy: OverwritePolicy,
    prompter: &'a dyn Prompter,
}

impl<'a> StageGate<'a> {
    pub fn new(policy: OverwritePolicy, prompter: &'a dyn Prompter) -> Self {
        Self { policy, prompter }
    }

    /// Decide whether the stage producing `path` should run
    pub async fn evaluate(&self, path: &Path) -> DocfoldResult<GateDecision> {
        if !path_exists(path).await {
            return Ok(GateDecision::Absent);
        }

        let message = format!("{} already exists. Redo?", display_name(path));
        if decide(self.policy, self.prompter, path, &message).await? {
            remove_path(path).await?;
            info!("Removed {} to redo it", path.display());
            Ok(GateDecision::PresentConfirmedRedo)
        } else {
            debug!("Keeping existing {}", path.display());
            Ok(GateDecision::PresentSkip)
        }
    }
}

/// Gate for the fetch stage
///
/// Deleting the document tree also deletes the merged document built
/// from it, so a re-fetch never leaves a stale merge behind.
pub struct FetchGate<'a> {
    policy: OverwritePolicy,
    prompter: &'a dyn Prompter,
}

impl<'a> FetchGate<'a> {
    pub fn new(policy: OverwritePolicy, prompter: &'a dyn Prompter) -> Self {
        Self { policy, prompter }
    }

    pub async fn evaluate(&self, paths: &ArtifactPaths) -> DocfoldResult<FetchDecision> {
        if !path_exists(&paths.docs_dir).await {
            return Ok(FetchDecision::NotExist);
        }

        let message = format!(
            "{} already exists. Delete it and fetch again?",
            display_name(&paths.docs_dir)
        );
        if decide(self.policy, self.prompter, &paths.docs_dir, &message).await? {
            remove_path(&paths.docs_dir).await?;
            remove_path(&paths.merged).await?;
            info!(
                "Deleted {} and {}",
                paths.docs_dir.display(),
                paths.merged.display()
            );
            Ok(FetchDecision::Deleted)
        } else {
            debug!("Continuing with existing {}", paths.docs_dir.display());
            Ok(FetchDecision::Continue)
        }
    }
}

async fn decide(
    policy: OverwritePolicy,
    prompter: &dyn Prompter,
    path: &Path,
    message: &str,
) -> DocfoldResult<bool> {
    match policy {
        OverwritePolicy::Redo => Ok(true),
        OverwritePolicy::Skip => Ok(false),
        OverwritePolicy::Fail => Err(DocfoldError::ArtifactExists(path.to_path_buf())),
        OverwritePolicy::Prompt => prompter.confirm(message).await,
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

/// Remove a file or directory tree; a missing path is not an error
pub(crate) async fn remove_path(path: &Path) -> DocfoldResult<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(DocfoldError::io(format!("inspecting {}", path.display()), e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    result.map_err(|e| DocfoldError::io(format!("removing {}", path.display()), e))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
