//! Content-addressed artifact naming
//!
//! Every on-disk output of a run is keyed by one identifier built from
//! the source name, the release tag and the last update date:
//! `<source>--<tag>--<YYYY-MM-DD>`. Components may not contain `--` nor
//! start or end with `-`, so the delimiter is unambiguous and distinct
//! inputs never produce the same identifier.

use crate::error::{DocfoldError, DocfoldResult};
use crate::version::ResolvedVersion;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "--";

/// Deterministic name for one resolved version of a source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactIdentifier(String);

impl ArtifactIdentifier {
    /// Build the identifier, rejecting components unsafe for file names
    pub fn new(source: &str, tag: &str, last_update: NaiveDate) -> DocfoldResult<Self> {
        check_component("source name", source)?;
        check_component("release tag", tag)?;

        let date = last_update.format("%Y-%m-%d").to_string();
        Ok(Self([source, tag, date.as_str()].join(DELIMITER)))
    }

    /// Identifier for a resolved version of `source`
    pub fn for_version(source: &str, version: &ResolvedVersion) -> DocfoldResult<Self> {
        Self::new(source, &version.tag, version.last_update)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_component(component: &str, value: &str) -> DocfoldResult<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be a relative directory name")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
        Some("must not contain whitespace or control characters")
    } else if value.contains(DELIMITER) {
        Some("must not contain \"--\"")
    } else if value.starts_with('-') || value.ends_with('-') {
        Some("must not start or end with '-'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DocfoldError::InvalidIdentifier {
            component: component.to_string(),
            reason: format!("{:?} {}", value, reason),
        }),
        None => Ok(()),
    }
}

/// Paths of all stage outputs for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Fetched document tree
    pub docs_dir: PathBuf,
    /// Merged markdown document
    pub merged: PathBuf,
    /// Rendered PDF
    pub rendered: PathBuf,
}

impl ArtifactPaths {
    pub fn new(work_dir: &Path, id: &ArtifactIdentifier) -> Self {
        Self {
            docs_dir: work_dir.join(id.as_str()),
            merged: work_dir.join(format!("{}.md", id)),
            rendered: work_dir.join(format!("{}.pdf", id)),
        }
    }
}
