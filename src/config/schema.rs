//! Configuration schema for docfold
//!
//! Configuration is stored at `~/.config/docfold/config.toml`

use crate::pipeline::OverwritePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Documentation source
    pub source: SourceConfig,

    /// Metadata cache settings
    pub cache: CacheConfig,

    /// Pipeline behaviour
    pub pipeline: PipelineConfig,

    /// Rendering toolchain
    pub render: RenderConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record each build in the run history log
    pub history: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            history: true,
        }
    }
}

/// Remote documentation source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Name used as the artifact identifier prefix
    pub name: String,

    /// Repository owner on GitHub
    pub owner: String,

    /// Repository name on GitHub
    pub repo: String,

    /// GitHub REST API base URL
    pub api_base: String,

    /// Clone URL override (defaults to https://github.com/<owner>/<repo>.git)
    pub clone_url: Option<String>,

    /// Branch to check out and to read the last commit date from
    pub branch: Option<String>,

    /// Documentation subtree inside the repository
    pub docs_path: String,

    /// File extensions treated as markdown documents
    pub extensions: Vec<String>,

    /// Environment variable holding an optional API token
    pub token_env: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "next-js".to_string(),
            owner: "vercel".to_string(),
            repo: "next.js".to_string(),
            api_base: "https://api.github.com".to_string(),
            clone_url: None,
            branch: None,
            docs_path: "docs".to_string(),
            extensions: vec!["md".to_string(), "mdx".to_string()],
            token_env: "GITHUB_TOKEN".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    /// Repository clone URL
    pub fn clone_url(&self) -> String {
        self.clone_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}/{}.git", self.owner, self.repo))
    }

    /// Prefix used for this source's cache keys
    pub fn cache_namespace(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Metadata cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file path (defaults to the user cache directory)
    pub path: Option<PathBuf>,

    /// Seconds a cached value stays fresh
    pub duration_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            duration_secs: 3600,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding fetched, merged and rendered artifacts
    pub work_dir: PathBuf,

    /// What to do when a stage output already exists
    pub overwrite: OverwritePolicy,

    /// Timeout for the document fetch in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("docfold-output"),
            overwrite: OverwritePolicy::Prompt,
            fetch_timeout_secs: 600,
        }
    }
}

/// Rendering toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Markdown to HTML converter
    pub markdown_command: String,

    /// HTML to PDF converter
    pub pdf_command: String,

    /// Page size passed to the PDF converter
    pub page_size: String,

    /// Keep the intermediate HTML next to the PDF
    pub keep_html: bool,

    /// Timeout for each rendering step in seconds
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            markdown_command: "pandoc".to_string(),
            pdf_command: "wkhtmltopdf".to_string(),
            page_size: "A4".to_string(),
            keep_html: false,
            timeout_secs: 600,
        }
    }
}
