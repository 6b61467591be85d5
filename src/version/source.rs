//! Remote version source
//!
//! Answers "what is the latest release tag?" and "when was the last
//! commit?" for one repository. The default implementation talks to the
//! GitHub REST API with a blocking `ureq` agent on the blocking pool.

use crate::config::schema::SourceConfig;
use crate::error::{DocfoldError, DocfoldResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Answer to a latest-release query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLookup {
    /// HTTP status of the release call
    pub status: u16,
    /// Tag name, present when the call succeeded
    pub tag: Option<String>,
}

impl TagLookup {
    /// A 200 response carrying a tag
    pub fn ok(tag: impl Into<String>) -> Self {
        Self {
            status: 200,
            tag: Some(tag.into()),
        }
    }

    /// Whether the lookup produced a usable tag
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.tag.is_some()
    }
}

/// Source of version metadata for a documentation set
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Latest published release tag
    async fn latest_release_tag(&self) -> DocfoldResult<TagLookup>;

    /// Calendar date (UTC) of the most recent commit
    async fn most_recent_commit_date(&self) -> DocfoldResult<NaiveDate>;
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

#[derive(Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    committer: Signature,
}

#[derive(Deserialize)]
struct Signature {
    date: String,
}

/// GitHub REST API version source
#[derive(Debug, Clone)]
pub struct GithubSource {
    api_base: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl GithubSource {
    /// Build a source from config, reading the token from `source.token_env`
    pub fn from_config(config: &SourceConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        )
    }

    fn commits_url(&self) -> String {
        let mut url = format!(
            "{}/repos/{}/{}/commits?per_page=1",
            self.api_base, self.owner, self.repo
        );
        if let Some(ref branch) = self.branch {
            url.push_str("&sha=");
            url.push_str(branch);
        }
        url
    }

    async fn get(&self, url: String) -> DocfoldResult<(u16, String)> {
        debug!("GET {}", url);
        let token = self.token.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || http_get(&url, token.as_deref(), timeout))
            .await
            .map_err(|e| DocfoldError::Internal(format!("HTTP task failed: {}", e)))?
    }
}

#[async_trait]
impl VersionSource for GithubSource {
    async fn latest_release_tag(&self) -> DocfoldResult<TagLookup> {
        let url = self.releases_url();
        let (status, body) = self.get(url.clone()).await?;

        if status != 200 {
            debug!("Release lookup returned status {}", status);
            return Ok(TagLookup { status, tag: None });
        }

        let release: Release =
            serde_json::from_str(&body).map_err(|e| DocfoldError::UnexpectedResponse {
                url,
                reason: e.to_string(),
            })?;

        Ok(TagLookup::ok(release.tag_name))
    }

    async fn most_recent_commit_date(&self) -> DocfoldResult<NaiveDate> {
        let url = self.commits_url();
        let (status, body) = self.get(url.clone()).await?;

        if status != 200 {
            return Err(DocfoldError::HttpStatus { url, status });
        }

        parse_commit_date(&body).map_err(|reason| DocfoldError::UnexpectedResponse { url, reason })
    }
}

fn http_get(url: &str, token: Option<&str>, timeout: Duration) -> DocfoldResult<(u16, String)> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into();

    let mut request = agent
        .get(url)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", concat!("docfold/", env!("CARGO_PKG_VERSION")));
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let mut response = request.call().map_err(|e| match e {
        ureq::Error::Timeout(_) => DocfoldError::HttpTimeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        },
        other => DocfoldError::Http {
            url: url.to_string(),
            reason: other.to_string(),
        },
    })?;

    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| DocfoldError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok((status, body))
}

fn parse_commit_date(body: &str) -> Result<NaiveDate, String> {
    let commits: Vec<CommitItem> = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let first = commits
        .first()
        .ok_or_else(|| "no commits returned".to_string())?;

    DateTime::parse_from_rfc3339(&first.commit.committer.date)
        .map(|d| d.with_timezone(&Utc).date_naive())
        .map_err(|e| format!("bad commit date {:?}: {}", first.commit.committer.date, e))
}
