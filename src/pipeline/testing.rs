//! In-memory collaborators for pipeline tests

use super::fetch::DocumentFetcher;
use super::gate::Prompter;
use super::render::Renderer;
use crate::error::{DocfoldError, DocfoldResult};
use crate::version::{parse_date, TagLookup, VersionSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Answers prompts from a fixed script and records what was asked
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> DocfoldResult<bool> {
        self.asked.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DocfoldError::Internal(format!("unexpected prompt: {}", message)))
    }
}

/// Writes a fixed set of documents into the target directory
pub struct FakeFetcher {
    files: Vec<(String, String)>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn materialize(&self, target: &Path) -> DocfoldResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DocfoldError::FetchFailed {
                reason: "network unreachable".to_string(),
            });
        }
        for (relative, content) in &self.files {
            let path = target.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.unwrap();
            }
            tokio::fs::write(&path, content).await.unwrap();
        }
        tokio::fs::create_dir_all(target).await.unwrap();
        Ok(())
    }
}

/// Renders by copying the merged document, prefixed with a marker
pub struct FakeRenderer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, merged: &Path, output: &Path) -> DocfoldResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DocfoldError::RenderFailed {
                tool: "wkhtmltopdf".to_string(),
                stderr: "exit status 1".to_string(),
            });
        }
        let content = tokio::fs::read_to_string(merged).await.unwrap();
        tokio::fs::write(output, format!("PDF\n{}", content))
            .await
            .unwrap();
        Ok(())
    }
}

/// Version source with a fixed answer, or one that always fails
pub struct FixedSource {
    tag: Option<String>,
    date: Option<NaiveDate>,
    tag_calls: AtomicUsize,
}

impl FixedSource {
    pub fn new(tag: &str, date: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            date: parse_date(date),
            tag_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            tag: None,
            date: None,
            tag_calls: AtomicUsize::new(0),
        }
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionSource for FixedSource {
    async fn latest_release_tag(&self) -> DocfoldResult<TagLookup> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.tag {
            Some(ref tag) => TagLookup::ok(tag.clone()),
            None => TagLookup {
                status: 503,
                tag: None,
            },
        })
    }

    async fn most_recent_commit_date(&self) -> DocfoldResult<NaiveDate> {
        self.date.ok_or_else(|| DocfoldError::HttpStatus {
            url: "https://api.github.invalid/commits".to_string(),
            status: 503,
        })
    }
}
