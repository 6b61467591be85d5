//! Flat key/value store for remote metadata
//!
//! One `key=value` entry per line. Every write also records a stamp line
//! `@key=<RFC 3339 time>` which is the key's freshness clock. Keys without
//! a stamp age from the store file's modification time.
//!
//! Escapes: `\\`, `\n`, `\r` in keys and values, `\=` in keys, and `\@`
//! for a key that starts with `@`. A raw leading `@` always marks a stamp.

use crate::atomic::write_atomic;
use crate::error::{DocfoldError, DocfoldResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

const STAMP_PREFIX: char = '@';

/// A cached value with its last refresh time, if one was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Durable key/value storage for resolved metadata
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value for `key`, or `None` when the store or key is missing
    async fn get(&self, key: &str) -> Option<String>;

    /// Replace any value for `key`, creating the store if needed
    async fn set(&self, key: &str, value: &str) -> DocfoldResult<()>;

    /// Time since `key` was last refreshed, `None` if it is not cached
    async fn age(&self, key: &str) -> Option<Duration>;

    /// Whether the backing store exists at all
    async fn exists(&self) -> bool;
}

/// Cache store backed by a single flat file
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Value { key: String, value: String },
    Stamp { key: String, at: Option<DateTime<Utc>> },
}

impl Line {
    fn key(&self) -> &str {
        match self {
            Self::Value { key, .. } | Self::Stamp { key, .. } => key,
        }
    }
}

impl FileCacheStore {
    /// Create a store for the file at `path` (the file need not exist)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time since the store file was last modified
    pub async fn store_age(&self) -> Option<Duration> {
        let meta = fs::metadata(&self.path).await.ok()?;
        let modified = meta.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Latest entry per key, in first-seen order
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let lines = self.read_lines().await;
        let mut entries: Vec<CacheEntry> = Vec::new();

        for line in lines.iter().filter_map(|l| parse_line(l)) {
            if let Line::Value { key, value } = line {
                match entries.iter_mut().find(|e| e.key == key) {
                    Some(existing) => existing.value = value,
                    None => entries.push(CacheEntry {
                        key,
                        value,
                        refreshed_at: None,
                    }),
                }
            }
        }

        for entry in &mut entries {
            entry.refreshed_at = last_stamp(&lines, &entry.key);
        }
        entries
    }

    /// Remove the store file. Returns whether it existed.
    pub async fn clear(&self) -> DocfoldResult<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed cache store {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DocfoldError::io(
                format!("removing cache store {}", self.path.display()),
                e,
            )),
        }
    }

    async fn read_lines(&self) -> Vec<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Ignoring unreadable cache store {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.read_lines()
            .await
            .iter()
            .filter_map(|l| parse_line(l))
            .filter_map(|line| match line {
                Line::Value { key: k, value } if k == key => Some(value),
                _ => None,
            })
            .last()
    }

    async fn set(&self, key: &str, value: &str) -> DocfoldResult<()> {
        if key.is_empty() {
            return Err(DocfoldError::InvalidCacheKey {
                key: key.to_string(),
                reason: "key must not be empty".to_string(),
            });
        }

        let mut kept: Vec<String> = self
            .read_lines()
            .await
            .into_iter()
            .filter(|l| parse_line(l).map_or(true, |parsed| parsed.key() != key))
            .collect();

        let escaped = escape_key(key);
        kept.push(format!("{}={}", escaped, escape_value(value)));
        kept.push(format!(
            "{}{}={}",
            STAMP_PREFIX,
            escaped,
            Utc::now().to_rfc3339()
        ));

        let mut content = kept.join("\n");
        content.push('\n');
        write_atomic(&self.path, content.as_bytes()).await?;

        debug!("Cached {} in {}", key, self.path.display());
        Ok(())
    }

    async fn age(&self, key: &str) -> Option<Duration> {
        let lines = self.read_lines().await;
        let cached = lines
            .iter()
            .filter_map(|l| parse_line(l))
            .any(|line| matches!(line, Line::Value { key: ref k, .. } if k == key));
        if !cached {
            return None;
        }

        match last_stamp(&lines, key) {
            Some(at) => Some((Utc::now() - at).to_std().unwrap_or(Duration::ZERO)),
            None => self.store_age().await,
        }
    }

    async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

fn last_stamp(lines: &[String], key: &str) -> Option<DateTime<Utc>> {
    lines
        .iter()
        .filter_map(|l| parse_line(l))
        .filter_map(|line| match line {
            Line::Stamp { key: k, at } if k == key => Some(at),
            _ => None,
        })
        .last()
        .flatten()
}

fn parse_line(line: &str) -> Option<Line> {
    if line.is_empty() {
        return None;
    }

    let (is_stamp, body) = match line.strip_prefix(STAMP_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let Some(split) = find_unescaped_eq(body) else {
        warn!("Skipping malformed cache line: {:?}", line);
        return None;
    };

    let key = unescape(&body[..split]);
    let raw = &body[split + 1..];

    if is_stamp {
        let at = DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|d| d.with_timezone(&Utc));
        Some(Line::Stamp { key, at })
    } else {
        Some(Line::Value {
            key,
            value: unescape(raw),
        })
    }
}

fn find_unescaped_eq(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => return Some(i),
            _ => {}
        }
    }
    None
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '=' => out.push_str("\\="),
            STAMP_PREFIX if i == 0 => out.push_str("\\@"),
            c => out.push(c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
