//! Cache-aware version resolution
//!
//! The release tag and the last-update date are resolved by two
//! independent flows with the same shape: a fresh cached value is used as
//! is, a missing or stale one is refreshed from the [`VersionSource`], and
//! a failed refresh falls back to whatever is cached.

use crate::cache::CacheStore;
use crate::error::{DocfoldError, DocfoldResult};
use crate::version::source::VersionSource;
use chrono::NaiveDate;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Version identity of the documentation set for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub tag: String,
    pub last_update: NaiveDate,
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Fetched from the remote source this run
    Remote,
    /// Read from a fresh cache entry
    Cached,
    /// Remote refresh failed; a stale cached value was reused
    StaleFallback,
}

/// Outcome of resolution, with provenance for each value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: ResolvedVersion,
    pub tag_origin: ValueOrigin,
    pub date_origin: ValueOrigin,
}

impl Resolution {
    /// Whether any value is a stale fallback
    pub fn used_stale_fallback(&self) -> bool {
        self.tag_origin == ValueOrigin::StaleFallback
            || self.date_origin == ValueOrigin::StaleFallback
    }
}

/// How the resolver may use the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Honor the freshness window
    #[default]
    Normal,
    /// Always ask the remote, still falling back to cache on failure
    Refresh,
    /// Never ask the remote; any cached value is acceptable
    Offline,
}

/// Resolves the current version through the metadata cache
pub struct VersionResolver<'a> {
    cache: &'a dyn CacheStore,
    source: &'a dyn VersionSource,
    cache_duration: Duration,
    namespace: String,
    mode: ResolveMode,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver; cache keys are prefixed with `namespace`
    pub fn new(
        cache: &'a dyn CacheStore,
        source: &'a dyn VersionSource,
        cache_duration: Duration,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            source,
            cache_duration,
            namespace: namespace.into(),
            mode: ResolveMode::Normal,
        }
    }

    /// Set the resolve mode
    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Cache key holding the latest release tag
    pub fn tag_key(&self) -> String {
        tag_key(&self.namespace)
    }

    /// Cache key holding the last update date
    pub fn date_key(&self) -> String {
        date_key(&self.namespace)
    }

    /// Resolve tag and last-update date
    pub async fn resolve(&self) -> DocfoldResult<Resolution> {
        let (tag, tag_origin) = self
            .resolve_value(
                &self.tag_key(),
                "latest release tag",
                |v| !v.trim().is_empty(),
                move || async move {
                    let lookup = self.source.latest_release_tag().await?;
                    let success = lookup.is_success();
                    match lookup.tag {
                        Some(tag) if success => Ok(tag),
                        _ => Err(DocfoldError::HttpStatus {
                            url: "latest release".to_string(),
                            status: lookup.status,
                        }),
                    }
                },
            )
            .await?;

        let (date, date_origin) = self
            .resolve_value(
                &self.date_key(),
                "last update date",
                |v| parse_date(v).is_some(),
                move || async move {
                    let date = self.source.most_recent_commit_date().await?;
                    Ok(date.format(DATE_FORMAT).to_string())
                },
            )
            .await?;

        let last_update = parse_date(&date).ok_or_else(|| {
            DocfoldError::Internal(format!("resolved date {:?} is not YYYY-MM-DD", date))
        })?;

        info!("Resolved {} (last update {})", tag, last_update);
        Ok(Resolution {
            version: ResolvedVersion { tag, last_update },
            tag_origin,
            date_origin,
        })
    }

    async fn resolve_value<V, F, Fut>(
        &self,
        key: &str,
        what: &str,
        valid: V,
        fetch: F,
    ) -> DocfoldResult<(String, ValueOrigin)>
    where
        V: Fn(&str) -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocfoldResult<String>>,
    {
        let cached = self.cache.get(key).await.filter(|v| valid(v.as_str()));

        if let Some(ref value) = cached {
            match self.mode {
                ResolveMode::Offline => {
                    debug!("Offline: using cached {} = {}", key, value);
                    return Ok((value.clone(), ValueOrigin::Cached));
                }
                ResolveMode::Normal => {
                    if let Some(age) = self.cache.age(key).await {
                        if age <= self.cache_duration {
                            debug!("Cache hit for {} (age {}s)", key, age.as_secs());
                            return Ok((value.clone(), ValueOrigin::Cached));
                        }
                        debug!("Cache entry {} is stale (age {}s)", key, age.as_secs());
                    }
                }
                ResolveMode::Refresh => debug!("Refresh requested for {}", key),
            }
        } else if self.mode == ResolveMode::Offline {
            return Err(DocfoldError::NotCached {
                what: what.to_string(),
            });
        }

        match fetch().await.and_then(|v| {
            if valid(v.as_str()) {
                Ok(v)
            } else {
                Err(DocfoldError::UnexpectedResponse {
                    url: key.to_string(),
                    reason: format!("unusable value {:?}", v),
                })
            }
        }) {
            Ok(fresh) => {
                self.cache.set(key, &fresh).await?;
                Ok((fresh, ValueOrigin::Remote))
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!("Could not refresh {}: {}; using cached {}", what, e, stale);
                    Ok((stale, ValueOrigin::StaleFallback))
                }
                None => Err(DocfoldError::ResolutionFailed {
                    what: what.to_string(),
                    source: Box::new(e),
                }),
            },
        }
    }
}

/// Cache key for the latest release tag of `namespace`
pub fn tag_key(namespace: &str) -> String {
    format!("{}:latest_tag", namespace)
}

/// Cache key for the last update date of `namespace`
pub fn date_key(namespace: &str) -> String {
    format!("{}:last_update", namespace)
}

/// Parse a cached `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}
