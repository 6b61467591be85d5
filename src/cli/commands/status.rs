//! Status command - offline view of cached metadata and artifacts

use crate::artifact::{ArtifactIdentifier, ArtifactPaths};
use crate::cache::{CacheStore, FileCacheStore};
use crate::config::{Config, ConfigManager};
use crate::error::DocfoldResult;
use crate::ui::{self, Status, UiContext};
use crate::version::{date_key, parse_date, tag_key};
use std::path::Path;
use std::time::Duration;

/// Execute the status command
pub async fn execute(config: &Config) -> DocfoldResult<()> {
    let ctx = UiContext::detect();
    let cache = FileCacheStore::new(ConfigManager::cache_path(config));
    let window = Duration::from_secs(config.cache.duration_secs);
    let namespace = config.source.cache_namespace();

    ui::intro(&ctx, "docfold status");
    ui::key_value(&ctx, "source", &format!("{} ({})", config.source.name, namespace));
    ui::key_value(&ctx, "cache", &cache.path().display().to_string());
    ui::key_value(&ctx, "work dir", &config.pipeline.work_dir.display().to_string());

    if !cache.exists().await {
        ui::step(&ctx, Status::Warn, "No cached metadata; run `docfold build`");
        return Ok(());
    }

    let tag = cache.get(&tag_key(&namespace)).await;
    let date = cache.get(&date_key(&namespace)).await;
    for (label, key, value) in [
        ("release tag", tag_key(&namespace), &tag),
        ("last update", date_key(&namespace), &date),
    ] {
        let age = cache.age(&key).await;
        match value {
            Some(value) => ui::step(
                &ctx,
                if is_fresh(age, window) { Status::Ok } else { Status::Warn },
                &format!("{}: {} ({})", label, value, describe_age(age, window)),
            ),
            None => ui::step(&ctx, Status::Warn, &format!("{}: not cached", label)),
        }
    }

    let identifier = match (tag, date.as_deref().and_then(parse_date)) {
        (Some(tag), Some(date)) => ArtifactIdentifier::new(&config.source.name, &tag, date).ok(),
        _ => None,
    };
    match identifier {
        Some(id) => report_artifacts(&ctx, &ArtifactPaths::new(&config.pipeline.work_dir, &id)),
        None => ui::step(&ctx, Status::Info, "No artifact identifier from cached metadata"),
    }

    Ok(())
}

fn report_artifacts(ctx: &UiContext, paths: &ArtifactPaths) {
    for (label, path) in [
        ("documents", &paths.docs_dir),
        ("merged", &paths.merged),
        ("rendered", &paths.rendered),
    ] {
        let status = if path_present(path) { Status::Ok } else { Status::Skip };
        let state = if status == Status::Ok { "present" } else { "missing" };
        ui::step(ctx, status, &format!("{}: {} {}", label, state, path.display()));
    }
}

fn path_present(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Whether an entry of `age` is inside the freshness window
pub fn is_fresh(age: Option<Duration>, window: Duration) -> bool {
    age.is_some_and(|age| age <= window)
}

/// "fresh, 12m old" / "stale, 3h old" / "no refresh time"
pub fn describe_age(age: Option<Duration>, window: Duration) -> String {
    match age {
        Some(age) => format!(
            "{}, {} old",
            if age <= window { "fresh" } else { "stale" },
            format_duration(age)
        ),
        None => "no refresh time".to_string(),
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn freshness_boundaries() {
        assert!(is_fresh(Some(Duration::from_secs(10)), HOUR));
        assert!(is_fresh(Some(HOUR), HOUR));
        assert!(!is_fresh(Some(HOUR + Duration::from_secs(1)), HOUR));
        assert!(!is_fresh(None, HOUR));
    }

    #[test]
    fn age_descriptions() {
        assert_eq!(describe_age(Some(Duration::from_secs(720)), HOUR), "fresh, 12m old");
        assert_eq!(describe_age(Some(Duration::from_secs(3 * 3600)), HOUR), "stale, 3h old");
        assert_eq!(describe_age(None, HOUR), "no refresh time");
        assert_eq!(format_duration(Duration::from_secs(2 * 86_400 + 5)), "2d");
    }
}
