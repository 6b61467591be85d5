//! Cache command - inspect or clear the version metadata cache

use crate::cache::{CacheEntry, FileCacheStore, RunLock};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::status::format_duration;
use crate::config::{Config, ConfigManager};
use crate::error::DocfoldResult;
use crate::ui::{self, Status, UiContext};
use chrono::{DateTime, Utc};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> DocfoldResult<()> {
    let cache = FileCacheStore::new(ConfigManager::cache_path(config));

    match args.action {
        CacheAction::Show { format } => show(&cache, format).await,
        CacheAction::Clear { yes } => clear(&cache, config, yes).await,
    }
}

async fn show(cache: &FileCacheStore, format: OutputFormat) -> DocfoldResult<()> {
    let entries = cache.entries().await;
    let now = Utc::now();

    match format {
        OutputFormat::Json => println!("{}", entries_json(&entries, now)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}={}", entry.key, entry.value);
            }
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No cached entries in {}", cache.path().display());
                return Ok(());
            }
            println!("{:<32} {:<20} {:<10}", "KEY", "VALUE", "AGE");
            println!("{}", "-".repeat(64));
            for entry in &entries {
                println!(
                    "{:<32} {:<20} {:<10}",
                    entry.key,
                    entry.value,
                    style(age_label(entry.refreshed_at, now)).dim()
                );
            }
        }
    }
    Ok(())
}

async fn clear(cache: &FileCacheStore, config: &Config, yes: bool) -> DocfoldResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    let question = format!("Delete cached metadata at {}?", cache.path().display());
    if !ui::confirm(&ctx, &question, false).await? {
        ui::step(&ctx, Status::Skip, "Cancelled; pass --yes to clear without a prompt");
        return Ok(());
    }

    let _lock = RunLock::acquire(&ConfigManager::lock_path(config)).await?;
    if cache.clear().await? {
        ui::step(&ctx, Status::Ok, &format!("Removed {}", cache.path().display()));
    } else {
        ui::step(&ctx, Status::Info, "Cache was already empty");
    }
    Ok(())
}

fn age_label(refreshed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match refreshed_at.and_then(|at| (now - at).to_std().ok()) {
        Some(age) => format_duration(age),
        None => "-".to_string(),
    }
}

fn entries_json(entries: &[CacheEntry], now: DateTime<Utc>) -> DocfoldResult<String> {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "key": e.key,
                "value": e.value,
                "refreshed_at": e.refreshed_at.map(|at| at.to_rfc3339()),
                "age_secs": e.refreshed_at.and_then(|at| (now - at).to_std().ok()).map(|d| d.as_secs()),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&items)?)
}
