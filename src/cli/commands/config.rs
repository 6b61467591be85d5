//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{DocfoldError, DocfoldResult};
use crate::pipeline::OverwritePolicy;
use crate::ui::{self, Status, UiContext};
use clap::ValueEnum;
use std::path::PathBuf;

const KEYS: &[&str] = &[
    "general.log_format",
    "general.history",
    "source.name",
    "source.owner",
    "source.repo",
    "source.api_base",
    "source.clone_url",
    "source.branch",
    "source.docs_path",
    "source.extensions",
    "source.token_env",
    "source.timeout_secs",
    "cache.path",
    "cache.duration_secs",
    "pipeline.work_dir",
    "pipeline.overwrite",
    "pipeline.fetch_timeout_secs",
    "render.markdown_command",
    "render.pdf_command",
    "render.page_size",
    "render.keep_html",
    "render.timeout_secs",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> DocfoldResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => println!("{}", toml::to_string_pretty(config)?),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut updated = config.clone();
            apply_setting(&mut updated, &key, &value)?;
            manager.save(&updated).await?;
            ui::step(
                &UiContext::detect(),
                Status::Ok,
                &format!("Set {} = {}", key, value),
            );
        }
    }
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> DocfoldResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step(
            &ctx,
            Status::Warn,
            &format!("Config already exists at {} (use --force to overwrite)", path.display()),
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step(
        &ctx,
        Status::Ok,
        &format!("Configuration written to {}", path.display()),
    );
    Ok(())
}

/// Set one dotted key on `config`
pub fn apply_setting(config: &mut Config, key: &str, value: &str) -> DocfoldResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["general", "history"] => config.general.history = parse_bool(value)?,

        ["source", "name"] => config.source.name = value.to_string(),
        ["source", "owner"] => config.source.owner = value.to_string(),
        ["source", "repo"] => config.source.repo = value.to_string(),
        ["source", "api_base"] => config.source.api_base = value.to_string(),
        ["source", "clone_url"] => config.source.clone_url = optional(value),
        ["source", "branch"] => config.source.branch = optional(value),
        ["source", "docs_path"] => config.source.docs_path = value.to_string(),
        ["source", "extensions"] => {
            config.source.extensions = value
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["source", "token_env"] => config.source.token_env = value.to_string(),
        ["source", "timeout_secs"] => config.source.timeout_secs = parse_secs(value)?,

        ["cache", "path"] => config.cache.path = optional(value).map(PathBuf::from),
        ["cache", "duration_secs"] => config.cache.duration_secs = parse_secs(value)?,

        ["pipeline", "work_dir"] => config.pipeline.work_dir = PathBuf::from(value),
        ["pipeline", "overwrite"] => {
            config.pipeline.overwrite = OverwritePolicy::from_str(value, true).map_err(|_| {
                DocfoldError::User(format!(
                    "Invalid overwrite policy: {}. Use prompt, redo, skip or fail",
                    value
                ))
            })?
        }
        ["pipeline", "fetch_timeout_secs"] => {
            config.pipeline.fetch_timeout_secs = parse_secs(value)?
        }

        ["render", "markdown_command"] => config.render.markdown_command = value.to_string(),
        ["render", "pdf_command"] => config.render.pdf_command = value.to_string(),
        ["render", "page_size"] => config.render.page_size = value.to_string(),
        ["render", "keep_html"] => config.render.keep_html = parse_bool(value)?,
        ["render", "timeout_secs"] => config.render.timeout_secs = parse_secs(value)?,

        _ => {
            return Err(DocfoldError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                KEYS.join(", ")
            )))
        }
    }
    Ok(())
}

/// Empty string clears an optional setting
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_log_format(value: &str) -> DocfoldResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(DocfoldError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

fn parse_bool(value: &str) -> DocfoldResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(DocfoldError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_secs(value: &str) -> DocfoldResult<u64> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(DocfoldError::User(format!(
            "Invalid number of seconds: {}",
            value
        ))),
        Ok(n) => Ok(n),
    }
}
