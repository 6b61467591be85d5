//! Confirmation prompts with a non-interactive fallback

use super::context::UiContext;
use crate::error::{DocfoldError, DocfoldResult};
use crate::pipeline::Prompter;
use async_trait::async_trait;

/// Ask a yes/no question.
///
/// `--yes` answers yes; a non-interactive terminal answers `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> DocfoldResult<bool> {
    if ctx.auto_yes() {
        eprintln!("  {} (yes)", message);
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| DocfoldError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(prompt_error)
}

/// Ctrl-C inside a prompt surfaces as `Interrupted`, like the signal path
fn prompt_error(e: std::io::Error) -> DocfoldError {
    match e.kind() {
        std::io::ErrorKind::Interrupted => DocfoldError::Interrupted,
        _ => DocfoldError::User(format!("prompt failed: {}", e)),
    }
}

/// Operator-facing [`Prompter`] for the pipeline gates; declines by default
pub struct ConsolePrompter {
    ctx: UiContext,
}

impl ConsolePrompter {
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn confirm(&self, message: &str) -> DocfoldResult<bool> {
        confirm(&self.ctx, message, false).await
    }
}
