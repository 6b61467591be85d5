//! Status lines for command output
//!
//! Interactive terminals get cliclack's framed log; anything else gets
//! bracketed plain lines that read well in CI logs.

use super::context::UiContext;
use console::style;

/// Kind of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Info,
    Warn,
    Skip,
}

impl Status {
    fn plain_tag(self) -> String {
        match self {
            Self::Ok => style("[OK]").green().to_string(),
            Self::Info => style("[INFO]").cyan().to_string(),
            Self::Warn => style("[WARN]").yellow().to_string(),
            Self::Skip => style("[SKIP]").dim().to_string(),
        }
    }
}

/// Title line
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.is_interactive() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Closing line; `ok = false` renders it as a warning
pub fn outro(ctx: &UiContext, message: &str, ok: bool) {
    if ctx.is_interactive() {
        let styled = if ok {
            style(message).green().bold()
        } else {
            style(message).yellow().bold()
        };
        cliclack::outro(styled).ok();
    } else {
        let status = if ok { Status::Ok } else { Status::Warn };
        println!("{} {}", status.plain_tag(), message);
    }
}

/// One status line
pub fn step(ctx: &UiContext, status: Status, message: &str) {
    if ctx.is_interactive() {
        let _ = match status {
            Status::Ok => cliclack::log::success(message),
            Status::Info => cliclack::log::info(message),
            Status::Warn => cliclack::log::warning(message),
            Status::Skip => cliclack::log::remark(style(message).dim()),
        };
    } else {
        println!("  {} {}", status.plain_tag(), message);
    }
}

/// Aligned `key: value` line
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {:<14} {}", style(format!("{}:", key)).dim(), value);
    } else {
        println!("  {:<14} {}", format!("{}:", key), value);
    }
}
