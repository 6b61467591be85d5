//! Terminal output and prompts
//!
//! `cliclack` in interactive terminals, plain bracketed lines otherwise.

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{intro, key_value, outro, step, Status};
pub use prompts::{confirm, ConsolePrompter};
