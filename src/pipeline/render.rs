//! Rendering the merged document to PDF
//!
//! Markdown goes to standalone HTML through the markdown converter, then
//! to PDF through the HTML converter. Both steps write to temporary
//! siblings, so the final PDF only appears once it is complete. The merged
//! input is never modified.

use crate::atomic::rename_into_place;
use crate::config::schema::RenderConfig;
use crate::error::{DocfoldError, DocfoldResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Turns a merged markdown document into the final artifact
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, merged: &Path, output: &Path) -> DocfoldResult<()>;
}

/// pandoc + wkhtmltopdf renderer
#[derive(Debug, Clone)]
pub struct PandocRenderer {
    markdown_command: String,
    pdf_command: String,
    page_size: String,
    keep_html: bool,
    timeout: Duration,
}

impl PandocRenderer {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            markdown_command: config.markdown_command.clone(),
            pdf_command: config.pdf_command.clone(),
            page_size: config.page_size.clone(),
            keep_html: config.keep_html,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run a configured command line with extra arguments appended.
    /// The command line may carry leading arguments ("sh ./convert.sh").
    async fn run_tool(&self, command_line: &str, args: &[&str]) -> DocfoldResult<()> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or_else(|| DocfoldError::RenderFailed {
            tool: command_line.to_string(),
            stderr: "empty command".to_string(),
        })?;
        let tool = program.to_string();

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Executing: {} {:?}", command_line, args);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| DocfoldError::Timeout {
                operation: tool.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| DocfoldError::RenderFailed {
                tool: tool.clone(),
                stderr: format!("could not start: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DocfoldError::RenderFailed {
                tool,
                stderr: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(())
    }

    async fn convert(&self, merged: &Path, html_tmp: &Path, pdf_tmp: &Path) -> DocfoldResult<()> {
        let title = merged
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let merged_arg = merged.to_string_lossy();
        let html_arg = html_tmp.to_string_lossy();
        let pdf_arg = pdf_tmp.to_string_lossy();
        let title_arg = format!("title={}", title);

        self.run_tool(
            &self.markdown_command,
            &[
                &merged_arg,
                "--from",
                "gfm",
                "--standalone",
                "--metadata",
                &title_arg,
                "-o",
                &html_arg,
            ],
        )
        .await?;

        self.run_tool(
            &self.pdf_command,
            &[
                "--quiet",
                "--page-size",
                &self.page_size,
                "--enable-local-file-access",
                &html_arg,
                &pdf_arg,
            ],
        )
        .await
    }
}

#[async_trait]
impl Renderer for PandocRenderer {
    async fn render(&self, merged: &Path, output: &Path) -> DocfoldResult<()> {
        let html = output.with_extension("html");
        let html_tmp = staging_path(&html);
        let pdf_tmp = staging_path(output);

        let result = self.convert(merged, &html_tmp, &pdf_tmp).await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&html_tmp).await;
            let _ = tokio::fs::remove_file(&pdf_tmp).await;
            return Err(e);
        }

        rename_into_place(&pdf_tmp, output).await?;
        if self.keep_html {
            rename_into_place(&html_tmp, &html).await?;
        } else {
            let _ = tokio::fs::remove_file(&html_tmp).await;
        }

        info!("Rendered {}", output.display());
        Ok(())
    }
}

/// Temporary sibling keeping the extension the converters read the format
/// from: `doc.html` becomes `doc.docfold-tmp.html`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(".docfold-tmp");
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}
