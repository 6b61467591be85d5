//! Pipeline orchestration
//!
//! Resolve, name, then fetch, merge and render, each stage guarded by its
//! gate. Stages run strictly in order and any failure aborts the run with
//! earlier artifacts left in place. Nothing is written under the work root
//! until resolution and naming have succeeded.

use super::fetch::DocumentFetcher;
use super::gate::{FetchGate, OverwritePolicy, Prompter, StageGate};
use super::merge::merge_documents;
use super::render::Renderer;
use crate::artifact::{ArtifactIdentifier, ArtifactPaths};
use crate::cache::CacheStore;
use crate::config::schema::Config;
use crate::error::{DocfoldError, DocfoldResult};
use crate::version::{Resolution, ResolveMode, VersionResolver, VersionSource};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Whether a stage did work this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Ran,
    Skipped,
}

impl StageOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ran => "ran",
            Self::Skipped => "skipped",
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub identifier: ArtifactIdentifier,
    pub resolution: Resolution,
    pub paths: ArtifactPaths,
    pub fetch: StageOutcome,
    pub merge: StageOutcome,
    pub render: StageOutcome,
}

impl PipelineReport {
    /// Path of the final rendered document
    pub fn output(&self) -> &Path {
        &self.paths.rendered
    }
}

/// Run parameters taken from configuration and flags
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_name: String,
    pub cache_namespace: String,
    pub extensions: Vec<String>,
    pub work_dir: PathBuf,
    pub cache_duration: Duration,
    pub overwrite: OverwritePolicy,
    pub mode: ResolveMode,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_name: config.source.name.clone(),
            cache_namespace: config.source.cache_namespace(),
            extensions: config.source.extensions.clone(),
            work_dir: config.pipeline.work_dir.clone(),
            cache_duration: Duration::from_secs(config.cache.duration_secs),
            overwrite: config.pipeline.overwrite,
            mode: ResolveMode::Normal,
        }
    }
}

/// Everything the pipeline talks to
pub struct Collaborators<'a> {
    pub cache: &'a dyn CacheStore,
    pub source: &'a dyn VersionSource,
    pub fetcher: &'a dyn DocumentFetcher,
    pub renderer: &'a dyn Renderer,
    pub prompter: &'a dyn Prompter,
}

pub struct PipelineOrchestrator<'a> {
    settings: PipelineSettings,
    deps: Collaborators<'a>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(settings: PipelineSettings, deps: Collaborators<'a>) -> Self {
        Self { settings, deps }
    }

    /// Resolve the current version and bring its artifacts up to date
    pub async fn run(&self) -> DocfoldResult<PipelineReport> {
        let resolution = self.resolve().await?;
        self.build(resolution).await
    }

    /// Resolve the current version without touching the work root
    pub async fn resolve(&self) -> DocfoldResult<Resolution> {
        VersionResolver::new(
            self.deps.cache,
            self.deps.source,
            self.settings.cache_duration,
            self.settings.cache_namespace.clone(),
        )
        .with_mode(self.settings.mode)
        .resolve()
        .await
    }

    /// Name the artifacts of `resolution` and run the gated stages
    pub async fn build(&self, resolution: Resolution) -> DocfoldResult<PipelineReport> {
        let identifier =
            ArtifactIdentifier::for_version(&self.settings.source_name, &resolution.version)?;
        let paths = ArtifactPaths::new(&self.settings.work_dir, &identifier);
        info!("Building {}", identifier);

        let fetch = self.fetch_stage(&paths).await?;
        let merge = self.merge_stage(&paths).await?;
        let render = self.render_stage(&paths).await?;

        Ok(PipelineReport {
            identifier,
            resolution,
            paths,
            fetch,
            merge,
            render,
        })
    }

    async fn fetch_stage(&self, paths: &ArtifactPaths) -> DocfoldResult<StageOutcome> {
        let decision = FetchGate::new(self.settings.overwrite, self.deps.prompter)
            .evaluate(paths)
            .await?;
        if !decision.should_fetch() {
            debug!("Fetch skipped ({:?})", decision);
            return Ok(StageOutcome::Skipped);
        }

        fs::create_dir_all(&self.settings.work_dir)
            .await
            .map_err(|e| {
                DocfoldError::io(
                    format!("creating work directory {}", self.settings.work_dir.display()),
                    e,
                )
            })?;
        self.deps.fetcher.materialize(&paths.docs_dir).await?;
        Ok(StageOutcome::Ran)
    }

    async fn merge_stage(&self, paths: &ArtifactPaths) -> DocfoldResult<StageOutcome> {
        let decision = StageGate::new(self.settings.overwrite, self.deps.prompter)
            .evaluate(&paths.merged)
            .await?;
        if !decision.should_run() {
            debug!("Merge skipped; keeping {}", paths.merged.display());
            return Ok(StageOutcome::Skipped);
        }

        merge_documents(&paths.docs_dir, &self.settings.extensions, &paths.merged).await?;
        Ok(StageOutcome::Ran)
    }

    async fn render_stage(&self, paths: &ArtifactPaths) -> DocfoldResult<StageOutcome> {
        let decision = StageGate::new(self.settings.overwrite, self.deps.prompter)
            .evaluate(&paths.rendered)
            .await?;
        if !decision.should_run() {
            debug!("Render skipped; keeping {}", paths.rendered.display());
            return Ok(StageOutcome::Skipped);
        }

        self.deps
            .renderer
            .render(&paths.merged, &paths.rendered)
            .await?;
        Ok(StageOutcome::Ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCacheStore;
    use crate::pipeline::testing::{FakeFetcher, FakeRenderer, FixedSource, ScriptedPrompter};
    use crate::version::ValueOrigin;
    use tempfile::TempDir;

    const DOCS: &[(&str, &str)] = &[
        ("02-pages/index.mdx", "# Pages"),
        ("01-app/index.mdx", "# App"),
    ];

    struct Harness {
        _temp: TempDir,
        work: PathBuf,
        cache: FileCacheStore,
    }

    impl Harness {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let work = temp.path().join("work");
            let cache = FileCacheStore::new(temp.path().join("cache").join("metadata.cache"));
            Self {
                _temp: temp,
                work,
                cache,
            }
        }

        fn settings(&self, overwrite: OverwritePolicy) -> PipelineSettings {
            PipelineSettings {
                source_name: "next-js".to_string(),
                cache_namespace: "vercel/next.js".to_string(),
                extensions: vec!["md".to_string(), "mdx".to_string()],
                work_dir: self.work.clone(),
                cache_duration: Duration::from_secs(3600),
                overwrite,
                mode: ResolveMode::Normal,
            }
        }

        async fn run(
            &self,
            overwrite: OverwritePolicy,
            source: &FixedSource,
            fetcher: &FakeFetcher,
            renderer: &FakeRenderer,
            prompter: &ScriptedPrompter,
        ) -> DocfoldResult<PipelineReport> {
            PipelineOrchestrator::new(
                self.settings(overwrite),
                Collaborators {
                    cache: &self.cache,
                    source,
                    fetcher,
                    renderer,
                    prompter,
                },
            )
            .run()
            .await
        }
    }

    #[tokio::test]
    async fn first_run_resolves_remotely_and_runs_every_stage() {
        let h = Harness::new();
        let source = FixedSource::new("v13.4.2", "2023-05-12");
        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::new();
        let prompter = ScriptedPrompter::new(&[]);

        let report = h
            .run(OverwritePolicy::Prompt, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();

        assert_eq!(report.identifier.as_str(), "next-js--v13.4.2--2023-05-12");
        assert_eq!(report.resolution.tag_origin, ValueOrigin::Remote);
        assert_eq!(
            (report.fetch, report.merge, report.render),
            (StageOutcome::Ran, StageOutcome::Ran, StageOutcome::Ran)
        );
        assert_eq!(
            std::fs::read_to_string(&report.paths.merged).unwrap(),
            "# App\n\n# Pages\n"
        );
        assert!(report.output().exists());
        assert!(h.cache.exists().await);
        assert!(prompter.messages().is_empty());
    }

    #[tokio::test]
    async fn rerun_with_skip_does_no_work() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::new();
        let prompter = ScriptedPrompter::new(&[]);

        h.run(OverwritePolicy::Skip, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();
        let second = h
            .run(OverwritePolicy::Skip, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();

        assert_eq!(
            (second.fetch, second.merge, second.render),
            (
                StageOutcome::Skipped,
                StageOutcome::Skipped,
                StageOutcome::Skipped
            )
        );
        assert_eq!(second.resolution.tag_origin, ValueOrigin::Cached);
        assert_eq!(source.tag_calls(), 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn confirmed_refetch_replaces_tree_and_merge() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let renderer = FakeRenderer::new();
        let first_fetcher = FakeFetcher::new(&[("old.md", "# Old")]);
        h.run(
            OverwritePolicy::Skip,
            &source,
            &first_fetcher,
            &renderer,
            &ScriptedPrompter::new(&[]),
        )
        .await
        .unwrap();

        // delete and re-fetch; merge is then absent, render is kept
        let fetcher = FakeFetcher::new(DOCS);
        let prompter = ScriptedPrompter::new(&[true, false]);
        let report = h
            .run(OverwritePolicy::Prompt, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();

        assert_eq!(report.fetch, StageOutcome::Ran);
        assert_eq!(report.merge, StageOutcome::Ran);
        assert_eq!(report.render, StageOutcome::Skipped);
        assert!(!report.paths.docs_dir.join("old.md").exists());
        assert_eq!(
            std::fs::read_to_string(&report.paths.merged).unwrap(),
            "# App\n\n# Pages\n"
        );
        assert_eq!(prompter.messages().len(), 2);
        assert!(prompter.messages()[0].contains("Delete it and fetch again?"));
    }

    #[tokio::test]
    async fn declined_merge_redo_renders_existing_merge() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let id = ArtifactIdentifier::new(
            "next-js",
            "v14.0.0",
            chrono::NaiveDate::from_ymd_opt(2023, 10, 26).unwrap(),
        )
        .unwrap();
        let paths = ArtifactPaths::new(&h.work, &id);
        std::fs::create_dir_all(&paths.docs_dir).unwrap();
        std::fs::write(paths.docs_dir.join("a.md"), "# Fresh").unwrap();
        std::fs::write(&paths.merged, "# Curated by hand\n").unwrap();

        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::new();
        // keep the tree, keep the merge; render is absent so not asked
        let prompter = ScriptedPrompter::new(&[false, false]);
        let report = h
            .run(OverwritePolicy::Prompt, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();

        assert_eq!(report.fetch, StageOutcome::Skipped);
        assert_eq!(report.merge, StageOutcome::Skipped);
        assert_eq!(report.render, StageOutcome::Ran);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(
            std::fs::read_to_string(&paths.merged).unwrap(),
            "# Curated by hand\n"
        );
        assert_eq!(
            std::fs::read_to_string(&paths.rendered).unwrap(),
            "PDF\n# Curated by hand\n"
        );
    }

    #[tokio::test]
    async fn failed_resolution_creates_nothing_under_work_root() {
        let h = Harness::new();
        let source = FixedSource::unavailable();
        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::new();
        let prompter = ScriptedPrompter::new(&[]);

        let err = h
            .run(OverwritePolicy::Redo, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap_err();

        assert!(matches!(err, DocfoldError::ResolutionFailed { .. }));
        assert!(!h.work.exists());
        assert!(!h.cache.exists().await);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_tag_aborts_before_any_stage() {
        let h = Harness::new();
        let source = FixedSource::new("../../etc", "2023-10-26");
        let fetcher = FakeFetcher::new(DOCS);

        let err = h
            .run(
                OverwritePolicy::Redo,
                &source,
                &fetcher,
                &FakeRenderer::new(),
                &ScriptedPrompter::new(&[]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocfoldError::InvalidIdentifier { .. }));
        assert!(!h.work.exists());
    }

    #[tokio::test]
    async fn render_failure_keeps_merged_document() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::failing();

        let err = h
            .run(
                OverwritePolicy::Redo,
                &source,
                &fetcher,
                &renderer,
                &ScriptedPrompter::new(&[]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocfoldError::RenderFailed { .. }));
        let merged = h.work.join("next-js--v14.0.0--2023-10-26.md");
        assert!(merged.exists());
        assert!(!h.work.join("next-js--v14.0.0--2023-10-26.pdf").exists());
    }

    #[tokio::test]
    async fn fetch_failure_stops_before_merge() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let renderer = FakeRenderer::new();

        let err = h
            .run(
                OverwritePolicy::Redo,
                &source,
                &FakeFetcher::failing(),
                &renderer,
                &ScriptedPrompter::new(&[]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocfoldError::FetchFailed { .. }));
        assert!(!h.work.join("next-js--v14.0.0--2023-10-26.md").exists());
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn fail_policy_reports_existing_artifact() {
        let h = Harness::new();
        let source = FixedSource::new("v14.0.0", "2023-10-26");
        let fetcher = FakeFetcher::new(DOCS);
        let renderer = FakeRenderer::new();
        let prompter = ScriptedPrompter::new(&[]);
        h.run(OverwritePolicy::Fail, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap();

        let err = h
            .run(OverwritePolicy::Fail, &source, &fetcher, &renderer, &prompter)
            .await
            .unwrap_err();

        assert!(matches!(err, DocfoldError::ArtifactExists(p) if p.ends_with("next-js--v14.0.0--2023-10-26")));
    }
}
