//! Build command - run the pipeline for the current documentation version

use crate::cache::{FileCacheStore, RunLock};
use crate::cli::args::BuildArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{DocfoldError, DocfoldResult};
use crate::history::RunHistory;
use crate::pipeline::{
    Collaborators, GitSparseFetcher, PandocRenderer, PipelineOrchestrator, PipelineReport,
    PipelineSettings, StageOutcome,
};
use crate::ui::{self, ConsolePrompter, Status, UiContext};
use crate::version::{GithubSource, ResolveMode, ValueOrigin};
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> DocfoldResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let settings = settings_for(&args, config);

    let lock = RunLock::acquire(&ConfigManager::lock_path(config)).await?;
    debug!("Holding run lock {}", lock.path().display());

    let cache = FileCacheStore::new(ConfigManager::cache_path(config));
    let source = GithubSource::from_config(&config.source);
    let fetcher = GitSparseFetcher::from_config(&config.source, &config.pipeline);
    let renderer = PandocRenderer::from_config(&config.render);
    let prompter = ConsolePrompter::new(ctx.clone());
    let history = RunHistory::new(config);

    ui::intro(&ctx, &format!("docfold build ({})", config.source.name));

    let orchestrator = PipelineOrchestrator::new(
        settings,
        Collaborators {
            cache: &cache,
            source: &source,
            fetcher: &fetcher,
            renderer: &renderer,
            prompter: &prompter,
        },
    );

    // Dropping the run future kills child processes and removes staging dirs
    let result = tokio::select! {
        result = resolve_and_build(&orchestrator, &history, &ctx) => result,
        _ = tokio::signal::ctrl_c() => Err(DocfoldError::Interrupted),
    };

    match result {
        Ok(report) => {
            history.build_completed(&report).await;
            print_report(&ctx, &report);
            Ok(())
        }
        Err(e) => {
            history.build_failed(&e).await;
            Err(e)
        }
    }
}

/// Run the pipeline, reporting a stale fallback before any stage can fail
pub async fn resolve_and_build(
    orchestrator: &PipelineOrchestrator<'_>,
    history: &RunHistory,
    ctx: &UiContext,
) -> DocfoldResult<PipelineReport> {
    let resolution = orchestrator.resolve().await?;
    if resolution.used_stale_fallback() {
        history.stale_fallback(&resolution).await;
        ui::step(
            ctx,
            Status::Warn,
            "Remote source unavailable; building from stale cached metadata",
        );
    }
    orchestrator.build(resolution).await
}

/// Pipeline settings from config with command-line overrides applied
pub fn settings_for(args: &BuildArgs, config: &Config) -> PipelineSettings {
    let mut settings = PipelineSettings::from_config(config);
    if let Some(policy) = args.overwrite {
        settings.overwrite = policy;
    }
    if let Some(ref dir) = args.work_dir {
        settings.work_dir = dir.clone();
    }
    settings.mode = if args.refresh {
        ResolveMode::Refresh
    } else if args.offline {
        ResolveMode::Offline
    } else {
        ResolveMode::Normal
    };
    settings
}

fn print_report(ctx: &UiContext, report: &PipelineReport) {
    let version = &report.resolution.version;
    ui::step(
        ctx,
        Status::Info,
        &format!(
            "{} (tag {}, {}; updated {}, {})",
            report.identifier,
            version.tag,
            origin_label(report.resolution.tag_origin),
            version.last_update,
            origin_label(report.resolution.date_origin),
        ),
    );

    for (stage, outcome, path) in [
        ("fetch", report.fetch, &report.paths.docs_dir),
        ("merge", report.merge, &report.paths.merged),
        ("render", report.render, &report.paths.rendered),
    ] {
        let (status, verb) = match outcome {
            StageOutcome::Ran => (Status::Ok, "done"),
            StageOutcome::Skipped => (Status::Skip, "kept existing"),
        };
        ui::step(
            ctx,
            status,
            &format!("{}: {} {}", stage, verb, path.display()),
        );
    }

    ui::outro(ctx, &report.output().display().to_string(), true);
}

fn origin_label(origin: ValueOrigin) -> &'static str {
    match origin {
        ValueOrigin::Remote => "remote",
        ValueOrigin::Cached => "cached",
        ValueOrigin::StaleFallback => "stale cache",
    }
}
