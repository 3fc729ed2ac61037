//! `mediatag tag`

use std::future::Future;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mediatag_core::{
    parse_tag_assignment, DrainEnd, DrainSummary, MergeMode, SettingsManager, TaggedPipeline,
    TagsetterSettings,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Exit status used when a second interrupt aborts the run
const ABORT_EXIT_CODE: i32 = 130;

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pipeline description in gst-launch syntax
    #[arg(long)]
    pub pipeline: Option<String>,

    /// Output file for the pipeline's filesink
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Merge mode set on the tag setter
    #[arg(long, value_name = "MODE")]
    pub merge_mode: Option<MergeMode>,

    /// Tag to add, may be repeated. Replaces the configured tags.
    #[arg(long = "tag", value_name = "NAME=VALUE")]
    pub tags: Vec<String>,

    /// Merge mode used when adding each --tag
    #[arg(long, value_name = "MODE", default_value_t = MergeMode::Append)]
    pub tag_mode: MergeMode,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    pipeline: String,
    tags_applied: usize,
    messages: u64,
    tag_messages: u64,
    end: DrainEnd,
    title: Option<String>,
}

impl RunReport {
    fn new(settings: &TagsetterSettings, tags_applied: usize, summary: &DrainSummary) -> Self {
        Self {
            pipeline: settings.pipeline.clone(),
            tags_applied,
            messages: summary.messages,
            tag_messages: summary.tag_messages,
            end: summary.end,
            title: summary.title(),
        }
    }
}

/// Settings from file, with command line overrides applied.
///
/// Requires GStreamer to be initialized so tag values can be typed.
fn resolve_settings(args: &TagArgs) -> anyhow::Result<TagsetterSettings> {
    let manager = match &args.config {
        Some(path) => Some(SettingsManager::new(path.clone())),
        None => SettingsManager::default_dir().map(|dir| SettingsManager::in_dir(&dir)),
    };

    let mut settings = match manager {
        Some(manager) => manager.load().with_context(|| {
            format!(
                "Failed to load settings from {}",
                manager.settings_path().display()
            )
        })?,
        None => TagsetterSettings::default(),
    };

    if let Some(pipeline) = &args.pipeline {
        settings.pipeline = pipeline.clone();
    }
    if let Some(mode) = args.merge_mode {
        settings.merge_mode = mode;
    }
    if !args.tags.is_empty() {
        settings.tags = args
            .tags
            .iter()
            .map(|assignment| parse_tag_assignment(assignment, args.tag_mode))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid --tag")?;
    }

    settings.normalize();
    if let Some(output) = &args.output {
        settings = settings.with_output_location(output);
    }
    Ok(settings)
}

/// How waiting on the pipeline task ended
#[derive(Debug)]
enum Waited<T> {
    Finished(T),
    Aborted,
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Wait for `task`. The first interrupt calls `request_stop` and keeps
/// waiting, the second gives up on the task.
async fn wait_for_run<T, F, Fut>(
    mut task: JoinHandle<T>,
    mut interrupted: F,
    request_stop: impl FnOnce(),
) -> Result<Waited<T>, tokio::task::JoinError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::select! {
        joined = &mut task => return joined.map(Waited::Finished),
        _ = interrupted() => request_stop(),
    }

    tokio::select! {
        joined = &mut task => joined.map(Waited::Finished),
        _ = interrupted() => Ok(Waited::Aborted),
    }
}

pub async fn run(args: TagArgs) -> anyhow::Result<()> {
    mediatag_core::init().context("GStreamer initialization failed")?;
    let settings = resolve_settings(&args)?;

    info!(pipeline = %settings.pipeline, "Building pipeline");
    let pipeline = TaggedPipeline::from_description(&settings.pipeline)
        .context("Failed to build pipeline")?;
    let tags_applied = pipeline.apply(&settings).context("Failed to apply tags")?;

    let stop = pipeline.stop_handle();
    let task = tokio::task::spawn_blocking(move || pipeline.run());

    let waited = wait_for_run(task, ctrl_c, || {
        warn!("Interrupted, finishing stream (interrupt again to abort)");
        if !stop.request_stop() {
            warn!("Pipeline did not accept the stop request");
        }
    })
    .await
    .context("Pipeline task failed")?;

    let result = match waited {
        Waited::Finished(result) => result,
        Waited::Aborted => {
            error!("Interrupted again, aborting");
            // The blocking drain cannot be cancelled; leave without joining it.
            std::process::exit(ABORT_EXIT_CODE);
        }
    };
    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            if let Some(debug_info) = err.debug_info() {
                error!(debug = %debug_info, "Pipeline error details");
            }
            return Err(err).context("Pipeline run failed");
        }
    };

    let report = RunReport::new(&settings, tags_applied, &summary);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pipeline: {}", report.pipeline);
        println!("Tags applied: {}", report.tags_applied);
        println!(
            "Messages: {} ({} tag messages)",
            report.messages, report.tag_messages
        );
        if let Some(title) = &report.title {
            println!("Title: {}", title);
        }
        match report.end {
            DrainEnd::EndOfStream => println!("Finished: end of stream"),
            DrainEnd::BusClosed => println!("Finished: message bus closed"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatag_core::settings::DEFAULT_PIPELINE;
    use mediatag_core::{TagEntry, TagValue};
    use tempfile::TempDir;

    fn args_with_config(config: PathBuf) -> TagArgs {
        TagArgs {
            config: Some(config),
            pipeline: None,
            output: None,
            merge_mode: None,
            tags: Vec::new(),
            tag_mode: MergeMode::Append,
            json: false,
        }
    }

    #[test]
    fn test_resolve_settings_from_missing_config() {
        mediatag_core::init().unwrap();
        let dir = TempDir::new().unwrap();
        let args = args_with_config(dir.path().join("settings.json"));

        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings, TagsetterSettings::default());
    }

    #[test]
    fn test_resolve_settings_applies_overrides() {
        mediatag_core::init().unwrap();
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("settings.json");
        SettingsManager::new(config.clone())
            .save(&TagsetterSettings {
                merge_mode: MergeMode::Keep,
                ..Default::default()
            })
            .unwrap();

        let mut args = args_with_config(config);
        args.output = Some(PathBuf::from("/tmp/tagged.flac"));
        args.tags = vec!["title=Tagged".to_string(), "track-number=3".to_string()];
        args.tag_mode = MergeMode::Replace;

        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.merge_mode, MergeMode::Keep);
        assert!(settings.pipeline.ends_with("filesink location=/tmp/tagged.flac"));
        assert_eq!(
            settings.tags,
            vec![
                TagEntry::new("title", TagValue::Text("Tagged".into()), MergeMode::Replace),
                TagEntry::new("track-number", TagValue::UInt(3), MergeMode::Replace),
            ]
        );
    }

    #[test]
    fn test_resolve_settings_rejects_bad_tag() {
        mediatag_core::init().unwrap();
        let dir = TempDir::new().unwrap();
        let mut args = args_with_config(dir.path().join("settings.json"));
        args.tags = vec!["track-number=many".to_string()];

        assert!(resolve_settings(&args).is_err());
    }

    #[test]
    fn test_pipeline_override_keeps_configured_tags() {
        mediatag_core::init().unwrap();
        let dir = TempDir::new().unwrap();
        let mut args = args_with_config(dir.path().join("settings.json"));
        args.pipeline = Some("  fakesrc ! fakesink  ".to_string());
        args.merge_mode = Some(MergeMode::ReplaceAll);

        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.pipeline, "fakesrc ! fakesink");
        assert_ne!(settings.pipeline, DEFAULT_PIPELINE);
        assert_eq!(settings.merge_mode, MergeMode::ReplaceAll);
        assert_eq!(settings.tags, TagsetterSettings::default().tags);
    }

    #[tokio::test]
    async fn test_wait_for_run_finishes_without_interrupt() {
        let task = tokio::task::spawn_blocking(|| 7);
        let mut stop_requested = false;

        let waited = wait_for_run(task, std::future::pending::<()>, || stop_requested = true)
            .await
            .unwrap();

        assert!(matches!(waited, Waited::Finished(7)));
        assert!(!stop_requested);
    }

    #[tokio::test]
    async fn test_wait_for_run_first_interrupt_requests_stop() {
        let (release, hold) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::task::spawn_blocking(move || hold.blocking_recv().is_ok());

        let mut interrupts = 0;
        let interrupted = || {
            interrupts += 1;
            let first = interrupts == 1;
            async move {
                if !first {
                    std::future::pending::<()>().await;
                }
            }
        };

        let mut stop_requested = false;
        let waited = tokio::join!(
            wait_for_run(task, interrupted, || stop_requested = true),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                release.send(()).unwrap();
            }
        )
        .0
        .unwrap();

        assert!(stop_requested);
        assert!(matches!(waited, Waited::Finished(true)));
    }

    #[tokio::test]
    async fn test_wait_for_run_second_interrupt_aborts() {
        let (release, hold) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::task::spawn_blocking(move || hold.blocking_recv().is_ok());

        let mut stop_requests = 0;
        let waited = wait_for_run(task, || async {}, || stop_requests += 1)
            .await
            .unwrap();

        assert!(matches!(waited, Waited::Aborted));
        assert_eq!(stop_requests, 1);
        // Let the blocking task finish so the runtime can shut down.
        release.send(()).unwrap();
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let summary = DrainSummary {
            messages: 4,
            tag_messages: 1,
            last_tags: None,
            end: DrainEnd::EndOfStream,
        };
        let report = RunReport::new(&TagsetterSettings::default(), 1, &summary);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tagsApplied"], 1);
        assert_eq!(json["end"], "end-of-stream");
        assert!(json["title"].is_null());
    }
}
