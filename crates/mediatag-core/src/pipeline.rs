//! Tagged Pipeline Lifecycle
//!
//! Builds a pipeline from a textual description, finds the element that
//! implements `GstTagSetter`, applies configured tags and runs the pipeline
//! until its bus reports end-of-stream or an error.
//!
//! The pipeline is always set back to `Null` when a [`TaggedPipeline`] is
//! dropped, whichever way the run ended.

use gst::glib;
use gst::prelude::*;
use tracing::{debug, info, warn};

use crate::bus::{drain_bus, handle_message, DrainSummary};
use crate::settings::TagsetterSettings;
use crate::tags::apply_tags;
use crate::{CoreError, CoreResult};

/// Initialize GStreamer. Safe to call more than once.
pub fn init() -> CoreResult<()> {
    gst::init().map_err(CoreError::Init)
}

/// A pipeline whose tags are set before it starts playing
#[derive(Debug)]
pub struct TaggedPipeline {
    pipeline: gst::Pipeline,
}

impl TaggedPipeline {
    /// Parse `description` (gst-launch syntax) into a pipeline.
    pub fn from_description(description: &str) -> CoreResult<Self> {
        let element = gst::parse::launch(description).map_err(CoreError::PipelineParse)?;
        let pipeline = element
            .downcast::<gst::Pipeline>()
            .map_err(|element| CoreError::NotAPipeline(element.name().to_string()))?;

        debug!(pipeline = %pipeline.name(), "Pipeline created");
        Ok(Self { pipeline })
    }

    /// Element implementing `GstTagSetter`, if the pipeline contains one.
    pub fn tag_setter(&self) -> CoreResult<gst::TagSetter> {
        let element = self
            .pipeline
            .by_interface(gst::TagSetter::static_type())
            .ok_or(CoreError::NoTagSetter)?;

        debug!(element = %element.name(), "Found tag setter");
        element
            .dynamic_cast::<gst::TagSetter>()
            .map_err(|_| CoreError::NoTagSetter)
    }

    /// Apply the merge mode and tags from `settings` to the tag setter.
    pub fn apply(&self, settings: &TagsetterSettings) -> CoreResult<usize> {
        let setter = self.tag_setter()?;
        let applied = apply_tags(&setter, settings.merge_mode, &settings.tags)?;
        info!(tags = applied, merge_mode = %settings.merge_mode, "Tags applied");
        Ok(applied)
    }

    /// Handle that can ask the running pipeline to finish.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            pipeline: self.pipeline.downgrade(),
        }
    }

    /// Set the pipeline playing and drain its bus.
    ///
    /// Blocks until end-of-stream, an error message, or bus closure.
    pub fn run(self) -> CoreResult<DrainSummary> {
        let mut bus = self.pipeline.bus().ok_or(CoreError::MissingBus)?;

        if let Err(err) = self.pipeline.set_state(gst::State::Playing) {
            // Elements post the reason for a failed transition on the bus.
            if let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
                handle_message(&msg)?;
            }
            return Err(err.into());
        }
        info!(pipeline = %self.pipeline.name(), "Pipeline playing");

        let summary = drain_bus(&mut bus)?;
        info!(
            messages = summary.messages,
            tag_messages = summary.tag_messages,
            end = ?summary.end,
            "Pipeline finished"
        );
        Ok(summary)
    }
}

impl Drop for TaggedPipeline {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            warn!(pipeline = %self.pipeline.name(), "Failed to shut down pipeline: {}", err);
        }
    }
}

/// Requests end-of-stream on a pipeline without keeping it alive.
#[derive(Clone)]
pub struct StopHandle {
    pipeline: glib::WeakRef<gst::Pipeline>,
}

impl StopHandle {
    /// Send an EOS event into the pipeline.
    ///
    /// The pipeline posts end-of-stream on its bus once the event has passed
    /// through every sink. Returns `false` if the pipeline is gone or the
    /// event was not handled.
    pub fn request_stop(&self) -> bool {
        match self.pipeline.upgrade() {
            Some(pipeline) => {
                info!(pipeline = %pipeline.name(), "Stop requested, sending EOS");
                pipeline.send_event(gst::event::Eos::new())
            }
            None => false,
        }
    }
}

/// Build the configured pipeline, tag it and run it to completion.
pub fn run_tagsetter(settings: &TagsetterSettings) -> CoreResult<DrainSummary> {
    init()?;
    let pipeline = TaggedPipeline::from_description(&settings.pipeline)?;
    pipeline.apply(settings)?;
    pipeline.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DrainEnd;
    use crate::tags::{MergeMode, TagEntry};
    use crate::test_support::init_gst;

    fn has_factory(name: &str) -> bool {
        gst::ElementFactory::find(name).is_some()
    }

    #[test]
    fn test_invalid_description_is_a_parse_error() {
        init_gst();
        let err = TaggedPipeline::from_description("nosuchelement ! fakesink").unwrap_err();
        assert!(matches!(err, CoreError::PipelineParse(_)));
    }

    #[test]
    fn test_single_element_is_not_a_pipeline() {
        init_gst();
        let err = TaggedPipeline::from_description("fakesrc name=lonely").unwrap_err();
        match err {
            CoreError::NotAPipeline(name) => assert_eq!(name, "lonely"),
            other => panic!("expected NotAPipeline, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_without_tag_setter() {
        init_gst();
        let pipeline = TaggedPipeline::from_description("fakesrc ! fakesink").unwrap();
        assert!(matches!(pipeline.tag_setter(), Err(CoreError::NoTagSetter)));
        assert!(matches!(
            pipeline.apply(&TagsetterSettings::default()),
            Err(CoreError::NoTagSetter)
        ));
    }

    #[test]
    fn test_run_reaches_end_of_stream() {
        init_gst();
        let pipeline =
            TaggedPipeline::from_description("fakesrc num-buffers=5 ! fakesink").unwrap();

        let summary = pipeline.run().unwrap();
        assert_eq!(summary.end, DrainEnd::EndOfStream);
        assert!(summary.messages >= 1);
    }

    #[test]
    fn test_run_surfaces_bus_errors() {
        init_gst();
        let pipeline = TaggedPipeline::from_description(
            "fakesrc num-buffers=1 ! filesink location=/nonexistent-dir/mediatag/out.bin",
        )
        .unwrap();
        match pipeline.run() {
            Err(CoreError::Pipeline {
                source_path,
                message,
                ..
            }) => {
                assert!(message.contains("Could not open"), "{}", message);
                assert!(source_path.contains("filesink"), "{}", source_path);
            }
            other => panic!("expected error from the bus, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_handle_ends_infinite_source() {
        init_gst();
        let pipeline =
            TaggedPipeline::from_description("fakesrc is-live=true ! fakesink").unwrap();
        let stop = pipeline.stop_handle();

        let worker = std::thread::spawn(move || pipeline.run());
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(stop.request_stop());

        let summary = worker.join().unwrap().unwrap();
        assert_eq!(summary.end, DrainEnd::EndOfStream);
    }

    #[test]
    fn test_tagged_flac_run() {
        init_gst();
        if !has_factory("flacenc") || !has_factory("audiotestsrc") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("test.flac");

        let mut settings = TagsetterSettings::default().with_output_location(&output);
        settings.pipeline = settings
            .pipeline
            .replace("num-buffers=10000", "num-buffers=20");
        settings.tags = vec![TagEntry::text("title", "Special randomized white-noise")];
        settings.merge_mode = MergeMode::KeepAll;

        let summary = run_tagsetter(&settings).unwrap();
        assert_eq!(summary.end, DrainEnd::EndOfStream);
        assert!(output.exists());
    }
}
