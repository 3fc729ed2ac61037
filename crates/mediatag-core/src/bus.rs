//! Message Bus Dispatch
//!
//! Pops messages from a pipeline bus and decides, per message, whether the
//! run continues. End-of-stream stops cleanly, an error message stops with
//! the error, everything else is logged and skipped.

use std::collections::VecDeque;

use gst::prelude::*;
use gst::MessageView;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult};

/// Outcome of handling a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Why a drain loop ended without error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainEnd {
    EndOfStream,
    #[default]
    BusClosed,
}

/// Counters collected while draining a bus
#[derive(Debug, Clone, Default)]
pub struct DrainSummary {
    /// Messages popped, including the one that stopped the loop
    pub messages: u64,
    /// Tag messages seen
    pub tag_messages: u64,
    /// Tags carried by the most recent tag message
    pub last_tags: Option<gst::TagList>,
    pub end: DrainEnd,
}

impl DrainSummary {
    /// Title from the most recent tag message, if it carried one.
    pub fn title(&self) -> Option<String> {
        self.last_tags
            .as_ref()?
            .get::<gst::tags::Title>()
            .map(|title| title.get().to_string())
    }
}

/// Something messages can be popped from.
///
/// `None` means the source is closed and no further messages will arrive.
pub trait MessageSource {
    fn next_message(&mut self) -> Option<gst::Message>;
}

impl MessageSource for gst::Bus {
    /// Blocks until a message arrives or the bus is flushing.
    fn next_message(&mut self) -> Option<gst::Message> {
        self.timed_pop(gst::ClockTime::NONE)
    }
}

impl MessageSource for VecDeque<gst::Message> {
    fn next_message(&mut self) -> Option<gst::Message> {
        self.pop_front()
    }
}

fn source_path(msg: &gst::Message) -> String {
    msg.src()
        .map(|src| src.path_string().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Decide what a single bus message means for the run.
pub fn handle_message(msg: &gst::Message) -> CoreResult<Flow> {
    match msg.view() {
        MessageView::Tag(tag) => {
            info!(source = %source_path(msg), tags = ?tag.tags(), "Received tags");
            Ok(Flow::Continue)
        }
        MessageView::Eos(..) => {
            debug!("End of stream");
            Ok(Flow::Stop)
        }
        MessageView::Error(err) => Err(CoreError::Pipeline {
            source_path: source_path(msg),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }),
        MessageView::Warning(warning) => {
            warn!(
                source = %source_path(msg),
                debug = ?warning.debug(),
                "{}",
                warning.error()
            );
            Ok(Flow::Continue)
        }
        MessageView::StateChanged(change) => {
            if msg.src().is_some_and(|src| src.is::<gst::Pipeline>()) {
                debug!(old = ?change.old(), current = ?change.current(), "Pipeline state changed");
            }
            Ok(Flow::Continue)
        }
        _ => Ok(Flow::Continue),
    }
}

/// Pop and handle messages until end-of-stream, an error, or source closure.
///
/// Errors are returned as soon as they are popped; later messages stay
/// in the source.
pub fn drain_bus(source: &mut impl MessageSource) -> CoreResult<DrainSummary> {
    let mut summary = DrainSummary::default();

    while let Some(msg) = source.next_message() {
        summary.messages += 1;
        if let MessageView::Tag(tag) = msg.view() {
            summary.tag_messages += 1;
            summary.last_tags = Some(tag.tags());
        }

        if handle_message(&msg)? == Flow::Stop {
            summary.end = DrainEnd::EndOfStream;
            return Ok(summary);
        }
    }

    debug!(messages = summary.messages, "Message source closed");
    summary.end = DrainEnd::BusClosed;
    Ok(summary)
}
