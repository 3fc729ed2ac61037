//! mediatag Core Library
//!
//! Applies metadata to media produced by a GStreamer pipeline. A pipeline is
//! built from a gst-launch style description, the element implementing the
//! tag setter interface is looked up, tags are handed to it, and the bus is
//! drained until end-of-stream or the first error.
//!
//! The media work itself (encoding, scheduling, tag merging) happens inside
//! GStreamer; this crate only drives it.

pub mod bus;
pub mod pipeline;
pub mod settings;
pub mod tags;

mod error;
pub use error::*;

pub use bus::{drain_bus, handle_message, DrainEnd, DrainSummary, Flow, MessageSource};
pub use pipeline::{init, run_tagsetter, StopHandle, TaggedPipeline};
pub use settings::{SettingsManager, TagsetterSettings};
pub use tags::{apply_tags, parse_tag_assignment, parse_tag_value, MergeMode, TagEntry, TagValue};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    pub fn init_gst() {
        static INIT: Once = Once::new();
        INIT.call_once(|| gst::init().unwrap());
    }
}
