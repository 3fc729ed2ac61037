//! The `gobin` element
//!
//! A bin with no pads and no custom logic. Children are managed through the
//! regular `GstBin` API or the inherited `GstChildProxy` interface.
//!
//! ## Example launch line
//! ```bash
//! gst-launch-1.0 gobin.( name=outer fakesrc num-buffers=10 ! fakesink )
//! ```

use gst::glib;
use gst::prelude::*;

mod imp;

/// Element name used for registration and factory lookups.
pub const ELEMENT_NAME: &str = "gobin";

glib::wrapper! {
    pub struct GoBin(ObjectSubclass<imp::GoBin>)
        @extends gst::Bin, gst::Element, gst::Object,
        @implements gst::ChildProxy;
}

impl GoBin {
    /// Create an unnamed `gobin`. GStreamer assigns a unique name.
    pub fn new() -> Self {
        glib::Object::new()
    }

    /// Create a `gobin` with an explicit object name.
    pub fn with_name(name: &str) -> Self {
        glib::Object::builder().property("name", name).build()
    }
}

impl Default for GoBin {
    fn default() -> Self {
        Self::new()
    }
}

pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        ELEMENT_NAME,
        gst::Rank::NONE,
        GoBin::static_type(),
    )
}
