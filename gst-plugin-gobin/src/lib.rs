//! gobin GStreamer plugin
//!
//! Registers a single element, `gobin`, a plain bin subclass that adds no
//! behavior of its own on top of `GstBin`. It exists to exercise the plugin
//! registration path from Rust.
//!
//! ## Command Line Usage
//!
//! ```bash
//! export GST_PLUGIN_PATH=/path/to/target/release
//! gst-inspect-1.0 gobin
//! ```
//!
//! Applications linking the crate directly can skip the plugin path and call
//! [`plugin_register_static`] after `gst::init()`.

use gst::glib;

pub mod gobin;

pub use gobin::GoBin;

fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gobin::register(plugin)?;
    Ok(())
}

gst::plugin_define!(
    gobin,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    env!("CARGO_PKG_VERSION"),
    "LGPL",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    "2021-01-18"
);
