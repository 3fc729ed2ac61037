use std::sync::LazyLock;

use gst::glib;
use gst::prelude::*;
use gst::subclass::prelude::*;

static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "gobin",
        gst::DebugColorFlags::empty(),
        Some("Go Bin element"),
    )
});

#[derive(Default)]
pub struct GoBin;

#[glib::object_subclass]
impl ObjectSubclass for GoBin {
    const NAME: &'static str = "GstGoBin";
    type Type = super::GoBin;
    type ParentType = gst::Bin;
}

impl ObjectImpl for GoBin {
    fn constructed(&self) {
        self.parent_constructed();
        gst::debug!(CAT, imp = self, "Constructed");
    }
}

impl GstObjectImpl for GoBin {}

impl ElementImpl for GoBin {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: LazyLock<gst::subclass::ElementMetadata> =
            LazyLock::new(|| {
                gst::subclass::ElementMetadata::new(
                    "Go Bin",
                    "Generic/Bin",
                    "A bin element that adds no behavior of its own",
                    "mediatag contributors",
                )
            });

        Some(&*ELEMENT_METADATA)
    }
}

impl BinImpl for GoBin {
    fn add_element(&self, element: &gst::Element) -> Result<(), gst::LoggableError> {
        gst::debug!(CAT, imp = self, "Adding child {}", element.name());
        self.parent_add_element(element)
    }
}
