//! Tag Values and Tag Setter Helpers
//!
//! Converts configured tag entries into GStreamer tag lists and hands them
//! to an element implementing `GstTagSetter`. How tags combine with metadata
//! already present in the stream is decided by the element, driven by the
//! merge modes set here.

use std::fmt;
use std::str::FromStr;

use gst::glib;
use gst::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CoreError, CoreResult};

/// How new tags combine with tags already known to the element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    ReplaceAll,
    Replace,
    #[default]
    Append,
    Prepend,
    Keep,
    KeepAll,
}

impl MergeMode {
    pub const ALL: [MergeMode; 6] = [
        MergeMode::ReplaceAll,
        MergeMode::Replace,
        MergeMode::Append,
        MergeMode::Prepend,
        MergeMode::Keep,
        MergeMode::KeepAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::ReplaceAll => "replace-all",
            MergeMode::Replace => "replace",
            MergeMode::Append => "append",
            MergeMode::Prepend => "prepend",
            MergeMode::Keep => "keep",
            MergeMode::KeepAll => "keep-all",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        MergeMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown merge mode '{}', expected one of: {}",
                    s,
                    MergeMode::ALL.map(|m| m.as_str()).join(", ")
                )
            })
    }
}

impl From<MergeMode> for gst::TagMergeMode {
    fn from(mode: MergeMode) -> Self {
        match mode {
            MergeMode::ReplaceAll => gst::TagMergeMode::ReplaceAll,
            MergeMode::Replace => gst::TagMergeMode::Replace,
            MergeMode::Append => gst::TagMergeMode::Append,
            MergeMode::Prepend => gst::TagMergeMode::Prepend,
            MergeMode::Keep => gst::TagMergeMode::Keep,
            MergeMode::KeepAll => gst::TagMergeMode::KeepAll,
        }
    }
}

/// A single tag value. The variant must match the tag's registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    UInt(u32),
    Double(f64),
    Text(String),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::UInt(v) => write!(f, "{}", v),
            TagValue::Double(v) => write!(f, "{}", v),
            TagValue::Text(v) => f.write_str(v),
        }
    }
}

/// A tag to apply, e.g. `title` = "Special randomized white-noise".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEntry {
    /// Registered tag name (`title`, `artist`, `track-number`, ...)
    pub name: String,

    /// Tag value
    pub value: TagValue,

    /// Merge mode used when adding this entry
    #[serde(default)]
    pub mode: MergeMode,
}

impl TagEntry {
    pub fn new(name: impl Into<String>, value: TagValue, mode: MergeMode) -> Self {
        Self {
            name: name.into(),
            value,
            mode,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, TagValue::Text(value.into()), MergeMode::Append)
    }
}

/// Parse a raw string into a value of the type registered for `name`.
///
/// Requires GStreamer to be initialized.
pub fn parse_tag_value(name: &str, raw: &str) -> CoreResult<TagValue> {
    if !gst::tags::tag_exists(name) {
        return Err(CoreError::UnknownTag(name.to_string()));
    }

    let invalid = || CoreError::InvalidTagValue {
        tag: name.to_string(),
        value: raw.to_string(),
    };

    let ty = gst::tags::tag_get_type(name);
    if ty == glib::Type::STRING {
        Ok(TagValue::Text(raw.to_string()))
    } else if ty == glib::Type::U32 {
        raw.trim()
            .parse::<u32>()
            .map(TagValue::UInt)
            .map_err(|_| invalid())
    } else if ty == glib::Type::F64 {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TagValue::Double)
            .ok_or_else(invalid)
    } else if ty == glib::Type::BOOL {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(TagValue::Bool(true)),
            "false" | "no" | "0" => Ok(TagValue::Bool(false)),
            _ => Err(invalid()),
        }
    } else {
        Err(CoreError::TagRejected {
            tag: name.to_string(),
            reason: format!("values of type {} cannot be given as text", ty),
        })
    }
}

/// Parse a `name=value` assignment. The value is split at the first `=`.
pub fn parse_tag_assignment(assignment: &str, mode: MergeMode) -> CoreResult<TagEntry> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| CoreError::InvalidTagValue {
            tag: assignment.to_string(),
            value: String::new(),
        })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidTagValue {
            tag: String::new(),
            value: raw.to_string(),
        });
    }

    let value = parse_tag_value(name, raw)?;
    Ok(TagEntry::new(name, value, mode))
}

/// Convert `value` to the type registered for `name` where that is lossless.
///
/// Integers become doubles for double tags; text is parsed for non-text tags.
fn coerce_to_registered_type(name: &str, value: &TagValue) -> CoreResult<TagValue> {
    let ty = gst::tags::tag_get_type(name);
    match value {
        TagValue::UInt(v) if ty == glib::Type::F64 => Ok(TagValue::Double(f64::from(*v))),
        TagValue::Text(raw) if ty != glib::Type::STRING => parse_tag_value(name, raw),
        other => Ok(other.clone()),
    }
}

/// Build a tag list holding just `entry`.
pub fn tag_list_for(entry: &TagEntry) -> CoreResult<gst::TagList> {
    if !gst::tags::tag_exists(&entry.name) {
        return Err(CoreError::UnknownTag(entry.name.clone()));
    }

    let value = coerce_to_registered_type(&entry.name, &entry.value)?;
    let mut list = gst::TagList::new();
    let mode = entry.mode.into();
    let list_mut = list.make_mut();
    let added = match &value {
        TagValue::Bool(v) => list_mut.add_generic(&entry.name, *v, mode),
        TagValue::UInt(v) => list_mut.add_generic(&entry.name, *v, mode),
        TagValue::Double(v) => list_mut.add_generic(&entry.name, *v, mode),
        TagValue::Text(v) => list_mut.add_generic(&entry.name, v.as_str(), mode),
    };

    added.map_err(|err| CoreError::TagRejected {
        tag: entry.name.clone(),
        reason: err.to_string(),
    })?;

    Ok(list)
}

/// Configure `setter` with `merge_mode` and add every entry in order.
///
/// Returns the number of entries applied. Nothing is applied if any entry
/// fails to convert.
pub fn apply_tags(
    setter: &impl IsA<gst::TagSetter>,
    merge_mode: MergeMode,
    entries: &[TagEntry],
) -> CoreResult<usize> {
    let lists = entries
        .iter()
        .map(|entry| tag_list_for(entry).map(|list| (entry, list)))
        .collect::<CoreResult<Vec<_>>>()?;

    setter.set_tag_merge_mode(merge_mode.into());

    for (entry, list) in &lists {
        debug!(tag = %entry.name, value = %entry.value, mode = %entry.mode, "Adding tag");
        setter.merge_tags(list, entry.mode.into());
    }

    Ok(lists.len())
}
