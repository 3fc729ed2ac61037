//! mediatag Error Definitions
//!
//! Defines error types used throughout the core library.

use gst::glib;
use thiserror::Error;

/// Core library error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Framework Errors
    // =========================================================================
    #[error("Failed to initialize GStreamer: {0}")]
    Init(glib::Error),

    #[error("Invalid pipeline description: {0}")]
    PipelineParse(glib::Error),

    #[error("Description produced element '{0}', not a pipeline")]
    NotAPipeline(String),

    #[error("No element in the pipeline implements the tag setter interface")]
    NoTagSetter,

    #[error("Pipeline has no message bus")]
    MissingBus,

    #[error("State change failed: {0}")]
    StateChange(#[from] gst::StateChangeError),

    // =========================================================================
    // Bus Errors
    // =========================================================================
    #[error("Error from {source_path}: {message}")]
    Pipeline {
        source_path: String,
        message: String,
        debug: Option<String>,
    },

    // =========================================================================
    // Tag Errors
    // =========================================================================
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Invalid value '{value}' for tag '{tag}'")]
    InvalidTagValue { tag: String, value: String },

    #[error("Tag '{tag}' rejected: {reason}")]
    TagRejected { tag: String, reason: String },

    // =========================================================================
    // Settings Errors
    // =========================================================================
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Debug detail attached to a bus error, if any.
    pub fn debug_info(&self) -> Option<&str> {
        match self {
            CoreError::Pipeline { debug, .. } => debug.as_deref(),
            _ => None,
        }
    }
}
