//! Settings Persistence
//!
//! Stores the tagging run configuration as JSON with:
//! - Defaults for every missing field
//! - Normalization instead of hard failures for bad values
//! - Atomic writes (temp file + rename) under an advisory lock
//!
//! Default location: {config_dir}/mediatag/settings.json

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::tags::{MergeMode, TagEntry};
use crate::{CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

/// Pipeline used when none is configured
pub const DEFAULT_PIPELINE: &str =
    "audiotestsrc wave=white-noise num-buffers=10000 ! flacenc ! filesink location=test.flac";

/// Title applied when no tags are configured
pub const DEFAULT_TITLE: &str = "Special randomized white-noise";

/// Configuration of a tagging run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagsetterSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Pipeline description in gst-launch syntax
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Merge mode set on the tag setter before tags are added
    #[serde(default = "default_merge_mode")]
    pub merge_mode: MergeMode,

    /// Tags added in order, each with its own merge mode
    #[serde(default = "default_tags")]
    pub tags: Vec<TagEntry>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_pipeline() -> String {
    DEFAULT_PIPELINE.to_string()
}

fn default_merge_mode() -> MergeMode {
    MergeMode::KeepAll
}

fn default_tags() -> Vec<TagEntry> {
    vec![TagEntry::text("title", DEFAULT_TITLE)]
}

impl Default for TagsetterSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            pipeline: default_pipeline(),
            merge_mode: default_merge_mode(),
            tags: default_tags(),
        }
    }
}

impl TagsetterSettings {
    /// Corrects settings in place so they are always usable.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        let trimmed = self.pipeline.trim();
        self.pipeline = if trimmed.is_empty() {
            default_pipeline()
        } else {
            trimmed.to_string()
        };

        for entry in &mut self.tags {
            entry.name = entry.name.trim().to_string();
        }
        self.tags.retain(|entry| !entry.name.is_empty());
    }

    /// Point the pipeline's `filesink` at `path`.
    ///
    /// Replaces an existing `location=` property or adds one. Descriptions
    /// without a `filesink` are left unchanged.
    pub fn with_output_location(mut self, path: &Path) -> Self {
        let location = path.display().to_string();
        let mut found = false;

        let segments: Vec<String> = split_unquoted(&self.pipeline, |c| c == '!')
            .into_iter()
            .map(|segment| {
                let mut args = split_args(&segment);
                if found || args.first().map(String::as_str) != Some("filesink") {
                    return segment.trim().to_string();
                }
                found = true;
                args.retain(|arg| !arg.starts_with("location="));
                args.push(format!("location={}", quote_value(&location)));
                args.join(" ")
            })
            .collect();

        if found {
            self.pipeline = segments.join(" ! ");
        } else {
            warn!("Pipeline has no filesink, output location ignored");
        }
        self
    }
}

/// Split `text` at separators outside double quotes.
///
/// Quotes and escapes are kept in the output; `\` escapes the next character
/// inside quotes.
fn split_unquoted(text: &str, is_separator: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' if quoted => {
                escaped = true;
                current.push(c);
            }
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if !quoted && is_separator(c) => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Split a pipeline segment on whitespace, keeping double-quoted runs intact.
fn split_args(segment: &str) -> Vec<String> {
    split_unquoted(segment, char::is_whitespace)
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .collect()
}

fn quote_value(value: &str) -> String {
    if value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '!' | '"' | '\\'))
    {
        format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        value.to_string()
    }
}

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Manage the settings file at `settings_path`
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// Manage `settings.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SETTINGS_FILE))
    }

    /// Platform config directory for mediatag, if one exists
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mediatag"))
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        // Ensure parent directory exists so the lock file can be created.
        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file).map_err(|e| {
                CoreError::Settings(format!("Failed to lock settings file (exclusive): {}", e))
            })?;
        } else {
            fs2::FileExt::lock_shared(&lock_file).map_err(|e| {
                CoreError::Settings(format!("Failed to lock settings file (shared): {}", e))
            })?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file doesn't exist.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load(&self) -> CoreResult<TagsetterSettings> {
        self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!(path = ?self.settings_path, "Settings file not found, using defaults");
                return Ok(TagsetterSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)?;
            let mut settings = serde_json::from_str::<TagsetterSettings>(&content)?;

            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
            }

            settings.normalize();
            Ok(settings)
        })
    }

    /// Save settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &TagsetterSettings) -> CoreResult<TagsetterSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            let content = serde_json::to_string_pretty(&normalized)?;

            let temp_path = self.settings_path.with_extension("json.tmp");
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }

            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;

            if cfg!(windows) && self.settings_path.exists() {
                // rename does not overwrite on Windows
                fs::remove_file(&self.settings_path)?;
            }
            fs::rename(&temp_path, &self.settings_path)?;

            info!("Settings saved to {:?}", self.settings_path);
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<TagsetterSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(TagsetterSettings::default())
        })
    }
}
