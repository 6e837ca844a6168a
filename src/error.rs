//! Crate error types.
//!
//! Every failure carries enough context (which file, which slide, which stage)
//! for a caller to present something meaningful.

use std::path::PathBuf;

use thiserror::Error;

use crate::imaging::CodecError;

/// Crate result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Slide archive errors, one variant per distinguishable failure kind
#[derive(Debug, Error)]
pub enum Error {
    /// IO error with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// The underlying IO error.
        source: std::io::Error,
        /// File path where the error occurred, if known.
        path: Option<PathBuf>,
    },

    /// A source image could not be found
    #[error("Could not find image file: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source path has no usable file name to derive an entry name from
    #[error("Could not extract archive entry name from {}", .0.display())]
    InvalidSourceName(PathBuf),

    /// Index outside the valid range for the operation
    #[error("Index {index} is out of range (slide count {len})")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Number of slides at the time of the call.
        len: usize,
    },

    /// No free entry name could be found for a source file
    #[error("Could not generate a unique archive entry name for '{base_name}'")]
    NameCollision {
        /// Base file name that kept colliding.
        base_name: String,
    },

    /// Build destination exists and overwriting was not requested
    #[error("File already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Zip container error
    #[error("Zip error in {}: {source}", .path.display())]
    Zip {
        /// The underlying zip error.
        source: zip::result::ZipError,
        /// Container path.
        path: PathBuf,
    },

    /// The container has no manifest entry
    #[error("Could not find {} entry in {}", crate::constants::CONFIG_ENTRY_NAME, .0.display())]
    MissingManifest(PathBuf),

    /// The manifest entry could not be read or written as JSON
    #[error("Could not read {} entry in {}: {source}", crate::constants::CONFIG_ENTRY_NAME, .path.display())]
    Manifest {
        /// The underlying JSON error.
        source: serde_json::Error,
        /// Container path.
        path: PathBuf,
    },

    /// A slide image was requested but the slide has no entry name
    #[error("Slide {index} has no archive entry name")]
    MissingEntryName {
        /// Position of the slide in the manifest.
        index: usize,
    },

    /// The manifest names an entry that the container does not hold
    #[error("Could not read {name} entry")]
    MissingEntry {
        /// Entry name that was looked up.
        name: String,
    },

    /// An entry name that cannot be used as a plain file name
    #[error("Archive entry name '{name}' is not a plain file name")]
    InvalidEntryName {
        /// The rejected entry name.
        name: String,
    },

    /// Image decode, resize or encode failure for one slide
    #[error("Image error in {name}: {source}")]
    Image {
        /// Entry name (or source path) of the slide being processed.
        name: String,
        /// The underlying codec error.
        source: CodecError,
    },

    /// The bounded decode worker pool could not be created
    #[error("Could not start image workers: {0}")]
    WorkerPool(String),

    /// Configuration error with guidance
    #[error("Configuration error: {message}. {hint}")]
    Config {
        /// Description of the configuration problem.
        message: String,
        /// Actionable guidance for fixing the issue.
        hint: &'static str,
    },
}

impl Error {
    /// Create an IO error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io { source, path: path.into() }
    }

    /// Create a zip error for the given container
    pub fn zip(source: zip::result::ZipError, path: impl Into<PathBuf>) -> Self {
        Self::Zip { source, path: path.into() }
    }

    /// Create an image error for the named slide
    pub fn image(name: impl Into<String>, source: CodecError) -> Self {
        Self::Image { name: name.into(), source }
    }

    /// Create a config error with actionable hint
    pub fn config(message: impl Into<String>, hint: &'static str) -> Self {
        Self::Config { message: message.into(), hint }
    }

    /// True for caller mistakes that are rejected before any I/O side effect
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::InvalidSourceName(_)
                | Self::IndexOutOfRange { .. }
                | Self::DestinationExists(_)
        )
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io { source: e, path: None }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn out_of_range_message_names_index_and_count() {
        let err = Error::IndexOutOfRange { index: 3, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains("Index 3"));
        assert!(msg.contains("slide count 3"));
        assert!(err.is_input_error());
    }

    #[test]
    fn missing_manifest_names_config_entry() {
        let err = Error::MissingManifest(PathBuf::from("show.omslide"));
        assert!(err.to_string().contains("config.json"));
        assert!(!err.is_input_error());
    }
}
