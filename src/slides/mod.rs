//! Slide archives: the manifest model, the builder that writes archives and
//! the reader that opens them.

pub mod batch;
pub mod builder;
pub mod manifest;
pub mod reader;
pub mod slide;

// Re-export commonly used types
pub use builder::{BuildProgress, SlideFileBuilder};
pub use manifest::SlidesConfig;
pub use reader::SlideFile;
pub use slide::{Direction, FadeFlags, Slide};
