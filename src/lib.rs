//! `OmSlide` - self-contained slideshow archives.
//!
//! A slideshow is a zip container holding a `config.json` manifest and one
//! JPEG entry per slide. [`SlideFileBuilder`] assembles and writes archives;
//! [`SlideFile`] opens them for playback or export.

pub mod config;
pub mod constants;
pub mod error;
pub mod imaging;
pub mod slides;

pub use config::Config;
pub use error::{Error, Result};
pub use slides::{BuildProgress, Direction, FadeFlags, Slide, SlideFile, SlideFileBuilder, SlidesConfig};
