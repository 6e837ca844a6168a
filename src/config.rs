//! Archive build configuration.
//!
//! Library callers usually start from [`Config::default`]. [`Config::load`]
//! additionally reads a `.env` file and `OMSLIDE_*` environment variables.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::thread;

use dotenv::dotenv;

use crate::constants::{batch, image};
use crate::error::{Error, Result};

/// Configuration for building slide archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Slides wider than this are downsized to fit
    pub max_slide_width: u32,
    /// Slides taller than this are downsized to fit
    pub max_slide_height: u32,
    /// Slides decoded per batch; bounds peak memory during a build
    pub batch_size: usize,
    /// Worker threads used to decode one batch
    pub max_workers: usize,
    /// JPEG quality (1-100) for slide entries
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_slide_width: image::DEFAULT_MAX_WIDTH,
            max_slide_height: image::DEFAULT_MAX_HEIGHT,
            batch_size: default_batch_size(),
            max_workers: available_parallelism(),
            jpeg_quality: image::DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Create a configuration with the given maximum slide dimensions
    #[must_use]
    pub fn with_max_slide_size(max_slide_width: u32, max_slide_height: u32) -> Self {
        Self {
            max_slide_width,
            max_slide_height,
            ..Self::default()
        }
    }

    /// Load configuration from a `.env` file and environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();

        let mut config = Self::default();

        if let Some(width) = env_value("OMSLIDE_MAX_SLIDE_WIDTH")? {
            config.max_slide_width = width;
        }

        if let Some(height) = env_value("OMSLIDE_MAX_SLIDE_HEIGHT")? {
            config.max_slide_height = height;
        }

        if let Some(size) = env_value("OMSLIDE_BATCH_SIZE")? {
            config.batch_size = size;
        }

        if let Some(workers) = env_value("OMSLIDE_MAX_WORKERS")? {
            config.max_workers = workers;
        }

        if let Some(quality) = env_value("OMSLIDE_JPEG_QUALITY")? {
            config.jpeg_quality = quality;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a build impossible
    pub fn validate(&self) -> Result<()> {
        if self.max_slide_width == 0 || self.max_slide_height == 0 {
            return Err(Error::config(
                format!("slide bounds {}x{} are empty", self.max_slide_width, self.max_slide_height),
                "Set OMSLIDE_MAX_SLIDE_WIDTH and OMSLIDE_MAX_SLIDE_HEIGHT to positive values",
            ));
        }

        if self.batch_size == 0 {
            return Err(Error::config("batch size is zero", "Set OMSLIDE_BATCH_SIZE to at least 1"));
        }

        if self.max_workers == 0 {
            return Err(Error::config("worker count is zero", "Set OMSLIDE_MAX_WORKERS to at least 1"));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::config(
                format!("JPEG quality {} is out of range", self.jpeg_quality),
                "Set OMSLIDE_JPEG_QUALITY between 1 and 100",
            ));
        }

        Ok(())
    }
}

fn env_value<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::config(format!("{name}={raw} is not a valid number"), "Use a plain positive integer")
        }),
        Err(_) => Ok(None),
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(batch::FALLBACK_PARALLELISM, NonZeroUsize::get)
}

/// Batch size scaled to the host: more cores and a 64-bit address space allow
/// more decoded images in memory at once.
pub fn default_batch_size() -> usize {
    let per_core = if cfg!(target_pointer_width = "64") {
        batch::PER_CORE_64BIT
    } else {
        batch::PER_CORE_32BIT
    };
    available_parallelism() * per_core
}
