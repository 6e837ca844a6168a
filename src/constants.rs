//! Archive constants.
//!
//! Centralizes magic numbers and format names shared by the builder and reader.

/// Name of the manifest entry inside every container.
pub const CONFIG_ENTRY_NAME: &str = "config.json";

/// File extension of slide archives, including the leading dot.
pub const FILE_EXTENSION: &str = ".omslide";

/// Unique entry name generation.
pub mod naming {
    /// Exclusive upper bound of the numeric suffix probe (`" 002"` .. `" 099"`).
    pub const MAX_ATTEMPTS: u32 = 100;

    /// First numeric suffix tried when the base name is taken.
    pub const FIRST_SUFFIX: u32 = 2;
}

/// Playback timing.
pub mod dwell {
    /// Shortest global dwell time accepted when auto-play is on.
    pub const MIN_AUTOPLAY_MILLISECONDS: u32 = 1000;

    /// Dwell time substituted when the configured value is below the minimum.
    pub const DEFAULT_AUTOPLAY_MILLISECONDS: u32 = 10_000;
}

/// Image sizing and encoding defaults.
pub mod image {
    /// Default maximum slide width in pixels.
    pub const DEFAULT_MAX_WIDTH: u32 = 1920;

    /// Default maximum slide height in pixels.
    pub const DEFAULT_MAX_HEIGHT: u32 = 1080;

    /// Default JPEG quality for slide entries.
    pub const DEFAULT_JPEG_QUALITY: u8 = 75;

    /// Source file extensions picked up when building from a folder (lowercase, no dot).
    pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
}

/// Batch sizing.
pub mod batch {
    /// Slides per batch for each available core on 64-bit hosts.
    pub const PER_CORE_64BIT: usize = 4;

    /// Slides per batch for each available core on 32-bit hosts.
    pub const PER_CORE_32BIT: usize = 2;

    /// Parallelism assumed when the host cannot report it.
    pub const FALLBACK_PARALLELISM: usize = 4;
}
