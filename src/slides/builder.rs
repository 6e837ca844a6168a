//! Builds `.omslide` archives.
//!
//! Slides are collected into a [`SlidesConfig`], then [`SlideFileBuilder::build`]
//! writes the manifest followed by one JPEG entry per slide. Images are decoded
//! and encoded in parallel one batch at a time, so only a single batch of
//! decoded images is held in memory; entries are written sequentially in
//! manifest order.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::batch::BatchPlanner;
use super::manifest::{names_match, SlidesConfig};
use super::reader::SlideFile;
use super::slide::{FadeFlags, Slide};
use crate::config::Config;
use crate::constants::{image as image_constants, naming, CONFIG_ENTRY_NAME};
use crate::error::{Error, Result};
use crate::imaging::{Bounds, ImageCodec, StandardCodec};

/// Highest deflate level; slide entries favour size over build speed
const COMPRESSION_LEVEL: i32 = 9;

/// Progress of a running build, reported after the manifest and after each batch
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProgress {
    /// Last entry written in this step
    pub entry_name: Option<String>,
    /// Entries written so far, the manifest included
    pub entries_built: usize,
    /// Slide count plus one for the manifest
    pub total_entries: usize,
    /// `entries_built / total_entries * 100`
    pub percentage_complete: f64,
}

impl BuildProgress {
    #[allow(clippy::cast_precision_loss)] // entry counts are far below 2^52
    fn new(entry_name: Option<String>, entries_built: usize, total_entries: usize) -> Self {
        Self {
            entry_name,
            entries_built,
            total_entries,
            percentage_complete: entries_built as f64 / total_entries as f64 * 100.0,
        }
    }
}

/// Builder for slide archives
pub struct SlideFileBuilder {
    config: SlidesConfig,
    settings: Config,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for SlideFileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideFileBuilder")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for SlideFileBuilder {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SlideFileBuilder {
    /// Create an empty builder using the standard image codec
    pub fn new(settings: Config) -> Self {
        let codec = Arc::new(StandardCodec::new(settings.jpeg_quality));
        Self::with_codec(settings, codec)
    }

    /// Create an empty builder with a custom image codec
    pub fn with_codec(settings: Config, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            config: SlidesConfig::default(),
            settings,
            codec,
        }
    }

    /// Build settings in use
    pub const fn settings(&self) -> &Config {
        &self.settings
    }

    /// The manifest as currently assembled
    pub const fn manifest(&self) -> &SlidesConfig {
        &self.config
    }

    /// Whether the show advances automatically
    pub const fn auto_play(&self) -> bool {
        self.config.auto_play
    }

    /// Set whether the show advances automatically
    pub fn set_auto_play(&mut self, value: bool) {
        self.config.auto_play = value;
    }

    /// Whether the show closes after the last slide
    pub const fn auto_close(&self) -> bool {
        self.config.auto_close
    }

    /// Set whether the show closes after the last slide
    pub fn set_auto_close(&mut self, value: bool) {
        self.config.auto_close = value;
    }

    /// Whether the show restarts after the last slide
    pub const fn looping(&self) -> bool {
        self.config.looping
    }

    /// Set whether the show restarts after the last slide
    pub fn set_looping(&mut self, value: bool) {
        self.config.looping = value;
    }

    /// Default dwell time in milliseconds
    pub const fn dwell_time_milliseconds(&self) -> u32 {
        self.config.dwell_time_milliseconds
    }

    /// Set the default dwell time. Not validated until [`Self::build`].
    pub fn set_dwell_time_milliseconds(&mut self, value: u32) {
        self.config.dwell_time_milliseconds = value;
    }

    /// Slides in playback order
    pub fn slides(&self) -> &[Slide] {
        &self.config.slides
    }

    /// Number of slides
    pub fn slide_count(&self) -> usize {
        self.config.slide_count()
    }

    /// Find a slide by entry name
    pub fn slide(&self, name: &str) -> Option<&Slide> {
        self.config.find(name)
    }

    /// Signature of the current content, for dirty checks
    pub fn create_signature(&self) -> String {
        self.config.create_signature()
    }

    /// Append a slide for the image at `source`; returns its entry name
    pub fn add_slide(&mut self, source: impl AsRef<Path>, fades: FadeFlags, dwell_time_milliseconds: u32) -> Result<String> {
        let slide = self.create_slide(source.as_ref(), fades, dwell_time_milliseconds)?;
        let name = slide.archive_entry_name.clone();
        self.config.add_slide(slide);
        Ok(name)
    }

    /// Insert a slide for the image at `source` at `index`; returns its entry name
    pub fn insert_slide(
        &mut self,
        index: usize,
        source: impl AsRef<Path>,
        fades: FadeFlags,
        dwell_time_milliseconds: u32,
    ) -> Result<String> {
        if index > self.config.slide_count() {
            return Err(Error::IndexOutOfRange { index, len: self.config.slide_count() });
        }

        let slide = self.create_slide(source.as_ref(), fades, dwell_time_milliseconds)?;
        let name = slide.archive_entry_name.clone();
        self.config.insert_slide(index, slide)?;
        Ok(name)
    }

    /// Append one slide per file, in order. The first slide fades in and the
    /// last fades out when advancing. Every file is checked before any is added.
    pub fn add_slides<I, P>(&mut self, sources: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources: Vec<PathBuf> = sources.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        if let Some(missing) = sources.iter().find(|p| !p.is_file()) {
            return Err(Error::SourceNotFound(missing.clone()));
        }

        let last = sources.len().saturating_sub(1);
        let mut names = Vec::with_capacity(sources.len());
        for (n, source) in sources.iter().enumerate() {
            let fades = FadeFlags {
                fade_in_forward: n == 0,
                fade_out_forward: n == last,
                ..FadeFlags::NONE
            };
            names.push(self.add_slide(source, fades, 0)?);
        }
        Ok(names)
    }

    /// Add every supported image directly inside `folder`, sorted by file name
    pub fn add_slides_from_folder(&mut self, folder: impl AsRef<Path>) -> Result<Vec<String>> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            return Err(Error::SourceNotFound(folder.to_path_buf()));
        }

        let sources: Vec<PathBuf> = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();

        tracing::debug!("Found {} images in {}", sources.len(), folder.display());
        self.add_slides(sources)
    }

    /// Remove the slide named `name`, if present
    pub fn remove_slide(&mut self, name: &str) -> Option<Slide> {
        self.config.remove_slide(name)
    }

    /// Reorder slides to match `names`, dropping any not listed
    pub fn sync_slide_order<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.sync_slide_order(names);
    }

    /// Remove all slides and reset the show settings
    pub fn clear(&mut self) {
        self.config.clear();
    }

    /// Replace this builder's content with an existing archive, images included
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = SlideFile::open_with_codec(path.as_ref(), Arc::clone(&self.codec))?;
        let slides = file.slides(true)?;

        let mut config = file.into_manifest();
        config.slides = slides;
        self.config = config;

        tracing::info!("Loaded {} slides from {}", self.config.slide_count(), path.as_ref().display());
        Ok(())
    }

    /// Write the archive to `path`
    pub fn build(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        self.build_with_progress(path, overwrite, |_| {})
    }

    /// Write the archive to `path`, calling `on_progress` after the manifest and
    /// after every image batch.
    ///
    /// The archive is assembled in a temporary file next to `path` and moved
    /// into place only once every entry is written, so a failed build leaves
    /// no partial file and any existing archive untouched.
    pub fn build_with_progress<F>(&mut self, path: impl AsRef<Path>, overwrite: bool, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&BuildProgress),
    {
        let dest = path.as_ref();
        if dest.exists() && !overwrite {
            return Err(Error::DestinationExists(dest.to_path_buf()));
        }
        self.settings.validate()?;

        self.config.sanitize();

        let start = Instant::now();
        let total = self.config.slide_count() + 1;
        let bounds = Bounds::new(self.settings.max_slide_width, self.settings.max_slide_height);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.max_workers)
            .thread_name(|i| format!("omslide-decode-{i}"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = temp_file_builder()
            .tempfile_in(dir)
            .map_err(|e| Error::io(e, dir.to_path_buf()))?;

        {
            let mut zip = ZipWriter::new(BufWriter::new(temp.as_file_mut()));
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(COMPRESSION_LEVEL));

            zip.start_file(CONFIG_ENTRY_NAME, options).map_err(|e| Error::zip(e, dest))?;
            serde_json::to_writer_pretty(&mut zip, &self.config).map_err(|source| Error::Manifest {
                source,
                path: dest.to_path_buf(),
            })?;

            let mut built = 1;
            on_progress(&BuildProgress::new(Some(CONFIG_ENTRY_NAME.to_string()), built, total));

            let codec = self.codec.as_ref();
            let mut planner = BatchPlanner::new(&self.config.slides, self.settings.batch_size);
            while let Some(batch) = planner.next_batch() {
                // Fan out, then join before writing: the zip writer is not shared
                let encoded = pool.install(|| encode_batch(codec, bounds, batch))?;

                for (slide, bytes) in batch.iter().zip(encoded) {
                    write_entry(&mut zip, &slide.archive_entry_name, &bytes, options, dest)?;
                }

                built += batch.len();
                let last_name = batch.last().map(|s| s.archive_entry_name.clone());
                tracing::debug!("Wrote batch of {} slides ({built}/{total} entries)", batch.len());
                on_progress(&BuildProgress::new(last_name, built, total));
            }

            let mut writer = zip.finish().map_err(|e| Error::zip(e, dest))?;
            writer.flush().map_err(|e| Error::io(e, dest.to_path_buf()))?;
        }

        // An overwritten archive keeps its permissions
        if let Ok(existing) = fs_err::metadata(dest) {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(|e| Error::io(e, dest.to_path_buf()))?;
        }
        temp.persist(dest).map_err(|e| Error::io(e.error, dest.to_path_buf()))?;

        let elapsed = start.elapsed();
        tracing::info!(
            "Built {} with {} slides in {elapsed:?}",
            dest.display(),
            self.config.slide_count()
        );
        Ok(())
    }

    fn create_slide(&self, source: &Path, fades: FadeFlags, dwell_time_milliseconds: u32) -> Result<Slide> {
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }

        let name = self.unique_entry_name(source)?;
        tracing::debug!("Adding slide {name} from {}", source.display());

        Ok(Slide::new(
            name,
            source.to_string_lossy(),
            fades,
            dwell_time_milliseconds,
        ))
    }

    /// The source's base file name, or the first free `"<base> NNN"` variant
    /// when other slides already start with that base
    fn unique_entry_name(&self, source: &Path) -> Result<String> {
        let base = source
            .file_stem()
            .map(OsStr::to_string_lossy)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidSourceName(source.to_path_buf()))?;

        let mut similar: Vec<&str> = self.config.names_starting_with(&base).collect();
        // The manifest entry shares the zip namespace with slide entries
        if names_match(&base, CONFIG_ENTRY_NAME) {
            similar.push(CONFIG_ENTRY_NAME);
        }
        if similar.is_empty() {
            return Ok(base.into_owned());
        }

        (naming::FIRST_SUFFIX..naming::MAX_ATTEMPTS)
            .map(|n| format!("{base} {n:03}"))
            .find(|candidate| !similar.iter().any(|name| names_match(name, candidate)))
            .ok_or_else(|| Error::NameCollision { base_name: base.to_string() })
    }
}

/// Temp files default to owner-only access; archives get the mode a plain
/// `File::create` would give them after the umask
fn temp_file_builder() -> tempfile::Builder<'static, 'static> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".omslide-").suffix(".tmp");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    builder
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            image_constants::SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Decode (if needed) and JPEG-encode every slide in `batch` on the current
/// pool; results keep the batch order
fn encode_batch(codec: &dyn ImageCodec, bounds: Bounds, batch: &[Slide]) -> Result<Vec<Vec<u8>>> {
    batch.par_iter().map(|slide| encode_slide(codec, bounds, slide)).collect()
}

fn encode_slide(codec: &dyn ImageCodec, bounds: Bounds, slide: &Slide) -> Result<Vec<u8>> {
    let name = &slide.archive_entry_name;

    let encoded = if let Some(image) = &slide.image {
        codec.encode_jpeg(image)
    } else {
        let source = Path::new(&slide.original_file_path);
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        codec.load(source, bounds).and_then(|image| codec.encode_jpeg(&image))
    };

    encoded.map_err(|e| Error::image(name.clone(), e))
}

fn write_entry(
    zip: &mut ZipWriter<BufWriter<&mut File>>,
    name: &str,
    bytes: &[u8],
    options: FileOptions,
    dest: &Path,
) -> Result<()> {
    zip.start_file(name, options).map_err(|e| Error::zip(e, dest))?;
    zip.write_all(bytes).map_err(|e| Error::io(e, dest.to_path_buf()))?;
    Ok(())
}
