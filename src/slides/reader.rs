//! Reads `.omslide` archives.
//!
//! The manifest is loaded once when the file is opened. Every image read
//! reopens the container, so no file handle is held between calls.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use zip::result::ZipError;
use zip::read::ZipFile;
use zip::ZipArchive;

use super::manifest::{names_match, SlidesConfig};
use super::slide::Slide;
use crate::constants::{CONFIG_ENTRY_NAME, FILE_EXTENSION};
use crate::error::{Error, Result};
use crate::imaging::{decode_with_fallback, ImageCodec, StandardCodec};

/// An opened slide archive
pub struct SlideFile {
    path: PathBuf,
    config: SlidesConfig,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for SlideFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlideFile")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SlideFile {
    /// File extension of slide archives
    pub const FILE_EXTENSION: &'static str = FILE_EXTENSION;

    /// Open an archive and load its manifest
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_codec(path, Arc::new(StandardCodec::default()))
    }

    /// Open an archive, decoding images with `codec`
    pub fn open_with_codec(path: impl AsRef<Path>, codec: Arc<dyn ImageCodec>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = read_manifest(&path)?;
        tracing::debug!("Opened {} with {} slides", path.display(), config.slide_count());
        Ok(Self { path, config, codec })
    }

    /// Path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded manifest
    pub const fn manifest(&self) -> &SlidesConfig {
        &self.config
    }

    /// Consume the reader, keeping only its manifest
    pub fn into_manifest(self) -> SlidesConfig {
        self.config
    }

    /// Whether the show advances automatically
    pub const fn auto_play(&self) -> bool {
        self.config.auto_play
    }

    /// Whether the show closes after the last slide
    pub const fn auto_close(&self) -> bool {
        self.config.auto_close
    }

    /// Whether the show restarts after the last slide
    pub const fn looping(&self) -> bool {
        self.config.looping
    }

    /// Default dwell time in milliseconds
    pub const fn dwell_time_milliseconds(&self) -> u32 {
        self.config.dwell_time_milliseconds
    }

    /// Number of slides
    pub fn slide_count(&self) -> usize {
        self.config.slide_count()
    }

    /// Signature of the archive's manifest
    pub fn create_signature(&self) -> String {
        self.config.create_signature()
    }

    /// The slide at `index`, with its decoded image if `include_image`
    pub fn slide(&self, index: usize, include_image: bool) -> Result<Slide> {
        let stored = self.config.slides.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.config.slide_count(),
        })?;

        let mut slide = stored.without_image();
        if include_image {
            let mut zip = self.open_archive()?;
            slide.image = Some(self.read_image(&mut zip, index, stored)?);
        }
        Ok(slide)
    }

    /// Every slide in manifest order, opening the archive at most once
    pub fn slides(&self, include_image: bool) -> Result<Vec<Slide>> {
        if !include_image {
            return Ok(self.config.slides.iter().map(Slide::without_image).collect());
        }

        let mut zip = self.open_archive()?;
        self.config
            .slides
            .iter()
            .enumerate()
            .map(|(index, stored)| {
                let mut slide = stored.without_image();
                slide.image = Some(self.read_image(&mut zip, index, stored)?);
                Ok::<_, Error>(slide)
            })
            .collect()
    }

    /// Write every slide's stored image bytes to `folder` (created if absent),
    /// one file per entry name, overwriting existing files. Returns the number
    /// of files written.
    pub fn extract_images(&self, folder: impl AsRef<Path>) -> Result<usize> {
        let folder = folder.as_ref();
        fs_err::create_dir_all(folder)?;

        let mut zip = self.open_archive()?;
        for (index, slide) in self.config.slides.iter().enumerate() {
            let name = entry_name(index, slide)?;
            if !is_plain_file_name(name) {
                return Err(Error::InvalidEntryName { name: name.to_string() });
            }

            let bytes = read_entry(&mut zip, name, &self.path)?;
            fs_err::write(folder.join(name), bytes)?;
        }

        tracing::info!("Extracted {} images to {}", self.config.slide_count(), folder.display());
        Ok(self.config.slide_count())
    }

    fn open_archive(&self) -> Result<ZipArchive<BufReader<File>>> {
        open_archive(&self.path)
    }

    fn read_image<R: Read + Seek>(&self, zip: &mut ZipArchive<R>, index: usize, slide: &Slide) -> Result<DynamicImage> {
        let name = entry_name(index, slide)?;
        let bytes = read_entry(zip, name, &self.path)?;
        decode_with_fallback(self.codec.as_ref(), &bytes, name).map_err(|e| Error::image(name, e))
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| Error::zip(e, path))
}

fn read_manifest(path: &Path) -> Result<SlidesConfig> {
    let mut zip = open_archive(path)?;
    let entry = match zip.by_name(CONFIG_ENTRY_NAME) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(Error::MissingManifest(path.to_path_buf())),
        Err(e) => return Err(Error::zip(e, path)),
    };

    let config = serde_json::from_reader(BufReader::new(entry)).map_err(|source| Error::Manifest {
        source,
        path: path.to_path_buf(),
    })?;
    Ok(config)
}

fn entry_name(index: usize, slide: &Slide) -> Result<&str> {
    if slide.archive_entry_name.is_empty() {
        return Err(Error::MissingEntryName { index });
    }
    Ok(&slide.archive_entry_name)
}

/// Stored name matching `name` case-insensitively
fn find_entry_name<R: Read + Seek>(zip: &ZipArchive<R>, name: &str) -> Option<String> {
    zip.file_names().find(|stored| names_match(stored, name)).map(str::to_string)
}

/// Read the entry named `name`. The exact name is a direct lookup; only a miss
/// falls back to scanning every stored name.
fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str, path: &Path) -> Result<Vec<u8>> {
    let exact = zip.by_name(name).map(|mut entry| read_bytes(&mut entry, path));
    match exact {
        Ok(bytes) => bytes,
        Err(ZipError::FileNotFound) => {
            let stored = find_entry_name(zip, name).ok_or_else(|| Error::MissingEntry { name: name.to_string() })?;
            let mut entry = zip.by_name(&stored).map_err(|e| Error::zip(e, path))?;
            read_bytes(&mut entry, path)
        }
        Err(e) => Err(Error::zip(e, path)),
    }
}

fn read_bytes(entry: &mut ZipFile<'_>, path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry.read_to_end(&mut bytes).map_err(|e| Error::io(e, path.to_path_buf()))?;
    Ok(bytes)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}
