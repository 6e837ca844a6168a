//! Image decode, resize and JPEG encode for slide entries.
//!
//! The builder and reader talk to images only through [`ImageCodec`], so the
//! archive logic can be tested without real pixels. [`StandardCodec`] is the
//! production implementation on top of the `image` crate.
//!
//! Some real-world files carry a damaged embedded color profile (JPEG `APP2
//! ICC_PROFILE` segments, PNG `iCCP` chunks) that makes decoding fail.
//! [`decode_with_fallback`] recognises that case and retries with the profile
//! stripped; every other decode failure propagates.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};
use thiserror::Error;

/// Errors raised by an [`ImageCodec`]
#[derive(Debug, Error)]
pub enum CodecError {
    /// Decoding failed and the data carries an embedded color profile
    #[error("embedded color profile prevented decoding: {0}")]
    ColorProfile(#[source] ImageError),

    /// Decoding failed for any other reason
    #[error("decode failed: {0}")]
    Decode(#[from] ImageError),

    /// JPEG encoding failed
    #[error("encode failed: {0}")]
    Encode(#[source] ImageError),

    /// The source could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How an embedded color profile is treated while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMode {
    /// Decode the data as stored
    Honor,
    /// Strip any embedded color profile before decoding
    Ignore,
}

/// Maximum slide dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Maximum width
    pub max_width: u32,
    /// Maximum height
    pub max_height: u32,
}

impl Bounds {
    /// Create bounds from a maximum width and height
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self { max_width, max_height }
    }

    /// True when an image of this size needs no downsizing
    pub const fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.max_width && height <= self.max_height
    }
}

/// Image operations the archive builder and reader depend on
pub trait ImageCodec: Send + Sync {
    /// Decode a source image file, correct its EXIF orientation and downsize it
    /// to fit `bounds`, preserving aspect ratio
    fn load(&self, path: &Path, bounds: Bounds) -> Result<DynamicImage, CodecError>;

    /// Decode an image from memory
    fn decode(&self, bytes: &[u8], mode: ProfileMode) -> Result<DynamicImage, CodecError>;

    /// Encode an image as JPEG
    fn encode_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>, CodecError>;
}

/// [`ImageCodec`] backed by the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct StandardCodec {
    jpeg_quality: u8,
}

impl StandardCodec {
    /// Create a codec that encodes at the given JPEG quality (1-100)
    pub const fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }
}

impl Default for StandardCodec {
    fn default() -> Self {
        Self::new(crate::constants::image::DEFAULT_JPEG_QUALITY)
    }
}

impl ImageCodec for StandardCodec {
    fn load(&self, path: &Path, bounds: Bounds) -> Result<DynamicImage, CodecError> {
        let bytes = fs_err::read(path)?;
        let image = decode_with_fallback(self, &bytes, &path.display().to_string())?;
        Ok(downsize(image, bounds))
    }

    fn decode(&self, bytes: &[u8], mode: ProfileMode) -> Result<DynamicImage, CodecError> {
        let data = match mode {
            ProfileMode::Honor => Cow::Borrowed(bytes),
            ProfileMode::Ignore => strip_color_profile(bytes).map_or(Cow::Borrowed(bytes), Cow::Owned),
        };

        decode_oriented(&data).map_err(|e| {
            if mode == ProfileMode::Honor && has_color_profile(bytes) {
                CodecError::ColorProfile(e)
            } else {
                CodecError::Decode(e)
            }
        })
    }

    fn encode_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        // JPEG has no alpha channel
        let rgb = image.to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(CodecError::Encode)?;
        Ok(buf)
    }
}

/// Decode `bytes`, retrying once without the embedded color profile when that
/// profile is what broke the first attempt
pub fn decode_with_fallback<C: ImageCodec + ?Sized>(
    codec: &C,
    bytes: &[u8],
    name: &str,
) -> Result<DynamicImage, CodecError> {
    match codec.decode(bytes, ProfileMode::Honor) {
        Err(CodecError::ColorProfile(e)) => {
            tracing::warn!("Color profile in {name} could not be decoded ({e}), retrying without it");
            codec.decode(bytes, ProfileMode::Ignore)
        }
        other => other,
    }
}

/// Downsize `image` to fit `bounds`, preserving aspect ratio. Images that
/// already fit are returned unchanged; nothing is ever enlarged.
pub fn downsize(image: DynamicImage, bounds: Bounds) -> DynamicImage {
    if bounds.contains(image.width(), image.height()) {
        return image;
    }
    image.resize(bounds.max_width, bounds.max_height, FilterType::Lanczos3)
}

fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// True when `bytes` is a JPEG or PNG carrying an embedded color profile
pub fn has_color_profile(bytes: &[u8]) -> bool {
    strip_color_profile(bytes).is_some()
}

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const ICC_PROFILE_TAG: &[u8] = b"ICC_PROFILE\0";

/// Return a copy of `bytes` with every embedded color profile removed, or
/// `None` if the data is not JPEG/PNG or carries no profile.
pub fn strip_color_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.starts_with(&JPEG_SOI) {
        strip_jpeg_icc(bytes)
    } else if bytes.starts_with(&PNG_SIGNATURE) {
        strip_png_iccp(bytes)
    } else {
        None
    }
}

fn strip_jpeg_icc(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&JPEG_SOI);
    let mut stripped = false;
    let mut pos = JPEG_SOI.len();

    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];

        // Fill byte
        if marker == 0xFF {
            out.push(0xFF);
            pos += 1;
            continue;
        }

        // Start of scan or end of image: the remainder is entropy-coded data
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        // Standalone markers carry no length
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            out.extend_from_slice(&bytes[pos..pos + 2]);
            pos += 2;
            continue;
        }

        let len_bytes = bytes.get(pos + 2..pos + 4)?;
        let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
        let end = pos + 2 + len;
        if len < 2 || end > bytes.len() {
            return None;
        }

        let payload = &bytes[pos + 4..end];
        if marker == 0xE2 && payload.starts_with(ICC_PROFILE_TAG) {
            stripped = true;
        } else {
            out.extend_from_slice(&bytes[pos..end]);
        }
        pos = end;
    }

    if !stripped {
        return None;
    }
    out.extend_from_slice(&bytes[pos.min(bytes.len())..]);
    Some(out)
}

fn strip_png_iccp(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&PNG_SIGNATURE);
    let mut stripped = false;
    let mut pos = PNG_SIGNATURE.len();

    while pos < bytes.len() {
        let header = bytes.get(pos..pos + 8)?;
        let len = usize::try_from(u32::from_be_bytes([header[0], header[1], header[2], header[3]])).ok()?;
        let chunk_type = &header[4..8];
        // length + type + data + crc
        let end = pos.checked_add(12)?.checked_add(len)?;
        if end > bytes.len() {
            return None;
        }

        if chunk_type == b"iCCP" {
            stripped = true;
        } else {
            out.extend_from_slice(&bytes[pos..end]);
        }
        pos = end;

        if chunk_type == b"IEND" {
            break;
        }
    }

    if !stripped {
        return None;
    }
    out.extend_from_slice(&bytes[pos..]);
    Some(out)
}
