//! A single slide: image reference, transition flags and dwell time.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Separator between fields in a signature
pub(crate) const SIGNATURE_DELIMITER: char = '|';

/// Navigation direction when moving between slides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Advancing to the next slide
    Forward,
    /// Going back to the previous slide
    Reverse,
}

/// Fade transitions applied when a slide is entered or left
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FadeFlags {
    /// Fade in when reached by advancing
    pub fade_in_forward: bool,
    /// Fade in when reached by going back
    pub fade_in_reverse: bool,
    /// Fade out when leaving by advancing
    pub fade_out_forward: bool,
    /// Fade out when leaving by going back
    pub fade_out_reverse: bool,
}

impl FadeFlags {
    /// No fades in either direction
    pub const NONE: Self = Self {
        fade_in_forward: false,
        fade_in_reverse: false,
        fade_out_forward: false,
        fade_out_reverse: false,
    };

    /// Fade in and out in both directions
    pub const ALL: Self = Self {
        fade_in_forward: true,
        fade_in_reverse: true,
        fade_out_forward: true,
        fade_out_reverse: true,
    };

    /// Create flags from the four directional values
    pub const fn new(fade_in_forward: bool, fade_in_reverse: bool, fade_out_forward: bool, fade_out_reverse: bool) -> Self {
        Self {
            fade_in_forward,
            fade_in_reverse,
            fade_out_forward,
            fade_out_reverse,
        }
    }

    /// Whether the slide fades in when entered in `direction`
    pub const fn fade_in(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.fade_in_forward,
            Direction::Reverse => self.fade_in_reverse,
        }
    }

    /// Whether the slide fades out when left in `direction`
    pub const fn fade_out(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.fade_out_forward,
            Direction::Reverse => self.fade_out_reverse,
        }
    }
}

/// One image entry in a slideshow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "SlideRecord")]
pub struct Slide {
    /// Zip entry name of the slide image, unique within the archive
    pub archive_entry_name: String,
    /// Where the image came from; informational only
    pub original_file_path: String,
    /// Transition flags
    #[serde(flatten)]
    pub fades: FadeFlags,
    /// Per-slide dwell time; 0 means use the show's default
    pub dwell_time_milliseconds: u32,
    /// Decoded image, present only for slides loaded or read with images
    #[serde(skip)]
    pub image: Option<DynamicImage>,
}

impl Slide {
    /// Create a slide referencing a source file, image not yet decoded
    pub fn new(
        archive_entry_name: impl Into<String>,
        original_file_path: impl Into<String>,
        fades: FadeFlags,
        dwell_time_milliseconds: u32,
    ) -> Self {
        Self {
            archive_entry_name: archive_entry_name.into(),
            original_file_path: original_file_path.into(),
            fades,
            dwell_time_milliseconds,
            image: None,
        }
    }

    /// Dwell time to use for this slide given the show's default
    pub const fn effective_dwell_time(&self, global_milliseconds: u32) -> u32 {
        if self.dwell_time_milliseconds == 0 {
            global_milliseconds
        } else {
            self.dwell_time_milliseconds
        }
    }

    /// Concatenate every persisted field, for cheap change detection
    pub fn create_signature(&self) -> String {
        let d = SIGNATURE_DELIMITER;
        format!(
            "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
            self.fades.fade_in_forward,
            self.fades.fade_in_reverse,
            self.fades.fade_out_forward,
            self.fades.fade_out_reverse,
            self.dwell_time_milliseconds,
            self.archive_entry_name,
            self.original_file_path,
        )
    }

    /// Copy of the slide's manifest data without the decoded image
    #[must_use]
    pub fn without_image(&self) -> Self {
        Self {
            archive_entry_name: self.archive_entry_name.clone(),
            original_file_path: self.original_file_path.clone(),
            fades: self.fades,
            dwell_time_milliseconds: self.dwell_time_milliseconds,
            image: None,
        }
    }
}

/// On-disk slide record. Older archives stored a single `FadeIn`/`FadeOut`
/// pair; the directional fields take precedence when present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SlideRecord {
    archive_entry_name: Option<String>,
    original_file_path: Option<String>,
    fade_in_forward: Option<bool>,
    fade_in_reverse: Option<bool>,
    fade_out_forward: Option<bool>,
    fade_out_reverse: Option<bool>,
    fade_in: Option<bool>,
    fade_out: Option<bool>,
    dwell_time_milliseconds: Option<u32>,
}

impl From<SlideRecord> for Slide {
    fn from(record: SlideRecord) -> Self {
        let fade_in = record.fade_in.unwrap_or(false);
        let fade_out = record.fade_out.unwrap_or(false);

        Self {
            archive_entry_name: record.archive_entry_name.unwrap_or_default(),
            original_file_path: record.original_file_path.unwrap_or_default(),
            fades: FadeFlags {
                fade_in_forward: record.fade_in_forward.unwrap_or(fade_in),
                fade_in_reverse: record.fade_in_reverse.unwrap_or(fade_in),
                fade_out_forward: record.fade_out_forward.unwrap_or(fade_out),
                fade_out_reverse: record.fade_out_reverse.unwrap_or(fade_out),
            },
            dwell_time_milliseconds: record.dwell_time_milliseconds.unwrap_or(0),
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn sample() -> Slide {
        Slide::new("photo", "/pictures/photo.jpg", FadeFlags::new(true, false, true, false), 0)
    }

    #[test]
    fn signature_changes_with_each_field() {
        let base = sample().create_signature();

        let mut slide = sample();
        slide.fades.fade_in_reverse = true;
        assert_ne!(slide.create_signature(), base);

        let mut slide = sample();
        slide.fades.fade_out_reverse = true;
        assert_ne!(slide.create_signature(), base);

        let mut slide = sample();
        slide.dwell_time_milliseconds = 4000;
        assert_ne!(slide.create_signature(), base);

        let mut slide = sample();
        slide.archive_entry_name = "photo 002".to_string();
        assert_ne!(slide.create_signature(), base);

        assert_eq!(sample().create_signature(), base);
    }

    #[test]
    fn serializes_pascal_case_without_image() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["ArchiveEntryName"], "photo");
        assert_eq!(json["OriginalFilePath"], "/pictures/photo.jpg");
        assert_eq!(json["FadeInForward"], true);
        assert_eq!(json["FadeOutReverse"], false);
        assert_eq!(json["DwellTimeMilliseconds"], 0);
        assert!(json.get("Image").is_none());
        assert!(json.get("FadeIn").is_none());
    }

    #[test]
    fn legacy_fade_fields_fill_both_directions() {
        let json = r#"{"ArchiveEntryName":"old","FadeIn":true,"FadeOut":false,"FadeOutReverse":true}"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.fades, FadeFlags::new(true, true, false, true));
        assert_eq!(slide.original_file_path, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"ArchiveEntryName":"a","Rotation":90}"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.archive_entry_name, "a");
    }

    #[test]
    fn effective_dwell_time_falls_back_to_global() {
        let mut slide = sample();
        assert_eq!(slide.effective_dwell_time(5000), 5000);
        slide.dwell_time_milliseconds = 2500;
        assert_eq!(slide.effective_dwell_time(5000), 2500);
    }

    #[test]
    fn fade_flags_select_by_direction() {
        let fades = FadeFlags::new(true, false, false, true);
        assert!(fades.fade_in(Direction::Forward));
        assert!(!fades.fade_in(Direction::Reverse));
        assert!(!fades.fade_out(Direction::Forward));
        assert!(fades.fade_out(Direction::Reverse));
    }
}
