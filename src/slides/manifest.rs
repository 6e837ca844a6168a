//! The archive manifest: ordered slides plus playback settings.
//!
//! Serialized as the container's `config.json` entry. Slide order is playback
//! order. Entry names are compared case-insensitively everywhere.

use serde::{Deserialize, Serialize};

use super::slide::{Slide, SIGNATURE_DELIMITER};
use crate::constants::dwell;
use crate::error::{Error, Result};

/// Case-insensitive entry name comparison
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Whole-show configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SlidesConfig {
    /// Slides in playback order
    pub slides: Vec<Slide>,
    /// Advance slides automatically
    pub auto_play: bool,
    /// Default dwell time for slides without their own
    pub dwell_time_milliseconds: u32,
    /// Restart from the first slide after the last
    #[serde(rename = "Loop")]
    pub looping: bool,
    /// Close the show after the last slide
    pub auto_close: bool,
}

impl SlidesConfig {
    /// Number of slides
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Append a slide
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Insert a slide at `index` (`0..=slide_count`)
    pub fn insert_slide(&mut self, index: usize, slide: Slide) -> Result<()> {
        if index > self.slides.len() {
            return Err(Error::IndexOutOfRange { index, len: self.slides.len() });
        }
        self.slides.insert(index, slide);
        Ok(())
    }

    /// Remove the first slide named `name`; returns it if one was found
    pub fn remove_slide(&mut self, name: &str) -> Option<Slide> {
        let pos = self.position(name)?;
        Some(self.slides.remove(pos))
    }

    /// Rebuild the slide sequence in the order of `names`, dropping slides whose
    /// names are not listed and names with no matching slide
    pub fn sync_slide_order<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut remaining = std::mem::take(&mut self.slides);
        for name in names {
            if let Some(pos) = remaining.iter().position(|s| names_match(&s.archive_entry_name, name.as_ref())) {
                self.slides.push(remaining.remove(pos));
            }
        }
    }

    /// Find a slide by entry name
    pub fn find(&self, name: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| names_match(&s.archive_entry_name, name))
    }

    /// Position of the first slide named `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.slides.iter().position(|s| names_match(&s.archive_entry_name, name))
    }

    /// Entry names starting with `prefix` (case-insensitive)
    pub fn names_starting_with(&self, prefix: &str) -> impl Iterator<Item = &str> + '_ {
        let prefix = prefix.to_lowercase();
        self.slides
            .iter()
            .map(|s| s.archive_entry_name.as_str())
            .filter(move |name| name.to_lowercase().starts_with(&prefix))
    }

    /// Normalize values that are only checked at build time. An auto-playing
    /// show with a dwell time under one second gets the default instead.
    pub fn sanitize(&mut self) {
        if self.auto_play && self.dwell_time_milliseconds < dwell::MIN_AUTOPLAY_MILLISECONDS {
            self.dwell_time_milliseconds = dwell::DEFAULT_AUTOPLAY_MILLISECONDS;
        }
    }

    /// Concatenate the show settings and every slide signature in order;
    /// equal signatures mean equal content
    pub fn create_signature(&self) -> String {
        let d = SIGNATURE_DELIMITER;
        let mut signature = format!(
            "{}{d}{}{d}{}{d}{}",
            self.auto_play, self.auto_close, self.looping, self.dwell_time_milliseconds
        );
        for slide in &self.slides {
            signature.push(d);
            signature.push_str(&slide.create_signature());
        }
        signature
    }

    /// Reset to the empty default state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
