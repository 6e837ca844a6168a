//! Integration tests: build archives from image files and read them back.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use omslide::{Config, Error, FadeFlags, SlideFile, SlideFileBuilder};
use tempfile::TempDir;

// Helper function to write a solid-color source image
fn write_image(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .save(&path)
        .unwrap();
    path
}

fn test_config() -> Config {
    Config {
        batch_size: 2,
        max_workers: 2,
        ..Config::with_max_slide_size(160, 90)
    }
}

/// Three slides with distinct fades and dwell times
fn three_slide_builder(dir: &Path) -> SlideFileBuilder {
    let mut builder = SlideFileBuilder::new(test_config());
    builder.set_auto_play(true);
    builder.set_looping(true);
    builder.set_dwell_time_milliseconds(4000);

    let red = write_image(dir, "red.png", 320, 90, [250, 10, 10]);
    let green = write_image(dir, "green.jpg", 40, 40, [10, 250, 10]);
    let blue = write_image(dir, "blue.png", 90, 180, [10, 10, 250]);

    builder.add_slide(&red, FadeFlags::new(true, false, false, false), 0).unwrap();
    builder.add_slide(&green, FadeFlags::NONE, 2500).unwrap();
    builder.add_slide(&blue, FadeFlags::ALL, 0).unwrap();
    builder
}

#[test]
fn test_roundtrip_preserves_manifest() {
    let dir = TempDir::new().unwrap();
    let mut builder = three_slide_builder(dir.path());
    let dest = dir.path().join("show.omslide");
    builder.build(&dest, false).unwrap();

    let file = SlideFile::open(&dest).unwrap();
    assert_eq!(file.slide_count(), 3);
    assert!(file.auto_play());
    assert!(file.looping());
    assert!(!file.auto_close());
    assert_eq!(file.dwell_time_milliseconds(), 4000);

    let slides = file.slides(false).unwrap();
    let names: Vec<_> = slides.iter().map(|s| s.archive_entry_name.as_str()).collect();
    assert_eq!(names, ["red", "green", "blue"]);
    assert_eq!(slides[0].fades, FadeFlags::new(true, false, false, false));
    assert_eq!(slides[1].dwell_time_milliseconds, 2500);
    assert_eq!(slides[2].fades, FadeFlags::ALL);
    assert!(slides[0].original_file_path.ends_with("red.png"));

    assert_eq!(file.create_signature(), builder.create_signature());
}

#[test]
fn test_images_are_downsized_jpegs() {
    let dir = TempDir::new().unwrap();
    let mut builder = three_slide_builder(dir.path());
    let dest = dir.path().join("show.omslide");
    builder.build(&dest, false).unwrap();

    let file = SlideFile::open(&dest).unwrap();
    let sizes: Vec<(u32, u32)> = file
        .slides(true)
        .unwrap()
        .iter()
        .map(|s| s.image.as_ref().unwrap().dimensions())
        .collect();

    // 320x90 fits 160x90 at 160x45, 40x40 is never enlarged, 90x180 becomes 45x90
    assert_eq!(sizes, [(160, 45), (40, 40), (45, 90)]);

    let out = dir.path().join("export");
    assert_eq!(file.extract_images(&out).unwrap(), 3);
    let bytes = std::fs::read(out.join("red")).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
}

#[test]
fn test_slide_index_out_of_range() {
    let dir = TempDir::new().unwrap();
    let mut builder = three_slide_builder(dir.path());
    let dest = dir.path().join("show.omslide");
    builder.build(&dest, false).unwrap();

    let file = SlideFile::open(&dest).unwrap();
    assert!(file.slide(2, true).is_ok());
    let err = file.slide(3, false).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 3 }));
}

#[test]
fn test_load_then_rebuild_without_sources() {
    let dir = TempDir::new().unwrap();
    let mut builder = three_slide_builder(dir.path());
    let first = dir.path().join("first.omslide");
    builder.build(&first, false).unwrap();
    let signature = builder.create_signature();

    // Loaded slides carry decoded images, so the original files are no longer needed
    for name in ["red.png", "green.jpg", "blue.png"] {
        std::fs::remove_file(dir.path().join(name)).unwrap();
    }

    let mut reloaded = SlideFileBuilder::new(test_config());
    reloaded.load(&first).unwrap();
    assert_eq!(reloaded.create_signature(), signature);
    assert!(reloaded.slides().iter().all(|s| s.image.is_some()));

    reloaded.remove_slide("green");
    reloaded.set_auto_close(true);
    assert_ne!(reloaded.create_signature(), signature);

    let second = dir.path().join("second.omslide");
    reloaded.build(&second, false).unwrap();

    let file = SlideFile::open(&second).unwrap();
    assert_eq!(file.slide_count(), 2);
    assert!(file.auto_close());
    assert_eq!(file.create_signature(), reloaded.create_signature());
}

#[test]
fn test_load_replaces_existing_content() {
    let dir = TempDir::new().unwrap();
    let mut builder = three_slide_builder(dir.path());
    let dest = dir.path().join("show.omslide");
    builder.build(&dest, false).unwrap();

    let mut other = SlideFileBuilder::new(test_config());
    let extra = write_image(dir.path(), "extra.png", 8, 8, [0, 0, 0]);
    other.add_slide(&extra, FadeFlags::NONE, 0).unwrap();
    other.set_auto_close(true);

    other.load(&dest).unwrap();
    assert_eq!(other.slide_count(), 3);
    assert!(other.slide("extra").is_none());
    assert!(!other.auto_close());
}

#[test]
fn test_overwrite_replaces_existing_archive() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("show.omslide");

    let mut builder = three_slide_builder(dir.path());
    builder.build(&dest, false).unwrap();
    assert!(matches!(builder.build(&dest, false), Err(Error::DestinationExists(_))));

    builder.sync_slide_order(["blue", "red"]);
    builder.build(&dest, true).unwrap();

    let file = SlideFile::open(&dest).unwrap();
    let names: Vec<_> = file
        .slides(false)
        .unwrap()
        .into_iter()
        .map(|s| s.archive_entry_name)
        .collect();
    assert_eq!(names, ["blue", "red"]);
}

#[test]
fn test_empty_show_builds_manifest_only() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("empty.omslide");

    let mut reports = Vec::new();
    SlideFileBuilder::new(test_config())
        .build_with_progress(&dest, false, |p| reports.push(p.entries_built))
        .unwrap();
    assert_eq!(reports, [1]);

    let file = SlideFile::open(&dest).unwrap();
    assert_eq!(file.slide_count(), 0);
    assert!(file.slides(true).unwrap().is_empty());
}

#[test]
fn test_folder_build_uses_file_name_order() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir(&images).unwrap();
    write_image(&images, "02 second.png", 10, 10, [1, 2, 3]);
    write_image(&images, "01 first.jpeg", 10, 10, [4, 5, 6]);
    write_image(&images, "03 third.PNG", 10, 10, [7, 8, 9]);

    let mut builder = SlideFileBuilder::new(test_config());
    builder.add_slides_from_folder(&images).unwrap();
    let dest = dir.path().join("folder.omslide");
    builder.build(&dest, false).unwrap();

    let slides = SlideFile::open(&dest).unwrap().slides(false).unwrap();
    let names: Vec<_> = slides.iter().map(|s| s.archive_entry_name.as_str()).collect();
    assert_eq!(names, ["01 first", "02 second", "03 third"]);
    assert!(slides[0].fades.fade_in_forward);
    assert!(slides[2].fades.fade_out_forward);
}

#[test]
fn test_file_extension() {
    assert_eq!(SlideFile::FILE_EXTENSION, ".omslide");
}
