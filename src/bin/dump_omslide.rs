//! Debug tool to inspect, export and build `.omslide` slide archives.
//!
//! Usage:
//!   `cargo run --bin dump_omslide -- <file.omslide>`
//!   `cargo run --bin dump_omslide -- <file.omslide> --json`
//!   `cargo run --bin dump_omslide -- <file.omslide> --extract <dir>`
//!   `cargo run --bin dump_omslide -- <file.omslide> --build <image folder>`
//!
//! Build settings come from `OMSLIDE_*` environment variables or a `.env` file.

use std::env;
use std::path::Path;

use anyhow::{bail, Context};
use omslide::slides::manifest::SlidesConfig;
use omslide::{Config, Direction, SlideFile, SlideFileBuilder};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        let program = args.first().map_or("dump_omslide", String::as_str);
        eprintln!("Usage: {program} <file.omslide>");
        eprintln!("       {program} <file.omslide> --json");
        eprintln!("       {program} <file.omslide> --extract <dir>");
        eprintln!("       {program} <file.omslide> --build <image folder>");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    match args.get(2).map(String::as_str) {
        None => dump_archive(path),
        Some("--json") => dump_json(path),
        Some("--extract") => {
            let dir = args.get(3).context("--extract needs a target directory")?;
            extract(path, Path::new(dir))
        }
        Some("--build") => {
            let folder = args.get(3).context("--build needs an image folder")?;
            build(path, Path::new(folder))
        }
        Some(other) => bail!("Unknown option: {other}"),
    }
}

fn open(path: &Path) -> anyhow::Result<SlideFile> {
    SlideFile::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn dump_json(path: &Path) -> anyhow::Result<()> {
    let file = open(path)?;
    println!("{}", serde_json::to_string_pretty(file.manifest())?);
    Ok(())
}

fn dump_archive(path: &Path) -> anyhow::Result<()> {
    let file = open(path)?;
    let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║ Slide Archive: {name}");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    print_settings(file.manifest());
    println!();

    let slides = file.slides(true)?;
    println!("🖼️  SLIDES ({} total)", slides.len());
    for (i, slide) in slides.iter().enumerate() {
        let is_last = i + 1 == slides.len();
        let prefix = if is_last { "└" } else { "├" };
        let child = if is_last { " " } else { "│" };

        println!("{prefix}─ {i}: \"{}\"", slide.archive_entry_name);
        println!("{child}  ├─ Source: {}", slide.original_file_path);
        if let Some(image) = &slide.image {
            println!("{child}  ├─ Size: {}x{}", image.width(), image.height());
        }
        println!(
            "{child}  ├─ Fades: in {}/{} out {}/{} (forward/reverse)",
            slide.fades.fade_in(Direction::Forward),
            slide.fades.fade_in(Direction::Reverse),
            slide.fades.fade_out(Direction::Forward),
            slide.fades.fade_out(Direction::Reverse),
        );
        println!(
            "{child}  └─ Dwell: {} ms",
            slide.effective_dwell_time(file.dwell_time_milliseconds())
        );
    }
    println!();
    println!("Signature: {}", file.create_signature());
    Ok(())
}

fn print_settings(config: &SlidesConfig) {
    println!("⚙️  SETTINGS");
    println!("├─ Auto play: {}", config.auto_play);
    println!("├─ Dwell time: {} ms", config.dwell_time_milliseconds);
    println!("├─ Loop: {}", config.looping);
    println!("└─ Auto close: {}", config.auto_close);
}

fn extract(path: &Path, dir: &Path) -> anyhow::Result<()> {
    let file = open(path)?;
    let count = file
        .extract_images(dir)
        .with_context(|| format!("Failed to extract images to {}", dir.display()))?;
    println!("Extracted {count} images to {}", dir.display());
    Ok(())
}

fn build(path: &Path, folder: &Path) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut builder = SlideFileBuilder::new(config);

    let names = builder.add_slides_from_folder(folder)?;
    if names.is_empty() {
        bail!("No supported images in {}", folder.display());
    }

    builder.build_with_progress(path, true, |progress| {
        println!(
            "[{:>5.1}%] {}",
            progress.percentage_complete,
            progress.entry_name.as_deref().unwrap_or_default()
        );
    })?;

    println!("Built {} with {} slides", path.display(), builder.slide_count());
    Ok(())
}
