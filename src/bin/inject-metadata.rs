use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use spatialmedia::{Crop, InjectionOptions, ProgressCallback, ProgressInfo, StereoMode};

const CLI_AFTER_HELP: &str = "Examples:\n  inject-metadata input.mp4 output.mp4\n  inject-metadata input.mp4 output.mp4 --stereo top-bottom --spatial-audio\n  inject-metadata input.mov output.mov --spherical-only --crop 3840:1920:3840:2160:0:120";

#[derive(Debug, Parser)]
#[command(
    name = "inject-metadata",
    version,
    about = "Inject 360 video metadata into MP4/MOV files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Path to the input video file (MP4/MOV).
    input: PathBuf,

    /// Path to save the output video with injected metadata.
    output: PathBuf,

    /// Stereo mode (e.g. 'top-bottom').
    #[arg(long, value_parser = ["top-bottom", "left-right"])]
    stereo: Option<String>,

    /// Enable only spherical 360 metadata (no stereo).
    #[arg(long)]
    spherical_only: bool,

    /// Enable spatial audio metadata.
    #[arg(long)]
    spatial_audio: bool,

    /// Cropped area of a partial panorama: W:H:FULL_W:FULL_H:LEFT:TOP.
    #[arg(long)]
    crop: Option<String>,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while the output is written.
    #[arg(long)]
    progress: bool,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

fn build_options(cli: &Cli) -> Result<InjectionOptions, Box<dyn Error>> {
    let stereo = cli
        .stereo
        .as_deref()
        .map(str::parse::<StereoMode>)
        .transpose()?;
    let crop = cli.crop.as_deref().map(str::parse::<Crop>).transpose()?;

    if cli.spherical_only && stereo.is_some() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--stereo is ignored when --spherical-only is set".yellow()
        );
    }

    Ok(InjectionOptions::new()
        .with_stereo_mode(stereo)
        .with_spherical_only(cli.spherical_only)
        .with_spatial_audio(cli.spatial_audio)
        .with_crop(crop))
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_logging(cli.verbose);
    let mut options = build_options(&cli)?;

    let progress = if cli.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let result = spatialmedia::inject_360_metadata(&cli.input, &cli.output, &options);
    if let Some(progress) = &progress {
        progress.bar.finish_and_clear();
    }

    for line in result? {
        println!("{line}");
    }
    println!(
        "{}",
        format!(
            "Metadata injected successfully into: {}",
            cli.output.display()
        )
        .green()
    );
    Ok(())
}

fn main() {
    if let Err(error) = run(Cli::parse()) {
        println!("{} {error}", "Error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("inject-metadata").chain(args.iter().copied()))
    }

    #[test]
    fn positional_paths_are_required() {
        assert!(parse(&["only-input.mp4"]).is_err());
        let cli = parse(&["in.mp4", "out.mp4"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("in.mp4"));
        assert_eq!(cli.output, PathBuf::from("out.mp4"));
        assert!(cli.stereo.is_none());
        assert!(!cli.spherical_only);
        assert!(!cli.spatial_audio);
    }

    #[test]
    fn stereo_choices_are_restricted() {
        assert!(parse(&["in.mp4", "out.mp4", "--stereo", "mono"]).is_err());
        let cli = parse(&["in.mp4", "out.mp4", "--stereo", "left-right"]).unwrap();
        assert_eq!(cli.stereo.as_deref(), Some("left-right"));
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = parse(&[
            "in.mp4",
            "out.mp4",
            "--stereo",
            "top-bottom",
            "--spatial-audio",
        ])
        .unwrap();
        let metadata = build_options(&cli).unwrap().build_metadata().unwrap();
        assert!(metadata.video.unwrap().contains("top-bottom"));
        assert_eq!(metadata.audio.unwrap().ambisonic_order, 1);
    }

    #[test]
    fn spherical_only_wins_over_stereo() {
        let cli = parse(&[
            "in.mp4",
            "out.mp4",
            "--stereo",
            "top-bottom",
            "--spherical-only",
        ])
        .unwrap();
        let options = build_options(&cli).unwrap();
        assert_eq!(options.effective_stereo_mode(), None);
    }

    #[test]
    fn bad_crop_is_reported() {
        let cli = parse(&["in.mp4", "out.mp4", "--crop", "1:2:3"]).unwrap();
        let error = build_options(&cli).unwrap_err();
        assert!(error.to_string().contains("Invalid crop"), "{error}");
    }
}
