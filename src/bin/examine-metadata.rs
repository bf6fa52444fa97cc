use std::{error::Error, path::PathBuf};

use clap::Parser;
use colored::Colorize;
use serde_json::{Map, Value, json};
use spatialmedia::{ExaminationReport, examine_metadata};

#[derive(Debug, Parser)]
#[command(
    name = "examine-metadata",
    version,
    about = "Print the spherical and spatial audio metadata of an MP4/MOV file",
    after_help = "Examples:\n  examine-metadata output.mp4\n  examine-metadata output.mp4 --json"
)]
struct Cli {
    /// Path to the video file (MP4/MOV).
    input: PathBuf,

    /// Output the report as machine-readable JSON.
    #[arg(long)]
    json: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

fn report_json(report: &ExaminationReport) -> Value {
    let tracks: Vec<Value> = report
        .tracks
        .iter()
        .map(|track| {
            json!({
                "index": track.index,
                "kind": track.kind.to_string(),
                "spherical": track.spherical.as_ref().map(|spherical| {
                    spherical
                        .entries
                        .iter()
                        .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
                        .collect::<Map<String, Value>>()
                }),
                "spatial_audio": track.spatial_audio.as_ref().map(|audio| json!({
                    "ambisonic_type": audio.ambisonic_type.to_string(),
                    "ambisonic_order": audio.ambisonic_order,
                    "channel_ordering": audio.channel_ordering.to_string(),
                    "normalization": audio.normalization.to_string(),
                    "channel_map": audio.channel_map,
                    "head_locked_stereo": audio.has_head_locked_stereo,
                })),
            })
        })
        .collect();
    json!({
        "spherical": report.has_spherical(),
        "spatial_audio": report.has_spatial_audio(),
        "tracks": tracks,
    })
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_logging(cli.verbose);
    let report = examine_metadata(&cli.input)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        println!("{}", cli.input.display().to_string().bold());
        print!("{report}");
    }
    Ok(())
}

fn main() {
    if let Err(error) = run(Cli::parse()) {
        println!("{} {error}", "Error:".red().bold());
        std::process::exit(1);
    }
}
