// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fumen_sound::audio::{self, Mixer, Output};
use fumen_sound::chart::{Chart, GridTime, ObjectKind, TempoMap, TimeSignature, RESOLUTION};
use fumen_sound::config::Settings;
use fumen_sound::sounds::{load_bank, LoadReport};
use fumen_sound::transport::ClockTransport;
use fumen_sound::FumenSoundPlayer;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Sound effect scheduler for rhythm game chart editors."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads every sound in the configured sound folder and reports what is missing.
    Verify {
        /// The path to the fumen-sound configuration file.
        config: PathBuf,
    },
    /// Plays a generated demo chart through the scheduler.
    Preview {
        /// The path to the fumen-sound configuration file.
        config: PathBuf,

        /// The tempo of the demo chart.
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,

        /// Beats per measure of the demo chart.
        #[arg(long, default_value_t = 4)]
        beats_per_measure: u32,

        /// How many measures to play.
        #[arg(long, default_value_t = 8)]
        measures: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config } => {
            let settings = Settings::load(&config)?;
            let folder = settings.existing_sound_folder()?.to_path_buf();
            let mixer = Arc::new(Mixer::new(
                settings.audio().channels(),
                settings.audio().sample_rate(),
            ));

            let (_, report) = load_bank(settings, mixer).await?;
            print_report(&folder, &report);
            if !report.failed.is_empty() {
                return Err(format!("{} sounds failed to load", report.failed.len()).into());
            }
        }
        Commands::Preview {
            config,
            bpm,
            beats_per_measure,
            measures,
        } => {
            let settings = Settings::load(&config)?;
            let output = Output::start(settings.audio())?;
            let mut player = FumenSoundPlayer::new(
                Arc::new(load_bank(settings.clone(), output.mixer().clone()).await?.0),
                settings.scheduler(),
            )?;

            let measures = measures.max(3);
            let chart = demo_chart(bpm, beats_per_measure, measures);
            let length = chart
                .tempo_map()
                .grid_to_audio_time(GridTime::new(measures + 1, 0));
            let transport = Arc::new(ClockTransport::new());

            player.prepare(&chart, transport.clone())?;
            transport.play();
            player.play()?;
            info!(?length, "Previewing demo chart");

            tokio::time::sleep(length + Duration::from_secs(1)).await;
            player.stop();
        }
    }

    Ok(())
}

fn print_report(folder: &Path, report: &LoadReport) {
    println!("Sound folder: {}", folder.display());
    println!("Loaded (count: {}):", report.loaded.len());
    for category in report.loaded.iter() {
        println!("- {}", category.file_name());
    }
    if !report.missing.is_empty() {
        println!("\nMissing (count: {}):", report.missing.len());
        for category in report.missing.iter() {
            println!("- {}", category.file_name());
        }
    }
    if !report.failed.is_empty() {
        println!("\nFailed (count: {}):", report.failed.len());
        for (category, err) in report.failed.iter() {
            println!("- {}: {}", category.file_name(), err);
        }
    }
}

/// Builds a chart exercising most sounds: a tap on every beat with critical downbeats, a
/// bell and flick pair midway, a hold over the second to last measure and a beam over the last.
/// `measures` must be at least 3. Beats per measure are clamped to `1..=RESOLUTION`.
fn demo_chart(bpm: f64, beats_per_measure: u32, measures: u32) -> Chart {
    let beats_per_measure = beats_per_measure.clamp(1, RESOLUTION);
    let beat = RESOLUTION / beats_per_measure;

    let mut chart = Chart::new(TempoMap::new(
        bpm,
        TimeSignature::new(beats_per_measure, 4),
    ));
    for measure in 1..measures - 1 {
        chart.add(GridTime::new(measure, 0), ObjectKind::Tap { critical: true });
        for step in 1..beats_per_measure {
            chart.add(
                GridTime::new(measure, step * beat),
                ObjectKind::Tap { critical: false },
            );
        }
    }

    let middle = measures / 2;
    chart
        .add(GridTime::new(middle, beat / 2), ObjectKind::Bell)
        .add(GridTime::new(middle, beat / 2), ObjectKind::Flick { critical: false })
        .add(
            GridTime::new(measures - 1, 0),
            ObjectKind::Hold {
                critical: false,
                end: Some(GridTime::new(measures, 0)),
            },
        )
        .add(GridTime::new(measures, 0), ObjectKind::HoldEnd)
        .add(
            GridTime::new(measures, 0),
            ObjectKind::BeamStart {
                max: GridTime::new(measures + 1, 0),
            },
        );
    chart
}
