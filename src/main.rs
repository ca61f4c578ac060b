use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use chart_speed::{Ffmpeg, SaveTargets, Session, SpeedConfig, SpeedResult, SpeedState};

#[derive(Debug, Parser)]
#[command(name = "chart-speed", version, about = "Speed up or slow down a KSH chart and its audio")]
struct Cli {
    /// YAML config file (default: chart-speed.yaml beside the chart or in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rescale a chart and/or its audio and write the results
    Apply {
        /// Chart to rescale (.ksh)
        chart: Option<PathBuf>,

        /// Speed steps of 5% (negative slows down)
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        steps: i64,

        /// Audio track to adjust (.ogg, .mp3, .wav)
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Audio speed steps, when different from --steps
        #[arg(long, allow_hyphen_values = true)]
        audio_steps: Option<i64>,

        /// Change audio speed by resampling (pitch moves with speed)
        #[arg(long)]
        no_preserve_pitch: bool,

        /// Where to write the chart (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to write the audio (default: <output-stem>_adjusted.<ext>)
        #[arg(long)]
        audio_output: Option<PathBuf>,
    },
    /// Show original and rescaled baseline for a step count
    Info {
        chart: PathBuf,

        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        steps: i64,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(explicit: Option<&Path>, chart: Option<&Path>) -> SpeedResult<SpeedConfig> {
    match explicit {
        Some(path) => SpeedConfig::from_path(path),
        None => SpeedConfig::load(chart),
    }
}

fn run(cli: Cli) -> SpeedResult<i32> {
    match cli.command {
        Command::Info { chart, steps } => {
            let config = load_config(cli.config.as_deref(), Some(chart.as_path()))?;
            let mut session = Session::new(config);
            session.load_chart(&chart)?;
            session.adjust(steps);
            println!("{}", session.report());
            Ok(0)
        }
        Command::Apply {
            chart,
            steps,
            audio,
            audio_steps,
            no_preserve_pitch,
            output,
            audio_output,
        } => {
            if chart.is_none() && audio.is_none() {
                eprintln!("Nothing to do: give a chart, --audio, or both");
                return Ok(1);
            }

            let config = load_config(cli.config.as_deref(), chart.as_deref())?;
            let ffmpeg_override = config.ffmpeg_path.clone();
            let mut session = Session::new(config);
            if no_preserve_pitch {
                session.set_preserve_pitch(false);
            }

            if let Some(audio) = &audio {
                session.load_audio(audio)?;
            }
            if let Some(chart) = &chart {
                session.load_chart(chart)?;
            }
            session.adjust(steps);
            if let Some(audio_steps) = audio_steps {
                *session.audio_speed_mut() = SpeedState::with_steps(audio_steps);
            }
            eprintln!("{}", session.report());

            // Without --output the chart goes to stdout.
            if let (Some(_), None) = (&chart, &output) {
                if let Some(working) = session.working_document()? {
                    print!("{}", working.concat());
                }
            }

            let targets = SaveTargets {
                chart: output,
                audio: audio_output,
            };
            let report =
                session.save_all(&targets, || Ffmpeg::locate(ffmpeg_override.as_deref()));

            if let Some(Ok(path)) = &report.chart {
                eprintln!("Wrote chart to {}", path.display());
            }
            if let Some(result) = &report.audio {
                match result {
                    Ok(path) => eprintln!("Wrote audio to {}", path.display()),
                    Err(e) => error!("Failed to adjust audio: {}", e),
                }
            }
            if let Some(Err(e)) = &report.chart {
                error!("Failed to write chart: {}", e);
            }

            Ok(if report.is_success() { 0 } else { 1 })
        }
    }
}
