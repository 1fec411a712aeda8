use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use scorelisto::features::pitch::{McLeodPitch, PitchTrack, PitchTrackBuilder};
use scorelisto::features::steps::NoteSequence;
use scorelisto::io::records::{load_pitch_track, load_steps, save_pitch_track, save_steps};
use scorelisto::io::{decode_file, AudioSource};
use scorelisto::{score_steps, segment_track, transcribe_source, Progress, TranscriptionConfig};
use std::path::{Path, PathBuf};

/// Monophonic audio-to-score transcription
#[derive(Parser)]
#[command(name = "scorelisto")]
#[command(about = "Transcribe a monophonic recording into a notated score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Last stage to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Stage {
    /// Pitch track only
    Pitch,
    /// Pitch track and note segmentation
    Steps,
    /// Full pipeline
    Score,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe a media file or resume from a saved record
    Transcribe {
        /// Audio file, or a pitch_track.json / steps.json record
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this stage
        #[arg(long, value_enum, default_value = "score")]
        stage: Stage,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the audio streams of a media file
    Streams {
        /// Audio file
        input: PathBuf,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

/// Data a run starts from
enum Input {
    Audio(PathBuf),
    PitchTrack(PitchTrack),
    Steps(NoteSequence),
}

fn read_input(path: &Path) -> anyhow::Result<Input> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Ok(Input::Audio(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    if value.get("period_s").is_some() {
        Ok(Input::PitchTrack(load_pitch_track(path)?))
    } else if value.get("notes").is_some() {
        Ok(Input::Steps(load_steps(path)?))
    } else {
        anyhow::bail!("{} is neither a pitch track nor a step record", path.display())
    }
}

fn transcribe(
    input: &Path,
    output: &Path,
    config: &TranscriptionConfig,
    stage: Stage,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Cannot create {}", output.display()))?;
    let progress = Progress::new();

    let steps = match read_input(input)? {
        Input::Audio(path) if stage == Stage::Score => {
            let mut source = decode_file(&path)?;
            let result = transcribe_source(&mut source, config, &progress)?;
            save_pitch_track(&result.pitch_track, output.join("pitch_track.json"))?;
            save_steps(&result.steps, output.join("steps.json"))?;
            result.score.save(output.join("score.json"))?;
            log::info!(
                "{} score entries in {} ({} segments, {:.1} ms)",
                result.score.notes.len(),
                result.metadata.key_name,
                result.metadata.segment_count,
                result.metadata.processing_time_ms
            );
            for warning in &result.metadata.warnings {
                log::warn!("{}", warning);
            }
            return Ok(());
        }
        Input::Audio(path) => {
            let mut source = decode_file(&path)?;
            let track = PitchTrackBuilder::new(McLeodPitch::new(config.mcleod.clone()))
                .reference_pitch(config.reference_pitch_hz)
                .build(&mut source, &config.reader, &progress)?;
            save_pitch_track(&track, output.join("pitch_track.json"))?;
            log::info!("Pitch track of {} samples", track.len());
            if stage == Stage::Pitch {
                return Ok(());
            }
            segment_track(&track, config, &progress)?
        }
        Input::PitchTrack(track) => {
            if stage == Stage::Pitch {
                anyhow::bail!("Input is already a pitch track");
            }
            segment_track(&track, config, &progress)?
        }
        Input::Steps(steps) => {
            if stage < Stage::Score {
                anyhow::bail!("Input is already a step record");
            }
            steps
        }
    };
    save_steps(&steps, output.join("steps.json"))?;
    log::info!("{} notes and rests", steps.notes.len());
    if stage == Stage::Steps {
        return Ok(());
    }

    let (score, key_name) = score_steps(&steps, config, &progress)?;
    score.save(output.join("score.json"))?;
    log::info!(
        "{} score entries in {} {}/{}",
        score.notes.len(),
        key_name,
        score.beats,
        score.beat_type
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            config,
            stage,
            verbose,
        } => {
            let level = if verbose { "debug" } else { "info" };
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

            let config = match config {
                Some(path) => TranscriptionConfig::load(&path)
                    .with_context(|| format!("Invalid configuration {}", path.display()))?,
                None => TranscriptionConfig::default(),
            };
            log::info!("Processing {}...", input.display());
            transcribe(&input, &output, &config, stage)?;
            log::info!("Results saved to {}", output.display());
        }
        Commands::Streams { input } => {
            env_logger::init();
            let source = decode_file(&input)?;
            for stream in source.streams() {
                println!(
                    "#{} {}: {} ch, {} Hz, {:.3} s, {}",
                    stream.index,
                    stream.codec,
                    stream.channels,
                    stream.sample_rate_hz,
                    stream.duration_s,
                    stream
                        .bit_rate
                        .map_or_else(|| "unknown bit rate".to_string(), |b| format!("{} bit/s", b))
                );
            }
        }
        Commands::ValidateConfig { config } => {
            let config = TranscriptionConfig::load(config)?;
            println!("Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::ShowConfig => {
            let config = TranscriptionConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
