//! Example: Transcribe a single audio file
//!
//! Decodes the file given on the command line, runs the full pipeline and
//! prints the score as text.
//!
//! ```text
//! cargo run --example transcribe_file -- melody.wav
//! ```

use scorelisto::io::decode_file;
use scorelisto::{transcribe_source, Progress, TranscriptionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .ok_or("Usage: transcribe_file <audio file>")?;
    let mut source = decode_file(&path)?;

    let config = TranscriptionConfig::default();
    let result = transcribe_source(&mut source, &config, &Progress::new())?;

    let score = &result.score;
    println!("Transcription Results:");
    println!("  Duration: {:.2} s at {} Hz", result.metadata.duration_s, result.metadata.sample_rate_hz);
    println!("  Key: {} ({} fifths, {:?} clef)", result.metadata.key_name, score.fifths, score.clef);
    println!("  Meter: {}/{}", score.beats, score.beat_type);
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);

    let measure_ticks = score.beats * score.divisions;
    let mut position = 0;
    for note in &score.notes {
        if measure_ticks > 0 && position % measure_ticks == 0 {
            println!("  | measure {}", position / measure_ticks + 1);
        }
        let name = note.pitch.map_or_else(|| "rest".to_string(), |p| p.name());
        let tie = if note.rhythm.tie_start { " ~" } else { "" };
        println!(
            "    {:<5} {:?}{}{}{}",
            name,
            note.rhythm.note_type,
            if note.rhythm.dot { " dotted" } else { "" },
            if note.rhythm.triplet { " triplet" } else { "" },
            tie
        );
        position += note.rhythm.duration;
    }

    Ok(())
}
