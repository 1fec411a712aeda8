//! Measure size and leading rest selection

/// Measure sizes tried, in beats
pub const MEASURE_SIZES: [u32; 3] = [3, 4, 5];

/// Beat unit of every layout (quarter note)
pub const BEAT_TYPE: u32 = 4;

/// Chosen measure layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureLayout {
    /// Beats per measure
    pub beats_per_measure: u32,
    /// One-beat rests inserted before the first combination
    pub leading_rests: u32,
    /// Indices of the combinations crossing a barline
    pub straddling: Vec<usize>,
}

/// Indices of the combinations of `beats` spanning more than one measure
/// once `leading_rests` beats are inserted before them
pub fn straddling_combinations(beats: &[u32], beats_per_measure: u32, leading_rests: u32) -> Vec<usize> {
    let mut straddling = Vec::new();
    if beats_per_measure == 0 {
        return straddling;
    }
    let mut position = leading_rests;
    for (k, &nb_beats) in beats.iter().enumerate() {
        if nb_beats > 0 {
            let first_measure = position / beats_per_measure;
            let last_measure = (position + nb_beats - 1) / beats_per_measure;
            if first_measure != last_measure {
                straddling.push(k);
            }
        }
        position += nb_beats;
    }
    straddling
}

/// Choose the measure size and leading rest count splitting the fewest
/// combinations
///
/// Candidates are tried by measure size then rest count, both ascending; the
/// first candidate with the fewest straddling combinations wins.
///
/// # Example
///
/// ```
/// use scorelisto::features::rhythm::layout::choose_layout;
///
/// // A two-beat pickup before three-beat groups
/// let layout = choose_layout(&[2, 3, 3]);
/// assert_eq!((layout.beats_per_measure, layout.leading_rests), (3, 1));
/// ```
pub fn choose_layout(beats: &[u32]) -> MeasureLayout {
    let mut best: Option<MeasureLayout> = None;
    for beats_per_measure in MEASURE_SIZES {
        for leading_rests in 0..beats_per_measure {
            let straddling = straddling_combinations(beats, beats_per_measure, leading_rests);
            let better = best
                .as_ref()
                .map_or(true, |b| straddling.len() < b.straddling.len());
            if better {
                best = Some(MeasureLayout {
                    beats_per_measure,
                    leading_rests,
                    straddling,
                });
            }
        }
    }
    let layout = best.unwrap_or(MeasureLayout {
        beats_per_measure: MEASURE_SIZES[0],
        leading_rests: 0,
        straddling: Vec::new(),
    });
    log::debug!(
        "Layout {}/{} with {} leading rests, {} combinations across barlines",
        layout.beats_per_measure,
        BEAT_TYPE,
        layout.leading_rests,
        layout.straddling.len()
    );
    layout
}
