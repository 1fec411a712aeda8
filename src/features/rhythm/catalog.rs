//! Catalog of notatable combinations
//!
//! A combination is one way to write a fixed number of notes and rests over a
//! fixed number of beats. Names read left to right: `EN` eighth note, `SN`
//! sixteenth, `QN` quarter, `HN` half, a leading `D` dots the value, `R`
//! replaces `N` for rests, `T_` marks a triplet and `-` joins tied values.

use super::{
    BeamOption, Beams, LENGTH_16TH, LENGTH_EIGHTH, LENGTH_HALF, LENGTH_QUARTER, LENGTH_T_16TH,
    LENGTH_T_EIGHTH, LENGTH_WHOLE,
};
use crate::error::{Result, TranscriptionError};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Combination used for leading and filler rests
pub const FILLER_REST: &str = "1REST_1BEAT";

/// Largest beat count of a combination
pub const MAX_BEATS: u32 = 8;

/// Largest element count of a combination
pub const MAX_NOTES: usize = 4;

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combination {
    /// Element durations in ticks
    pub durations: &'static [u32],
    /// `true` for notes, `false` for rests
    pub types: &'static [bool],
    /// Beam marks per element
    pub beams: &'static [&'static [(u8, BeamOption)]],
    /// Beats spanned
    pub nb_beats: u32,
    /// Triplet group
    pub triplet: bool,
}

impl Combination {
    /// Element count
    pub fn nb_notes(&self) -> usize {
        self.durations.len()
    }

    /// Sum of the element durations
    pub fn total_ticks(&self) -> u32 {
        self.durations.iter().sum()
    }

    /// Beam marks of element `k`
    pub fn beams_at(&self, k: usize) -> Beams {
        self.beams
            .get(k)
            .map(|marks| marks.iter().copied().collect())
            .unwrap_or_default()
    }
}

const B: BeamOption = BeamOption::Begin;
const C: BeamOption = BeamOption::Continue;
const E: BeamOption = BeamOption::End;

const NO_BEAM: &[(u8, BeamOption)] = &[];
const TRIPLET_BEAMS: &[&[(u8, BeamOption)]] = &[&[(1, B)], &[(1, C)], &[(1, E)]];
const DOTTED_SN_SN_BEAMS: &[&[(u8, BeamOption)]] =
    &[NO_BEAM, &[(1, B), (2, B)], &[(1, E), (2, E)]];

const fn single(durations: &'static [u32], note: bool, nb_beats: u32) -> Combination {
    Combination {
        durations,
        types: if note { &[true] } else { &[false] },
        beams: &[NO_BEAM],
        nb_beats,
        triplet: false,
    }
}

const fn pair(durations: &'static [u32], types: &'static [bool], nb_beats: u32) -> Combination {
    Combination {
        durations,
        types,
        beams: &[NO_BEAM, NO_BEAM],
        nb_beats,
        triplet: false,
    }
}

const fn triplet(durations: &'static [u32]) -> Combination {
    Combination {
        durations,
        types: &[true, true, true],
        beams: TRIPLET_BEAMS,
        nb_beats: 1,
        triplet: true,
    }
}

const QN: u32 = LENGTH_QUARTER;
const EN: u32 = LENGTH_EIGHTH;
const SN: u32 = LENGTH_16TH;
const TEN: u32 = LENGTH_T_EIGHTH;
const TSN: u32 = LENGTH_T_16TH;
const DHN: u32 = LENGTH_HALF + LENGTH_QUARTER;
const DQN: u32 = LENGTH_QUARTER + LENGTH_EIGHTH;
const QN_DQN: u32 = LENGTH_HALF + LENGTH_EIGHTH;
const HN_DQN: u32 = LENGTH_HALF + LENGTH_QUARTER + LENGTH_EIGHTH;

const ENTRIES: &[(&str, Combination)] = &[
    // One element
    ("1NOTE_1BEAT", single(&[QN], true, 1)),
    ("1REST_1BEAT", single(&[QN], false, 1)),
    ("1NOTE_2BEATS", single(&[LENGTH_HALF], true, 2)),
    ("1REST_2BEATS", single(&[LENGTH_HALF], false, 2)),
    ("1NOTE_3BEATS", single(&[DHN], true, 3)),
    ("1REST_3BEATS", single(&[DHN], false, 3)),
    ("1NOTE_4BEATS", single(&[LENGTH_WHOLE], true, 4)),
    ("1REST_4BEATS", single(&[LENGTH_WHOLE], false, 4)),
    ("1NOTE_5BEATS", single(&[LENGTH_WHOLE + QN], true, 5)),
    ("1REST_5BEATS", single(&[LENGTH_WHOLE + QN], false, 5)),
    ("1NOTE_6BEATS", single(&[LENGTH_WHOLE + LENGTH_HALF], true, 6)),
    ("1REST_6BEATS", single(&[LENGTH_WHOLE + LENGTH_HALF], false, 6)),
    ("1NOTE_7BEATS", single(&[LENGTH_WHOLE + DHN], true, 7)),
    ("1REST_7BEATS", single(&[LENGTH_WHOLE + DHN], false, 7)),
    ("1NOTE_8BEATS", single(&[2 * LENGTH_WHOLE], true, 8)),
    ("1REST_8BEATS", single(&[2 * LENGTH_WHOLE], false, 8)),
    // Two elements
    (
        "EN_EN",
        Combination {
            durations: &[EN, EN],
            types: &[true, true],
            beams: &[&[(1, B)], &[(1, E)]],
            nb_beats: 1,
            triplet: false,
        },
    ),
    ("ER_EN", pair(&[EN, EN], &[false, true], 1)),
    ("EN_ER", pair(&[EN, EN], &[true, false], 1)),
    ("DEN_SN", pair(&[EN + SN, SN], &[true, true], 1)),
    ("SN_DEN", pair(&[SN, EN + SN], &[true, true], 1)),
    ("DQN_EN", pair(&[DQN, EN], &[true, true], 2)),
    ("QR-ER_EN", pair(&[DQN, EN], &[false, true], 2)),
    ("DQN_ER", pair(&[DQN, EN], &[true, false], 2)),
    ("EN_EN-QN", pair(&[EN, DQN], &[true, true], 2)),
    ("QN-DQN_EN", pair(&[QN_DQN, EN], &[true, true], 3)),
    ("QR-QR-ER_EN", pair(&[QN_DQN, EN], &[false, true], 3)),
    ("QN-DQN_ER", pair(&[QN_DQN, EN], &[true, false], 3)),
    ("EN_EN-HN", pair(&[EN, QN_DQN], &[true, true], 3)),
    ("HN-DQN_EN", pair(&[HN_DQN, EN], &[true, true], 4)),
    ("QR-QR-QR-ER_EN", pair(&[HN_DQN, EN], &[false, true], 4)),
    ("HN-DQN_ER", pair(&[HN_DQN, EN], &[true, false], 4)),
    ("EN_EN-DHN", pair(&[EN, HN_DQN], &[true, true], 4)),
    // Three elements
    (
        "EN_SN_SN",
        Combination {
            durations: &[EN, SN, SN],
            types: &[true, true, true],
            beams: &[&[(1, B)], &[(1, C), (2, B)], &[(1, E), (2, E)]],
            nb_beats: 1,
            triplet: false,
        },
    ),
    (
        "ER_SN_SN",
        Combination {
            durations: &[EN, SN, SN],
            types: &[false, true, true],
            beams: &[NO_BEAM, &[(1, B), (2, B)], &[(1, E), (2, E)]],
            nb_beats: 1,
            triplet: false,
        },
    ),
    (
        "SN_SN_EN",
        Combination {
            durations: &[SN, SN, EN],
            types: &[true, true, true],
            beams: &[&[(1, B), (2, B)], &[(1, C), (2, E)], &[(1, E)]],
            nb_beats: 1,
            triplet: false,
        },
    ),
    (
        "SN_SN_ER",
        Combination {
            durations: &[SN, SN, EN],
            types: &[true, true, false],
            beams: &[&[(1, B), (2, B)], &[(1, E), (2, E)], NO_BEAM],
            nb_beats: 1,
            triplet: false,
        },
    ),
    (
        "SN_EN_SN",
        Combination {
            durations: &[SN, EN, SN],
            types: &[true, true, true],
            beams: TRIPLET_BEAMS,
            nb_beats: 1,
            triplet: false,
        },
    ),
    ("T_EN_EN_EN", triplet(&[TEN, TEN, TEN])),
    ("T_EN_DEN_SN", triplet(&[TEN, EN, TSN])),
    ("T_EN_SN_DEN", triplet(&[TEN, TSN, EN])),
    ("T_SN_EN_DEN", triplet(&[TSN, TEN, EN])),
    ("T_SN_DEN_EN", triplet(&[TSN, EN, TEN])),
    ("T_DEN_EN_SN", triplet(&[EN, TEN, TSN])),
    ("T_DEN_SN_EN", triplet(&[EN, TSN, TEN])),
    (
        "EN_QN_EN",
        Combination {
            durations: &[EN, QN, EN],
            types: &[true, true, true],
            beams: &[NO_BEAM, NO_BEAM, NO_BEAM],
            nb_beats: 2,
            triplet: false,
        },
    ),
    (
        "DQN_SN_SN",
        Combination {
            durations: &[DQN, SN, SN],
            types: &[true, true, true],
            beams: DOTTED_SN_SN_BEAMS,
            nb_beats: 2,
            triplet: false,
        },
    ),
    (
        "QN-DQN_SN_SN",
        Combination {
            durations: &[QN_DQN, SN, SN],
            types: &[true, true, true],
            beams: DOTTED_SN_SN_BEAMS,
            nb_beats: 3,
            triplet: false,
        },
    ),
    (
        "HN-DQN_SN_SN",
        Combination {
            durations: &[HN_DQN, SN, SN],
            types: &[true, true, true],
            beams: DOTTED_SN_SN_BEAMS,
            nb_beats: 4,
            triplet: false,
        },
    ),
    // Four elements
    (
        "SN_SN_SN_SN",
        Combination {
            durations: &[SN, SN, SN, SN],
            types: &[true, true, true, true],
            beams: &[
                &[(1, B), (2, B)],
                &[(1, C), (2, C)],
                &[(1, C), (2, C)],
                &[(1, E), (2, E)],
            ],
            nb_beats: 1,
            triplet: false,
        },
    ),
];

/// All combinations, ordered by name
pub fn catalog() -> &'static BTreeMap<&'static str, Combination> {
    static CATALOG: OnceLock<BTreeMap<&'static str, Combination>> = OnceLock::new();
    CATALOG.get_or_init(|| ENTRIES.iter().copied().collect())
}

/// Look up a combination by name
///
/// # Errors
///
/// Returns `InternalError` for an unknown name
pub fn get(name: &str) -> Result<&'static Combination> {
    catalog()
        .get(name)
        .ok_or_else(|| TranscriptionError::InternalError(format!("Unknown combination {}", name)))
}
