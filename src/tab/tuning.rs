// Guitar tunings
// Pitch classes, open-string pitches, and the built-in tuning presets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard-tuning open-string MIDI pitches, low E to high E
const STANDARD_OPEN_MIDI: [u8; 6] = [40, 45, 50, 55, 59, 64];

/// Standard-tuning pitch classes, low E to high E
const STANDARD_OPEN_CLASSES: [PitchClass; 6] = [
    PitchClass::E,
    PitchClass::A,
    PitchClass::D,
    PitchClass::G,
    PitchClass::B,
    PitchClass::E,
];

/// One of the twelve chromatic pitch classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0..=11)
    pub fn semitone(&self) -> i32 {
        *self as i32
    }

    pub fn label(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Pitch class for any semitone count, wrapping negatives
    pub fn from_semitone(semitone: i32) -> Self {
        Self::ALL[semitone.rem_euclid(12) as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Open-string pitch classes for a six-string guitar, lowest string first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuning {
    pub name: String,
    pub notes: Vec<PitchClass>,
}

impl Tuning {
    pub fn new(name: impl Into<String>, notes: Vec<PitchClass>) -> Self {
        Tuning {
            name: name.into(),
            notes,
        }
    }

    /// E A D G B E
    pub fn standard() -> Self {
        use PitchClass::*;
        Tuning::new("E Standard", vec![E, A, D, G, B, E])
    }

    /// D A D G B E
    pub fn drop_d() -> Self {
        use PitchClass::*;
        Tuning::new("Drop D", vec![D, A, D, G, B, E])
    }

    /// D A D G A D
    pub fn dadgad() -> Self {
        use PitchClass::*;
        Tuning::new("DADGAD", vec![D, A, D, G, A, D])
    }

    pub fn presets() -> Vec<Tuning> {
        vec![Tuning::standard(), Tuning::drop_d(), Tuning::dadgad()]
    }

    pub fn string_count(&self) -> usize {
        self.notes.len().min(STANDARD_OPEN_MIDI.len())
    }

    /// MIDI pitch of an open string
    ///
    /// Each string sits at its standard-tuning octave, shifted by the
    /// pitch-class difference from the standard string (so Drop D's low
    /// string is 38, not 50).
    pub fn open_string_midi(&self, string: usize) -> Option<u8> {
        let note = self.notes.get(string)?;
        let standard_midi = *STANDARD_OPEN_MIDI.get(string)?;
        let diff = note.semitone() - STANDARD_OPEN_CLASSES[string].semitone();
        u8::try_from(standard_midi as i32 + diff).ok()
    }

    /// Frequency (Hz) of a fretted note, A4 = 440 Hz
    pub fn frequency(&self, string: usize, fret: u8) -> Option<f64> {
        let midi = self.open_string_midi(string)? as i32 + fret as i32;
        Some(440.0 * 2f64.powf((midi - 69) as f64 / 12.0))
    }

    /// Line label for a string in ASCII tab
    pub fn string_label(&self, string: usize) -> Option<&'static str> {
        self.notes.get(string).map(|n| n.label())
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::standard()
    }
}
