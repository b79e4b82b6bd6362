// Tablature types
// Fretted note positions grouped into timed events

use serde::{Deserialize, Serialize};

use crate::detect::types::{Articulation, ArticulationSet};
use crate::tab::tuning::Tuning;

/// A single fretted note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabNote {
    /// String index, 0 = lowest-pitched string
    pub string: u8,

    pub fret: u8,

    pub articulations: ArticulationSet,

    /// Bend magnitude carried from the detected note (semitones)
    pub bend_semitones: f32,
}

impl TabNote {
    pub fn has(&self, articulation: Articulation) -> bool {
        self.articulations.contains(&articulation)
    }
}

/// Notes struck together (a single note or a chord)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEvent {
    pub time_ms: i64,

    /// Always at least 1
    pub duration_ms: i64,

    /// Distinct strings, in ascending pitch order of the source notes
    pub notes: Vec<TabNote>,
}

/// Complete tablature for a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tablature {
    pub tuning: Tuning,
    pub events: Vec<TabEvent>,
    pub duration_ms: i64,
}

impl Tablature {
    pub fn empty(tuning: Tuning) -> Self {
        Tablature {
            tuning,
            events: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total fretted notes across all events
    pub fn note_count(&self) -> usize {
        self.events.iter().map(|e| e.notes.len()).sum()
    }
}
