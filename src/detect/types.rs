// Note detection types
// Defines articulation classes and the note event hand-off structure

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Expressive technique detected on a single note
/// Ordered so that articulation sets iterate (and serialize) deterministically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Articulation {
    /// Periodic pitch oscillation around the fretted pitch
    Vibrato,

    /// Pitch pushed up and held
    BendUp,

    /// Pitch pushed up, then released back down
    BendRelease,

    /// Pitch glides up into the note
    SlideUp,

    /// Pitch glides down into the note
    SlideDown,

    /// Legato note sounded by fretting a higher pitch without picking
    HammerOn,

    /// Legato note sounded by lifting to a lower pitch without picking
    PullOff,
}

impl Articulation {
    /// All articulations in display order
    pub const ALL: [Articulation; 7] = [
        Articulation::Vibrato,
        Articulation::BendUp,
        Articulation::BendRelease,
        Articulation::SlideUp,
        Articulation::SlideDown,
        Articulation::HammerOn,
        Articulation::PullOff,
    ];

    /// Tablature symbol for this articulation
    pub fn symbol(&self) -> &'static str {
        match self {
            Articulation::Vibrato => "~",
            Articulation::BendUp => "b",
            Articulation::BendRelease => "br",
            Articulation::SlideUp => "/",
            Articulation::SlideDown => "\\",
            Articulation::HammerOn => "h",
            Articulation::PullOff => "p",
        }
    }

    /// Human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Articulation::Vibrato => "Vibrato",
            Articulation::BendUp => "Bend",
            Articulation::BendRelease => "Bend & release",
            Articulation::SlideUp => "Slide up",
            Articulation::SlideDown => "Slide down",
            Articulation::HammerOn => "Hammer-on",
            Articulation::PullOff => "Pull-off",
        }
    }

    /// True for the two pitch-bend shaped articulations
    pub fn is_bend(&self) -> bool {
        matches!(self, Articulation::BendUp | Articulation::BendRelease)
    }
}

/// Set of articulations carried by one note
pub type ArticulationSet = BTreeSet<Articulation>;

/// Articulation metadata for a single note
/// Produced by the articulation analyzer, merged into a [`NoteEvent`] exactly once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteArticulations {
    pub articulations: ArticulationSet,

    /// Bend magnitude in semitones (0 when no bend was detected)
    pub bend_semitones: f32,

    /// Vibrato rate in Hz (0 when no vibrato was detected)
    pub vibrato_rate_hz: f32,

    /// Vibrato peak-to-trough depth in cents (0 when no vibrato was detected)
    pub vibrato_depth_cents: f32,
}

/// A detected note with timing, confidence, and expressive metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI pitch [0, 127]
    pub midi_pitch: u8,

    /// Onset time in seconds from start of audio
    pub start_time_sec: f64,

    /// Release time in seconds from start of audio (always > start)
    pub end_time_sec: f64,

    /// Peak note posterior over the note's lifetime [0.0, 1.0]
    pub confidence: f32,

    #[serde(default)]
    pub articulations: ArticulationSet,

    #[serde(default)]
    pub bend_semitones: f32,

    #[serde(default)]
    pub vibrato_rate_hz: f32,

    #[serde(default)]
    pub vibrato_depth_cents: f32,
}

impl NoteEvent {
    /// Create a plain note without articulation metadata
    pub fn new(midi_pitch: u8, start_time_sec: f64, end_time_sec: f64, confidence: f32) -> Self {
        NoteEvent {
            midi_pitch: midi_pitch.min(127),
            start_time_sec,
            end_time_sec,
            confidence: confidence.clamp(0.0, 1.0),
            articulations: ArticulationSet::new(),
            bend_semitones: 0.0,
            vibrato_rate_hz: 0.0,
            vibrato_depth_cents: 0.0,
        }
    }

    /// Note length in seconds
    pub fn duration_sec(&self) -> f64 {
        self.end_time_sec - self.start_time_sec
    }

    /// Check whether this note carries an articulation
    pub fn has(&self, articulation: Articulation) -> bool {
        self.articulations.contains(&articulation)
    }

    /// Return this note enriched with analyzer output
    pub fn with_articulations(self, info: NoteArticulations) -> Self {
        NoteEvent {
            articulations: info.articulations,
            bend_semitones: info.bend_semitones,
            vibrato_rate_hz: info.vibrato_rate_hz,
            vibrato_depth_cents: info.vibrato_depth_cents,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_articulation_symbols() {
        let symbols: Vec<&str> = Articulation::ALL.iter().map(|a| a.symbol()).collect();
        assert_eq!(symbols, vec!["~", "b", "br", "/", "\\", "h", "p"]);
    }

    #[test]
    fn test_display_names_and_bend_kinds() {
        let names: Vec<&str> = Articulation::ALL.iter().map(|a| a.display_name()).collect();
        assert_eq!(
            names,
            vec!["Vibrato", "Bend", "Bend & release", "Slide up", "Slide down", "Hammer-on", "Pull-off"]
        );

        let bends: Vec<Articulation> = Articulation::ALL.iter().copied().filter(Articulation::is_bend).collect();
        assert_eq!(bends, vec![Articulation::BendUp, Articulation::BendRelease]);
    }

    #[test]
    fn test_articulation_set_is_ordered() {
        let mut set = ArticulationSet::new();
        set.insert(Articulation::PullOff);
        set.insert(Articulation::Vibrato);
        set.insert(Articulation::BendUp);

        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Articulation::Vibrato, Articulation::BendUp, Articulation::PullOff]
        );
    }

    #[test]
    fn test_note_creation_clamps() {
        let note = NoteEvent::new(200, 0.0, 0.5, 1.7);
        assert_eq!(note.midi_pitch, 127);
        assert_eq!(note.confidence, 1.0);
        assert!(note.articulations.is_empty());
        assert!((note.duration_sec() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_with_articulations() {
        let mut arts = ArticulationSet::new();
        arts.insert(Articulation::Vibrato);
        let info = NoteArticulations {
            articulations: arts,
            bend_semitones: 0.0,
            vibrato_rate_hz: 5.5,
            vibrato_depth_cents: 30.0,
        };

        let note = NoteEvent::new(64, 1.0, 2.0, 0.8).with_articulations(info);
        assert!(note.has(Articulation::Vibrato));
        assert!(!note.has(Articulation::BendUp));
        assert_eq!(note.vibrato_rate_hz, 5.5);
        assert_eq!(note.start_time_sec, 1.0);
    }

    #[test]
    fn test_note_json_round_trip() {
        let note = NoteEvent::new(60, 0.25, 0.75, 0.9);
        let json = serde_json::to_string(&note).unwrap();
        let parsed: NoteEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(note, parsed);
    }
}
