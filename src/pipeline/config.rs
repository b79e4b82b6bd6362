// Transcription configuration
// Aggregates every stage's parameters; loadable from partial JSON documents

use serde::{Deserialize, Serialize};

use crate::detect::{ArticulationConfig, ModelGeometry, NoteExtractorConfig, SchedulerConfig};
use crate::midi::MidiExportOptions;
use crate::tab::{TabMapperConfig, Tuning};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub geometry: ModelGeometry,
    pub scheduler: SchedulerConfig,
    pub notes: NoteExtractorConfig,
    pub articulation: ArticulationConfig,
    pub tab: TabMapperConfig,
    pub midi: MidiExportOptions,
    pub tuning: Tuning,

    /// Produce MIDI bytes as part of the run
    pub export_midi: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        TranscriptionConfig {
            geometry: ModelGeometry::default(),
            scheduler: SchedulerConfig::default(),
            notes: NoteExtractorConfig::default(),
            articulation: ArticulationConfig::default(),
            tab: TabMapperConfig::default(),
            midi: MidiExportOptions::default(),
            tuning: Tuning::standard(),
            export_midi: true,
        }
    }
}

impl TranscriptionConfig {
    /// Parse a JSON document; fields it omits keep their defaults
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::PitchClass;

    #[test]
    fn test_defaults() {
        let config = TranscriptionConfig::default();
        assert_eq!(config.geometry.window_samples, 43_844);
        assert_eq!(config.notes.note_threshold, 0.5);
        assert_eq!(config.tab.max_fret, 22);
        assert_eq!(config.midi.ticks_per_beat, 480);
        assert!(config.export_midi);
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = br#"{
            "notes": { "onset_threshold": 0.4 },
            "tuning": { "name": "Drop D", "notes": ["D", "A", "D", "G", "B", "E"] },
            "export_midi": false
        }"#;
        let config = TranscriptionConfig::from_json_bytes(json).unwrap();

        assert_eq!(config.notes.onset_threshold, 0.4);
        assert_eq!(config.notes.note_threshold, 0.5);
        assert_eq!(config.tuning.notes[0], PitchClass::D);
        assert!(!config.export_midi);
        assert_eq!(config.articulation, ArticulationConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = TranscriptionConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(TranscriptionConfig::from_json_bytes(json.as_bytes()).unwrap(), config);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(TranscriptionConfig::from_json_bytes(b"{ \"notes\": 3 }").is_err());
    }
}
