// Fretscribe - Guitar recording to tablature and MIDI
// Module declarations and public surface

pub mod audio;
pub mod detect;
pub mod midi;
pub mod pipeline;
pub mod tab;

pub use audio::{decode_wav, DecodeError, DecodedAudio};
pub use detect::{
    Articulation, InferenceBackend, InferenceError, ModelGeometry, NoteEvent, ValidationError,
    WindowOutput,
};
pub use midi::{export_midi, inspect, MidiExportOptions, MidiSummary};
pub use pipeline::{CancellationToken, TranscribeError, Transcriber, Transcription, TranscriptionConfig};
pub use tab::{map_notes, TabEvent, TabNote, Tablature, Tuning};
