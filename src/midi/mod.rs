// MIDI module
// Byte-level SMF codec, track builder, note export, and read-back inspection

pub mod builder;
pub mod codec;
pub mod export;
pub mod inspect;

pub use builder::{TimedEvent, TrackBuilder};
pub use export::{export_midi, export_midi_to, MidiExportOptions};
pub use inspect::{inspect, InspectedNote, MidiError, MidiSummary};
