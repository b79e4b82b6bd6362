// MIDI inspection
// Parses exported bytes back with midly and summarizes what a player would see

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("Failed to parse MIDI: {0}")]
    Parse(#[from] midly::Error),

    #[error("Unsupported timing: only metrical (ticks per beat) files are supported")]
    UnsupportedTiming,
}

/// A Note-On paired with its Note-Off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectedNote {
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    pub start_tick: u64,
    pub end_tick: u64,
}

/// Summary of a parsed MIDI file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiSummary {
    /// 0, 1, or 2
    pub format: u16,
    pub track_count: usize,
    pub ticks_per_beat: u16,

    /// First tempo meta event, if any
    pub microseconds_per_beat: Option<u32>,

    /// Pitch-bend sensitivity set through RPN 0,0
    pub bend_range_semitones: Option<u8>,

    /// (absolute tick, raw 14-bit value) in file order
    pub pitch_bends: Vec<(u64, u16)>,

    /// Paired notes sorted by start tick, then key
    pub notes: Vec<InspectedNote>,

    /// Note-Ons never released
    pub unmatched_note_ons: usize,
}

/// Parse a Standard MIDI File and summarize its contents
///
/// Note-Offs pair with the oldest open Note-On of the same key and channel;
/// a Note-On with velocity 0 counts as a Note-Off.
pub fn inspect(bytes: &[u8]) -> Result<MidiSummary, MidiError> {
    let smf = Smf::parse(bytes)?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(..) => return Err(MidiError::UnsupportedTiming),
    };
    let format = match smf.header.format {
        Format::SingleTrack => 0,
        Format::Parallel => 1,
        Format::Sequential => 2,
    };

    let mut summary = MidiSummary {
        format,
        track_count: smf.tracks.len(),
        ticks_per_beat,
        microseconds_per_beat: None,
        bend_range_semitones: None,
        pitch_bends: Vec::new(),
        notes: Vec::new(),
        unmatched_note_ons: 0,
    };

    for track in &smf.tracks {
        let mut tick = 0u64;
        let mut open: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let mut rpn: (Option<u8>, Option<u8>) = (None, None);

        for event in track {
            tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us)) => {
                    summary.microseconds_per_beat.get_or_insert(us.as_int());
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open.entry((channel, key.as_int()))
                                .or_default()
                                .push_back((tick, vel.as_int()));
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let key = key.as_int();
                            if let Some((start_tick, velocity)) =
                                open.get_mut(&(channel, key)).and_then(|q| q.pop_front())
                            {
                                summary.notes.push(InspectedNote {
                                    channel,
                                    key,
                                    velocity,
                                    start_tick,
                                    end_tick: tick,
                                });
                            }
                        }
                        MidiMessage::PitchBend { bend } => {
                            summary.pitch_bends.push((tick, bend.0.as_int()));
                        }
                        MidiMessage::Controller { controller, value } => {
                            match controller.as_int() {
                                0x65 => rpn.0 = Some(value.as_int()),
                                0x64 => rpn.1 = Some(value.as_int()),
                                0x06 if rpn == (Some(0), Some(0)) => {
                                    summary.bend_range_semitones = Some(value.as_int());
                                }
                                _ => {}
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        summary.unmatched_note_ons += open.values().map(VecDeque::len).sum::<usize>();
    }

    summary
        .notes
        .sort_by_key(|n| (n.start_tick, n.key, n.channel));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::builder::TrackBuilder;

    #[test]
    fn test_fifo_pairing_and_zero_velocity_off() {
        let mut builder = TrackBuilder::new(0);
        builder
            .note_on(0, 60, 100)
            .note_on(10, 60, 90)
            .note_off(20, 60)
            .note_on(30, 60, 0);
        let summary = inspect(&builder.build(480)).unwrap();

        assert_eq!(summary.notes.len(), 2);
        assert_eq!((summary.notes[0].start_tick, summary.notes[0].end_tick), (0, 20));
        assert_eq!(summary.notes[0].velocity, 100);
        assert_eq!((summary.notes[1].start_tick, summary.notes[1].end_tick), (10, 30));
        assert_eq!(summary.unmatched_note_ons, 0);
    }

    #[test]
    fn test_unmatched_note_on_counted() {
        let mut builder = TrackBuilder::new(0);
        builder.note_on(0, 72, 100);
        let summary = inspect(&builder.build(480)).unwrap();
        assert!(summary.notes.is_empty());
        assert_eq!(summary.unmatched_note_ons, 1);
    }

    #[test]
    fn test_header_fields() {
        let summary = inspect(&TrackBuilder::new(0).tempo(400_000).bend_range(12).build(960)).unwrap();
        assert_eq!(summary.format, 0);
        assert_eq!(summary.track_count, 1);
        assert_eq!(summary.ticks_per_beat, 960);
        assert_eq!(summary.microseconds_per_beat, Some(400_000));
        assert_eq!(summary.bend_range_semitones, Some(12));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(inspect(b"not a midi file"), Err(MidiError::Parse(_))));
    }
}
