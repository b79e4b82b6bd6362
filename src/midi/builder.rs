// Single-track MIDI builder
// Collects absolute-tick events and serializes them as a format-0 file

use crate::midi::codec::{
    control_change_event, end_of_track_event, note_off_event, note_on_event, pitch_bend_event,
    tempo_event, write_chunk, write_header, write_vlq, CC_DATA_ENTRY_MSB, CC_RPN_LSB, CC_RPN_MSB,
    PITCH_BEND_CENTER,
};

/// A channel event at an absolute tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    PitchBend { tick: i64, value: i32 },
    NoteOff { tick: i64, key: u8 },
    NoteOn { tick: i64, key: u8, velocity: u8 },
}

impl TimedEvent {
    pub fn tick(&self) -> i64 {
        match *self {
            TimedEvent::PitchBend { tick, .. }
            | TimedEvent::NoteOff { tick, .. }
            | TimedEvent::NoteOn { tick, .. } => tick,
        }
    }

    /// Same-tick ordering: bends land first, then releases, then attacks
    fn rank(&self) -> u8 {
        match self {
            TimedEvent::PitchBend { .. } => 0,
            TimedEvent::NoteOff { .. } => 1,
            TimedEvent::NoteOn { .. } => 2,
        }
    }
}

/// Builds one `MTrk` with a tempo + pitch-bend-range prologue
///
/// Events may be added in any order; `build` sorts them stably by tick and
/// event rank so equal keys keep insertion order.
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    channel: u8,
    microseconds_per_beat: u32,
    bend_range_semitones: u8,
    events: Vec<TimedEvent>,
}

impl TrackBuilder {
    pub fn new(channel: u8) -> Self {
        TrackBuilder {
            channel: channel & 0x0F,
            microseconds_per_beat: 500_000,
            bend_range_semitones: 2,
            events: Vec::new(),
        }
    }

    pub fn tempo(mut self, microseconds_per_beat: u32) -> Self {
        self.microseconds_per_beat = microseconds_per_beat;
        self
    }

    pub fn bend_range(mut self, semitones: u8) -> Self {
        self.bend_range_semitones = semitones;
        self
    }

    pub fn note_on(&mut self, tick: i64, key: u8, velocity: u8) -> &mut Self {
        self.events.push(TimedEvent::NoteOn { tick, key, velocity });
        self
    }

    pub fn note_off(&mut self, tick: i64, key: u8) -> &mut Self {
        self.events.push(TimedEvent::NoteOff { tick, key });
        self
    }

    pub fn pitch_bend(&mut self, tick: i64, value: i32) -> &mut Self {
        self.events.push(TimedEvent::PitchBend { tick, value });
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize the track body (without the `MTrk` framing)
    pub fn build_track(&self) -> Vec<u8> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| (e.tick(), e.rank()));

        let mut body = Vec::with_capacity(16 + events.len() * 4);
        let ch = self.channel;

        write_vlq(&mut body, 0);
        body.extend_from_slice(&tempo_event(self.microseconds_per_beat));

        // RPN 0,0 (pitch-bend sensitivity) then data entry
        for (controller, value) in [
            (CC_RPN_MSB, 0),
            (CC_RPN_LSB, 0),
            (CC_DATA_ENTRY_MSB, self.bend_range_semitones),
        ] {
            write_vlq(&mut body, 0);
            body.extend_from_slice(&control_change_event(ch, controller, value));
        }

        let mut last_tick = 0i64;
        for event in &events {
            let delta = (event.tick() - last_tick).clamp(0, u32::MAX as i64) as u32;
            write_vlq(&mut body, delta);
            let bytes = match *event {
                TimedEvent::NoteOn { key, velocity, .. } => note_on_event(ch, key, velocity),
                TimedEvent::NoteOff { key, .. } => note_off_event(ch, key),
                TimedEvent::PitchBend { value, .. } => pitch_bend_event(ch, value),
            };
            body.extend_from_slice(&bytes);
            last_tick = event.tick();
        }

        write_vlq(&mut body, 0);
        body.extend_from_slice(&pitch_bend_event(ch, PITCH_BEND_CENTER as i32));
        write_vlq(&mut body, 0);
        body.extend_from_slice(&end_of_track_event());

        body
    }

    /// Serialize a complete format-0 file
    pub fn build(&self, ticks_per_beat: u16) -> Vec<u8> {
        let track = self.build_track();
        let mut out = Vec::with_capacity(22 + track.len());
        write_header(&mut out, 0, 1, ticks_per_beat);
        write_chunk(&mut out, b"MTrk", &track);
        out
    }
}
