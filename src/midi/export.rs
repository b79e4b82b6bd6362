// MIDI export
// Turns detected notes into a single-track file, rendering vibrato and bends
// as pitch-bend curves

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::io::Write;

use crate::detect::types::{Articulation, NoteEvent};
use crate::midi::builder::TrackBuilder;
use crate::midi::codec::PITCH_BEND_CENTER;

/// MIDI export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note
    pub ticks_per_beat: u16,

    pub bpm: u32,

    /// Pitch-bend sensitivity written to the RPN prologue (semitones)
    pub bend_range_semitones: u8,

    /// Spacing of vibrato pitch-bend samples (ticks)
    pub vibrato_resolution_ticks: u32,

    /// Steps per bend ramp
    pub bend_steps: u32,

    pub channel: u8,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ticks_per_beat: 480,
            bpm: 120,
            bend_range_semitones: 2,
            vibrato_resolution_ticks: 10,
            bend_steps: 16,
            channel: 0,
        }
    }
}

impl MidiExportOptions {
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_beat as f64 * self.bpm as f64 / 60.0
    }

    pub fn microseconds_per_beat(&self) -> u32 {
        60_000_000 / self.bpm.max(1)
    }

    fn bend_units(&self, semitones: f32) -> i64 {
        (semitones / self.bend_range_semitones.max(1) as f32 * PITCH_BEND_CENTER as f32) as i64
    }
}

/// Export notes to Standard MIDI File bytes
///
/// Output depends only on the notes and options, so identical input yields
/// identical bytes.
pub fn export_midi(notes: &[NoteEvent], options: &MidiExportOptions) -> Vec<u8> {
    let ticks_per_second = options.ticks_per_second();
    let mut track = TrackBuilder::new(options.channel)
        .tempo(options.microseconds_per_beat())
        .bend_range(options.bend_range_semitones);

    for note in notes {
        let start_tick = (note.start_time_sec * ticks_per_second) as i64;
        let end_tick = (note.end_time_sec * ticks_per_second) as i64;
        let velocity = ((note.confidence * 100.0 + 27.0) as i32).clamp(1, 127) as u8;

        track.note_on(start_tick, note.midi_pitch, velocity);
        track.note_off(end_tick, note.midi_pitch);

        if note.has(Articulation::Vibrato) && note.vibrato_rate_hz > 0.0 {
            vibrato_curve(&mut track, start_tick, end_tick, note, ticks_per_second, options);
        } else if note.bend_semitones > 0.0 {
            // Set order puts BendUp ahead of BendRelease
            match note.articulations.iter().copied().find(Articulation::is_bend) {
                Some(Articulation::BendUp) => {
                    bend_up_curve(&mut track, start_tick, end_tick, note.bend_semitones, options)
                }
                Some(Articulation::BendRelease) => {
                    bend_release_curve(&mut track, start_tick, end_tick, note.bend_semitones, options)
                }
                _ => {}
            }
        }
    }

    let bytes = track.build(options.ticks_per_beat);
    log::debug!(
        "Exported {} notes to MIDI ({} events, {} bytes)",
        notes.len(),
        track.len(),
        bytes.len()
    );
    bytes
}

/// Export and write to any sink, flushing afterwards
pub fn export_midi_to<W: Write>(
    notes: &[NoteEvent],
    options: &MidiExportOptions,
    writer: &mut W,
) -> std::io::Result<()> {
    writer.write_all(&export_midi(notes, options))?;
    writer.flush()
}

/// Sinusoidal bend sampled every `vibrato_resolution_ticks`, recentred at note end
fn vibrato_curve(
    track: &mut TrackBuilder,
    start_tick: i64,
    end_tick: i64,
    note: &NoteEvent,
    ticks_per_second: f64,
    options: &MidiExportOptions,
) {
    let center = PITCH_BEND_CENTER as i64;
    let period_ticks = ((ticks_per_second / note.vibrato_rate_hz as f64) as i64).max(1);
    let amplitude = options.bend_units(note.vibrato_depth_cents / 200.0);
    let step = options.vibrato_resolution_ticks.max(1) as i64;

    let mut tick = start_tick;
    while tick < end_tick {
        let phase = (tick - start_tick) as f64 / period_ticks as f64 * 2.0 * PI;
        let offset = (phase.sin() * amplitude as f64).round() as i64;
        track.pitch_bend(tick, (center + offset) as i32);
        tick += step;
    }
    track.pitch_bend(end_tick, center as i32);
}

/// Linear ramp from centre to the full bend across the note
fn bend_up_curve(
    track: &mut TrackBuilder,
    start_tick: i64,
    end_tick: i64,
    semitones: f32,
    options: &MidiExportOptions,
) {
    let steps = options.bend_steps.max(1) as i64;
    let duration = end_tick - start_tick;
    let max_bend = options.bend_units(semitones);
    let center = PITCH_BEND_CENTER as i64;

    for i in 0..=steps {
        let tick = start_tick + duration * i / steps;
        track.pitch_bend(tick, (center + max_bend * i / steps) as i32);
    }
}

/// Ramp up to the midpoint, then back down to centre at note end
fn bend_release_curve(
    track: &mut TrackBuilder,
    start_tick: i64,
    end_tick: i64,
    semitones: f32,
    options: &MidiExportOptions,
) {
    let mid_tick = (start_tick + end_tick) / 2;
    bend_up_curve(track, start_tick, mid_tick, semitones, options);

    let steps = options.bend_steps.max(1) as i64;
    let duration = end_tick - mid_tick;
    let max_bend = options.bend_units(semitones);
    let center = PITCH_BEND_CENTER as i64;

    for i in 0..=steps {
        let tick = mid_tick + duration * i / steps;
        track.pitch_bend(tick, (center + max_bend - max_bend * i / steps) as i32);
    }
}
