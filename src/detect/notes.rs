// Note event extraction
// Per-pitch hysteresis over note/onset posteriors: a note starts when the
// note posterior rises above threshold, splits on a fresh onset spike while
// sounding, and ends when the posterior falls back to or below threshold

use serde::{Deserialize, Serialize};

use crate::detect::frames::FrameSet;
use crate::detect::inference::ModelGeometry;
use crate::detect::types::NoteEvent;

/// Thresholds for turning posteriors into discrete notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteExtractorConfig {
    /// Note posterior must exceed this to start or sustain a note
    pub note_threshold: f32,

    /// Onset posterior above this while sounding splits the note
    pub onset_threshold: f32,

    /// Notes shorter than this are discarded (seconds)
    pub min_note_duration_sec: f64,
}

impl Default for NoteExtractorConfig {
    fn default() -> Self {
        NoteExtractorConfig {
            note_threshold: 0.5,
            onset_threshold: 0.3,
            min_note_duration_sec: 0.05,
        }
    }
}

/// Hysteresis state for a single pitch row
#[derive(Debug, Clone, Copy, PartialEq)]
enum PitchState {
    Inactive,
    Active { start_frame: usize, peak: f32 },
}

/// Extract note events from every pitch row, sorted by start time
///
/// Pitches are tracked independently; ties in start time keep ascending
/// pitch order.
pub fn extract_notes(
    frames: &FrameSet,
    geometry: &ModelGeometry,
    config: &NoteExtractorConfig,
) -> Vec<NoteEvent> {
    if frames.is_empty() {
        return Vec::new();
    }

    let n_pitches = frames.note_frames()[0].len();
    let mut notes = Vec::new();

    for pitch_index in 0..n_pitches {
        let midi_pitch = geometry.midi_for_index(pitch_index);
        notes.extend(
            track_pitch(frames, pitch_index, config)
                .into_iter()
                .filter_map(|(start, end, peak)| {
                    frames_to_note(midi_pitch, start, end, peak, frames.frames_per_second(), config)
                }),
        );
    }

    notes.sort_by(|a, b| a.start_time_sec.total_cmp(&b.start_time_sec));
    notes
}

/// Run the state machine over one pitch row
/// Returns (start_frame, end_frame, peak_confidence) spans, end exclusive
fn track_pitch(
    frames: &FrameSet,
    pitch_index: usize,
    config: &NoteExtractorConfig,
) -> Vec<(usize, usize, f32)> {
    let note_frames = frames.note_frames();
    let onset_frames = frames.onset_frames();
    let mut spans = Vec::new();
    let mut state = PitchState::Inactive;

    for t in 0..note_frames.len() {
        let note_prob = note_frames[t][pitch_index];
        let onset_prob = onset_frames[t][pitch_index];
        let sounding = note_prob > config.note_threshold;

        state = match state {
            PitchState::Inactive if sounding => PitchState::Active {
                start_frame: t,
                peak: note_prob,
            },
            PitchState::Inactive => PitchState::Inactive,
            PitchState::Active { start_frame, peak }
                if sounding && onset_prob > config.onset_threshold =>
            {
                spans.push((start_frame, t, peak));
                PitchState::Active {
                    start_frame: t,
                    peak: note_prob,
                }
            }
            PitchState::Active { start_frame, peak } if sounding => PitchState::Active {
                start_frame,
                peak: peak.max(note_prob),
            },
            PitchState::Active { start_frame, peak } => {
                spans.push((start_frame, t, peak));
                PitchState::Inactive
            }
        };
    }

    if let PitchState::Active { start_frame, peak } = state {
        spans.push((start_frame, note_frames.len(), peak));
    }

    spans
}

/// Convert a frame span to a timed note, applying the minimum-duration filter
fn frames_to_note(
    midi_pitch: u8,
    start_frame: usize,
    end_frame: usize,
    peak: f32,
    frames_per_second: f64,
    config: &NoteExtractorConfig,
) -> Option<NoteEvent> {
    if end_frame <= start_frame || frames_per_second <= 0.0 {
        return None;
    }

    let start_sec = start_frame as f64 / frames_per_second;
    let end_sec = end_frame as f64 / frames_per_second;
    if end_sec - start_sec < config.min_note_duration_sec {
        return None;
    }

    Some(NoteEvent::new(midi_pitch, start_sec, end_sec, peak))
}
