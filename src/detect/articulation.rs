// Articulation analysis
// Follows each note's fine pitch through the contour frames and classifies
// vibrato, bends, slides, and legato (hammer-on / pull-off) technique

use serde::{Deserialize, Serialize};

use crate::detect::frames::FrameSet;
use crate::detect::inference::ModelGeometry;
use crate::detect::types::{Articulation, ArticulationSet, NoteArticulations, NoteEvent};

/// Thresholds for articulation classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticulationConfig {
    /// Contour bins on either side of the note's centre bin used for the centroid
    pub centroid_radius: usize,

    /// Minimum peak-to-trough depth for vibrato (cents)
    pub vibrato_min_depth_cents: f32,

    /// Accepted vibrato rate range (Hz)
    pub vibrato_min_rate_hz: f32,
    pub vibrato_max_rate_hz: f32,

    /// Minimum pitch-track length for vibrato (frames)
    pub vibrato_min_frames: usize,

    /// Minimum rise for a bend (cents)
    pub bend_min_cents: f32,

    /// Minimum pitch change across the note's attack for a slide (cents)
    pub slide_min_cents: f32,

    /// Frames at the start of the note inspected for a slide
    pub slide_max_frames: usize,

    /// Onset posterior at or below which a note may be legato
    pub legato_onset_threshold: f32,

    /// Maximum silence between the previous note and a legato note (seconds)
    pub legato_max_gap_sec: f64,
}

impl Default for ArticulationConfig {
    fn default() -> Self {
        ArticulationConfig {
            centroid_radius: 4,
            vibrato_min_depth_cents: 15.0,
            vibrato_min_rate_hz: 3.5,
            vibrato_max_rate_hz: 9.0,
            vibrato_min_frames: 12,
            bend_min_cents: 40.0,
            slide_min_cents: 80.0,
            slide_max_frames: 8,
            legato_onset_threshold: 0.2,
            legato_max_gap_sec: 0.08,
        }
    }
}

/// Detected vibrato parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    pub rate_hz: f32,
    pub depth_cents: f32,
}

/// Detected bend shape and magnitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bend {
    pub semitones: f32,

    /// True when the pitch comes back down after the peak
    pub released: bool,
}

impl Bend {
    pub fn articulation(&self) -> Articulation {
        if self.released {
            Articulation::BendRelease
        } else {
            Articulation::BendUp
        }
    }
}

/// Analyze every note against the contour and onset frames
///
/// `notes` must be sorted by start time; legato detection compares each note
/// with its predecessor in that order. Returns one entry per note.
pub fn analyze_articulations(
    notes: &[NoteEvent],
    frames: &FrameSet,
    geometry: &ModelGeometry,
    config: &ArticulationConfig,
) -> Vec<NoteArticulations> {
    if frames.is_empty() {
        return vec![NoteArticulations::default(); notes.len()];
    }

    let fps = frames.frames_per_second();
    let contour = frames.contour_frames();

    notes
        .iter()
        .enumerate()
        .map(|(idx, note)| {
            let (start_frame, end_frame) = note_frame_span(note, fps, contour.len());
            let track = extract_pitch_track(
                contour,
                start_frame,
                end_frame,
                geometry.center_bin(note.midi_pitch),
                config.centroid_radius,
                geometry.cents_per_bin(),
            );

            let mut info = NoteArticulations::default();
            let mut articulations = ArticulationSet::new();

            if let Some(vibrato) = detect_vibrato(&track, fps, config) {
                articulations.insert(Articulation::Vibrato);
                info.vibrato_rate_hz = vibrato.rate_hz;
                info.vibrato_depth_cents = vibrato.depth_cents;
            }

            if let Some(bend) = detect_bend(&track, config) {
                articulations.insert(bend.articulation());
                info.bend_semitones = bend.semitones;
            }

            if let Some(slide) = detect_slide(&track, config) {
                articulations.insert(slide);
            }

            if let Some(legato) = detect_legato(notes, idx, frames, geometry, config) {
                articulations.insert(legato);
            }

            info.articulations = articulations;
            info
        })
        .collect()
}

/// Analyze and merge articulation metadata into the notes
pub fn apply_articulations(
    notes: Vec<NoteEvent>,
    frames: &FrameSet,
    geometry: &ModelGeometry,
    config: &ArticulationConfig,
) -> Vec<NoteEvent> {
    let infos = analyze_articulations(&notes, frames, geometry, config);
    notes
        .into_iter()
        .zip(infos)
        .map(|(note, info)| note.with_articulations(info))
        .collect()
}

/// Frame range [start, end) covered by a note, clamped to the available frames
fn note_frame_span(note: &NoteEvent, fps: f64, n_frames: usize) -> (usize, usize) {
    let last = n_frames.saturating_sub(1);
    let start = ((note.start_time_sec * fps).round().max(0.0) as usize).min(last);
    let end = ((note.end_time_sec * fps).round().max(0.0) as usize).clamp(start + 1, n_frames.max(start + 1));
    (start, end)
}

/// Pitch offset (cents) from the note's centre bin for each frame
///
/// Each value is the energy-weighted centroid of the contour within
/// `radius` bins of `center_bin`. Frames with no energy report 0.
pub fn extract_pitch_track(
    contour: &[Vec<f32>],
    start_frame: usize,
    end_frame: usize,
    center_bin: i64,
    radius: usize,
    cents_per_bin: f32,
) -> Vec<f32> {
    let end_frame = end_frame.min(contour.len());
    if start_frame >= end_frame {
        return Vec::new();
    }

    contour[start_frame..end_frame]
        .iter()
        .map(|frame| {
            let lo = (center_bin - radius as i64).max(0);
            let hi = (center_bin + radius as i64).min(frame.len() as i64 - 1);

            let mut sum_weight = 0.0f32;
            let mut sum_weighted_pos = 0.0f32;
            for bin in lo..=hi {
                let w = frame[bin as usize];
                sum_weight += w;
                sum_weighted_pos += w * (bin - center_bin) as f32;
            }

            if sum_weight > 1e-6 {
                sum_weighted_pos / sum_weight * cents_per_bin
            } else {
                0.0
            }
        })
        .collect()
}

/// Detect periodic pitch oscillation
///
/// The track is detrended by its mean; depth is peak-to-trough and rate is
/// half the zero-crossing count scaled to Hz.
pub fn detect_vibrato(track: &[f32], frames_per_second: f64, config: &ArticulationConfig) -> Option<Vibrato> {
    if track.len() < config.vibrato_min_frames || track.is_empty() {
        return None;
    }

    let mean = mean(track);
    let detrended: Vec<f32> = track.iter().map(|v| v - mean).collect();

    let peak = detrended.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let trough = detrended.iter().copied().fold(f32::INFINITY, f32::min);
    let depth = peak - trough;
    if depth < config.vibrato_min_depth_cents {
        return None;
    }

    let crossings = detrended
        .windows(2)
        .filter(|w| (w[0] <= 0.0 && w[1] > 0.0) || (w[0] >= 0.0 && w[1] < 0.0))
        .count();
    let rate_hz = (crossings as f32 / 2.0) * frames_per_second as f32 / detrended.len() as f32;
    if rate_hz < config.vibrato_min_rate_hz || rate_hz > config.vibrato_max_rate_hz {
        return None;
    }

    Some(Vibrato {
        rate_hz,
        depth_cents: depth,
    })
}

/// Detect a bend by comparing first-quarter, middle-half, and last-quarter means
pub fn detect_bend(track: &[f32], config: &ArticulationConfig) -> Option<Bend> {
    if track.len() < 4 {
        return None;
    }

    let len = track.len();
    let quarter = len / 4;
    let edge = quarter.max(1);

    let start_avg = mean(&track[..edge]);
    let mid_avg = mean(&track[quarter..(quarter + len / 2).min(len)]);
    let end_avg = mean(&track[len - edge..]);

    let rise = mid_avg - start_avg;
    let fall = mid_avg - end_avg;
    if rise > config.bend_min_cents && fall > config.bend_min_cents {
        return Some(Bend {
            semitones: rise / 100.0,
            released: true,
        });
    }

    let total_rise = end_avg - start_avg;
    if total_rise > config.bend_min_cents {
        return Some(Bend {
            semitones: total_rise / 100.0,
            released: false,
        });
    }

    None
}

/// Detect a pitch glide across the note's first frames
pub fn detect_slide(track: &[f32], config: &ArticulationConfig) -> Option<Articulation> {
    if track.len() < 3 {
        return None;
    }

    let attack = &track[..config.slide_max_frames.clamp(1, track.len())];
    let shift = attack[attack.len() - 1] - attack[0];
    if shift.abs() < config.slide_min_cents {
        return None;
    }

    if shift > 0.0 {
        Some(Articulation::SlideUp)
    } else {
        Some(Articulation::SlideDown)
    }
}

/// Detect hammer-on / pull-off: no clear attack, and the note follows its
/// predecessor closely
fn detect_legato(
    notes: &[NoteEvent],
    index: usize,
    frames: &FrameSet,
    geometry: &ModelGeometry,
    config: &ArticulationConfig,
) -> Option<Articulation> {
    let onset_frames = frames.onset_frames();
    if onset_frames.is_empty() {
        return None;
    }

    let note = &notes[index];
    let frame = ((note.start_time_sec * frames.frames_per_second()).round().max(0.0) as usize)
        .min(onset_frames.len() - 1);
    let row = &onset_frames[frame];
    let pitch_index = geometry.index_for_midi(note.midi_pitch).min(row.len().saturating_sub(1));
    let onset_prob = row.get(pitch_index).copied().unwrap_or(0.0);
    if onset_prob > config.legato_onset_threshold {
        return None;
    }

    let prev = notes.get(index.checked_sub(1)?)?;
    if note.start_time_sec - prev.end_time_sec > config.legato_max_gap_sec {
        return None;
    }

    match note.midi_pitch.cmp(&prev.midi_pitch) {
        std::cmp::Ordering::Greater => Some(Articulation::HammerOn),
        std::cmp::Ordering::Less => Some(Articulation::PullOff),
        std::cmp::Ordering::Equal => None,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}
