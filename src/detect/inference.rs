// Inference backend abstraction
// The pitch/onset/contour model is an opaque per-window function; this module
// fixes its input/output geometry and the error it may report

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detect::frames::ValidationError;

/// Errors reported by an inference backend for a single window
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference backend failed: {0}")]
    Backend(String),

    #[error("Model unavailable: {0}")]
    Model(String),
}

/// Fixed input/output shape of the pitch model
///
/// Defaults describe the Basic Pitch network: ~1.99 s windows of 22 050 Hz
/// mono audio producing 172 frames of 88 pitch posteriors (MIDI 21-108) and
/// 264 contour bins (3 per semitone).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelGeometry {
    /// Samples per inference window
    pub window_samples: usize,

    /// Frames produced per window
    pub frames_per_window: usize,

    /// Sample rate the model expects (Hz)
    pub sample_rate: u32,

    /// Number of pitch rows in onset/note frames
    pub n_pitches: usize,

    /// MIDI pitch of pitch row 0
    pub midi_offset: u8,

    /// Number of contour bins per frame
    pub contour_bins: usize,

    /// Contour resolution
    pub bins_per_semitone: usize,
}

impl Default for ModelGeometry {
    fn default() -> Self {
        ModelGeometry {
            window_samples: 43_844,
            frames_per_window: 172,
            sample_rate: 22_050,
            n_pitches: 88,
            midi_offset: 21,
            contour_bins: 264,
            bins_per_semitone: 3,
        }
    }
}

impl ModelGeometry {
    /// Constant output frame rate: frames_per_window * sample_rate / window_samples
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_window as f64 * self.sample_rate as f64 / self.window_samples as f64
    }

    /// Duration of one inference window in seconds
    pub fn window_duration_sec(&self) -> f64 {
        self.window_samples as f64 / self.sample_rate as f64
    }

    /// Number of windows needed to cover `sample_count` samples
    pub fn window_count(&self, sample_count: usize) -> usize {
        if self.window_samples == 0 {
            return 0;
        }
        sample_count.div_ceil(self.window_samples)
    }

    /// MIDI pitch for a pitch row
    pub fn midi_for_index(&self, pitch_index: usize) -> u8 {
        (pitch_index + self.midi_offset as usize).min(127) as u8
    }

    /// Pitch row for a MIDI pitch, clamped into the model's range
    pub fn index_for_midi(&self, midi_pitch: u8) -> usize {
        (midi_pitch as usize)
            .saturating_sub(self.midi_offset as usize)
            .min(self.n_pitches.saturating_sub(1))
    }

    /// Contour bin centred on a MIDI pitch
    pub fn center_bin(&self, midi_pitch: u8) -> i64 {
        (midi_pitch as i64 - self.midi_offset as i64) * self.bins_per_semitone as i64 + 1
    }

    /// Cents represented by one contour bin
    pub fn cents_per_bin(&self) -> f32 {
        100.0 / self.bins_per_semitone as f32
    }

    /// Reject geometries that cannot produce a usable frame rate
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |what: &str| Err(ValidationError::InvalidGeometry(what.to_string()));

        if self.window_samples == 0 {
            return invalid("window_samples must be > 0");
        }
        if self.frames_per_window == 0 {
            return invalid("frames_per_window must be > 0");
        }
        if self.sample_rate == 0 {
            return invalid("sample_rate must be > 0");
        }
        if self.n_pitches == 0 {
            return invalid("n_pitches must be > 0");
        }
        if self.contour_bins == 0 {
            return invalid("contour_bins must be > 0");
        }
        if self.bins_per_semitone == 0 {
            return invalid("bins_per_semitone must be > 0");
        }
        Ok(())
    }
}

/// Raw model output for one window
/// Shapes: onset/note `[frames_per_window][n_pitches]`, contour `[frames_per_window][contour_bins]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowOutput {
    pub onset: Vec<Vec<f32>>,
    pub note: Vec<Vec<f32>>,
    pub contour: Vec<Vec<f32>>,
}

/// Per-window pitch model
///
/// Implementations must be deterministic and free of side effects; the
/// scheduler calls `infer` exactly once per window, possibly from several
/// worker threads at once.
pub trait InferenceBackend: Send + Sync {
    /// Run the model on one zero-padded window of `window_samples` samples
    fn infer(&self, window: &[f32]) -> Result<WindowOutput, InferenceError>;

    /// Backend name for logs and traces
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> InferenceBackend for F
where
    F: Fn(&[f32]) -> Result<WindowOutput, InferenceError> + Send + Sync,
{
    fn infer(&self, window: &[f32]) -> Result<WindowOutput, InferenceError> {
        self(window)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
