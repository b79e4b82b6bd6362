// Full-track frame arrays
// Concatenated onset/note/contour posteriors plus the shape checks that guard them

use std::fmt;
use thiserror::Error;

use crate::detect::inference::{ModelGeometry, WindowOutput};

/// Which of the three model outputs a frame row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Onset,
    Note,
    Contour,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Onset => "onset",
            FrameKind::Note => "note",
            FrameKind::Contour => "contour",
        };
        f.write_str(name)
    }
}

/// Malformed model output or geometry, rejected before any note is extracted
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid model geometry: {0}")]
    InvalidGeometry(String),

    #[error("Window {window}: expected {expected} {kind} frames, got {actual}")]
    FrameCount {
        window: usize,
        kind: FrameKind,
        expected: usize,
        actual: usize,
    },

    #[error("Frame {frame}: expected {expected} {kind} values, got {actual}")]
    RowWidth {
        frame: usize,
        kind: FrameKind,
        expected: usize,
        actual: usize,
    },

    #[error("Frame {frame}: non-finite {kind} value at bin {bin}")]
    NonFinite {
        frame: usize,
        kind: FrameKind,
        bin: usize,
    },

    #[error("Frame arrays disagree in length: onset={onset}, note={note}, contour={contour}")]
    LengthMismatch {
        onset: usize,
        note: usize,
        contour: usize,
    },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Onset, note, and contour frames for a whole recording
///
/// Rows are time-ordered; every row has the width the model geometry
/// promises and every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSet {
    onset: Vec<Vec<f32>>,
    note: Vec<Vec<f32>>,
    contour: Vec<Vec<f32>>,
    frames_per_second: f64,
}

impl FrameSet {
    /// Empty frame set (zero-length recording)
    pub fn empty(geometry: &ModelGeometry) -> Self {
        FrameSet {
            onset: Vec::new(),
            note: Vec::new(),
            contour: Vec::new(),
            frames_per_second: geometry.frames_per_second(),
        }
    }

    /// Build a frame set from caller-supplied arrays, checking shape and values
    pub fn from_parts(
        onset: Vec<Vec<f32>>,
        note: Vec<Vec<f32>>,
        contour: Vec<Vec<f32>>,
        geometry: &ModelGeometry,
    ) -> Result<Self, ValidationError> {
        geometry.validate()?;

        if onset.len() != note.len() || note.len() != contour.len() {
            return Err(ValidationError::LengthMismatch {
                onset: onset.len(),
                note: note.len(),
                contour: contour.len(),
            });
        }

        check_rows(&onset, FrameKind::Onset, geometry.n_pitches, 0)?;
        check_rows(&note, FrameKind::Note, geometry.n_pitches, 0)?;
        check_rows(&contour, FrameKind::Contour, geometry.contour_bins, 0)?;

        Ok(FrameSet {
            onset,
            note,
            contour,
            frames_per_second: geometry.frames_per_second(),
        })
    }

    /// Append one window's output after validating it against the geometry
    pub(crate) fn append_window(
        &mut self,
        window: usize,
        output: WindowOutput,
        geometry: &ModelGeometry,
    ) -> Result<(), ValidationError> {
        validate_window(window, &output, geometry, self.len())?;

        self.onset.extend(output.onset);
        self.note.extend(output.note);
        self.contour.extend(output.contour);
        Ok(())
    }

    /// Number of time frames
    pub fn len(&self) -> usize {
        self.note.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note.is_empty()
    }

    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    pub fn onset_frames(&self) -> &[Vec<f32>] {
        &self.onset
    }

    pub fn note_frames(&self) -> &[Vec<f32>] {
        &self.note
    }

    pub fn contour_frames(&self) -> &[Vec<f32>] {
        &self.contour
    }
}

/// Check one window's output shape before it is concatenated
fn validate_window(
    window: usize,
    output: &WindowOutput,
    geometry: &ModelGeometry,
    first_frame: usize,
) -> Result<(), ValidationError> {
    let expected = geometry.frames_per_window;
    for (kind, rows) in [
        (FrameKind::Onset, &output.onset),
        (FrameKind::Note, &output.note),
        (FrameKind::Contour, &output.contour),
    ] {
        if rows.len() != expected {
            return Err(ValidationError::FrameCount {
                window,
                kind,
                expected,
                actual: rows.len(),
            });
        }
    }

    check_rows(&output.onset, FrameKind::Onset, geometry.n_pitches, first_frame)?;
    check_rows(&output.note, FrameKind::Note, geometry.n_pitches, first_frame)?;
    check_rows(&output.contour, FrameKind::Contour, geometry.contour_bins, first_frame)?;
    Ok(())
}

fn check_rows(
    rows: &[Vec<f32>],
    kind: FrameKind,
    width: usize,
    first_frame: usize,
) -> Result<(), ValidationError> {
    for (i, row) in rows.iter().enumerate() {
        let frame = first_frame + i;
        if row.len() != width {
            return Err(ValidationError::RowWidth {
                frame,
                kind,
                expected: width,
                actual: row.len(),
            });
        }
        if let Some(bin) = row.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite { frame, kind, bin });
        }
    }
    Ok(())
}
