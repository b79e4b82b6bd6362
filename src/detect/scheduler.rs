// Window scheduler
// Splits mono audio into fixed, non-overlapping model windows, runs inference
// once per window, and concatenates the frame outputs in window order

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

use crate::audio::{resample_mono, ResampleError};
use crate::detect::frames::{FrameSet, ValidationError};
use crate::detect::inference::{InferenceBackend, InferenceError, ModelGeometry, WindowOutput};
use crate::pipeline::cancel::CancellationToken;

/// Errors that abort window scheduling; no partial frames are returned
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Inference failed on window {window}: {source}")]
    Inference {
        window: usize,
        #[source]
        source: InferenceError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error("Failed to start inference workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Transcription cancelled")]
    Cancelled,
}

/// Configuration for window scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Windows inferred concurrently (1 = sequential)
    /// Output order is always window order regardless of this value
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { workers: 1 }
    }
}

/// Run the model over a whole recording
///
/// Audio at a rate other than `geometry.sample_rate` is resampled first.
/// Cancellation is checked before every window.
pub fn schedule_windows(
    samples: &[f32],
    sample_rate: u32,
    backend: &dyn InferenceBackend,
    geometry: &ModelGeometry,
    config: &SchedulerConfig,
    cancel: &CancellationToken,
) -> Result<FrameSet, ScheduleError> {
    geometry.validate()?;
    if sample_rate == 0 {
        return Err(ValidationError::InvalidSampleRate(sample_rate).into());
    }

    let samples: Cow<'_, [f32]> = if sample_rate == geometry.sample_rate {
        Cow::Borrowed(samples)
    } else {
        Cow::Owned(resample_mono(samples, sample_rate, geometry.sample_rate)?)
    };

    let window_count = geometry.window_count(samples.len());
    let workers = config.workers.max(1);
    let mut frames = FrameSet::empty(geometry);

    log::debug!(
        "Scheduling {} windows of {:.2}s on backend '{}' ({} worker{})",
        window_count,
        geometry.window_duration_sec(),
        backend.name(),
        workers,
        if workers == 1 { "" } else { "s" }
    );

    if workers == 1 || window_count <= 1 {
        for window in 0..window_count {
            let output = infer_window(backend, &samples, window, geometry, cancel)?;
            frames.append_window(window, output, geometry)?;
        }
        return Ok(frames);
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    let outputs: Vec<Result<WindowOutput, ScheduleError>> = pool.install(|| {
        (0..window_count)
            .into_par_iter()
            .map(|window| infer_window(backend, &samples, window, geometry, cancel))
            .collect()
    });

    // Errors surface in window order, as in the sequential path
    for (window, output) in outputs.into_iter().enumerate() {
        frames.append_window(window, output?, geometry)?;
    }

    Ok(frames)
}

/// Copy one window (zero-padded at the end of the recording) and run the model on it
fn infer_window(
    backend: &dyn InferenceBackend,
    samples: &[f32],
    window: usize,
    geometry: &ModelGeometry,
    cancel: &CancellationToken,
) -> Result<WindowOutput, ScheduleError> {
    if cancel.is_cancelled() {
        return Err(ScheduleError::Cancelled);
    }

    let start = window * geometry.window_samples;
    let end = (start + geometry.window_samples).min(samples.len());

    let mut chunk = vec![0.0f32; geometry.window_samples];
    chunk[..end - start].copy_from_slice(&samples[start..end]);

    backend
        .infer(&chunk)
        .map_err(|source| ScheduleError::Inference { window, source })
}
