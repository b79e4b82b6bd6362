// Transcription pipeline
// Runs decode -> window inference -> note extraction -> articulation
// analysis -> tab mapping -> MIDI export, strictly one stage after another

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::audio::{decode_wav, DecodeError};
use crate::detect::{
    apply_articulations, extract_notes, schedule_windows, Articulation, InferenceBackend,
    InferenceError, NoteEvent, ScheduleError, ValidationError,
};
use crate::midi::export_midi;
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::config::TranscriptionConfig;
use crate::pipeline::trace::{RunTrace, Stage, TraceEntry};
use crate::tab::{map_notes, Tablature, Tuning};

/// Errors that abort a run; no partial output is returned
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Inference failed on window {window}: {source}")]
    Inference {
        window: usize,
        #[source]
        source: InferenceError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Transcription cancelled")]
    Cancelled,

    #[error("Transcription task failed: {0}")]
    Join(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ScheduleError> for TranscribeError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Inference { window, source } => {
                TranscribeError::Inference { window, source }
            }
            ScheduleError::Validation(e) => TranscribeError::Validation(e),
            ScheduleError::Cancelled => TranscribeError::Cancelled,
            ScheduleError::Resample(e) => TranscribeError::Decode(DecodeError::Resample(e)),
            ScheduleError::ThreadPool(e) => {
                TranscribeError::Join(format!("inference workers unavailable: {}", e))
            }
        }
    }
}

/// Output of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub run_id: Uuid,

    /// Sorted by start time, articulation metadata attached
    pub notes: Vec<NoteEvent>,

    pub tablature: Tablature,

    /// Standard MIDI File bytes, when export was requested
    #[serde(skip)]
    pub midi: Option<Vec<u8>>,

    #[serde(skip)]
    pub trace: Vec<TraceEntry>,
}

impl Transcription {
    pub fn ascii_tab(&self) -> String {
        self.tablature.to_ascii()
    }

    pub fn midi_bytes(&self) -> Option<&[u8]> {
        self.midi.as_deref()
    }

    /// Notes and tablature as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs the full pipeline against one inference backend
///
/// Each call owns its buffers, so one `Transcriber` can serve concurrent runs.
#[derive(Clone)]
pub struct Transcriber {
    backend: Arc<dyn InferenceBackend>,
    config: TranscriptionConfig,
}

impl Transcriber {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        config: TranscriptionConfig,
    ) -> Result<Self, TranscribeError> {
        config.geometry.validate()?;
        Ok(Transcriber { backend, config })
    }

    pub fn with_defaults(backend: Arc<dyn InferenceBackend>) -> Self {
        Transcriber {
            backend,
            config: TranscriptionConfig::default(),
        }
    }

    pub fn config(&self) -> &TranscriptionConfig {
        &self.config
    }

    /// Transcribe a WAV file held in memory
    pub fn transcribe_wav(
        &self,
        wav_bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Transcription, TranscribeError> {
        let mut trace = RunTrace::new(Uuid::new_v4());
        trace.record(Stage::Decode, 0.0, format!("Decoding {} bytes of WAV", wav_bytes.len()));

        let audio = decode_wav(wav_bytes, self.config.geometry.sample_rate).map_err(|e| {
            log::warn!("[{}] Decode failed: {}", trace.run_id(), e);
            e
        })?;
        trace.record(
            Stage::Decode,
            0.05,
            format!("Decoded {} ms of audio", audio.duration_ms()),
        );

        self.run(&audio.samples, audio.sample_rate, cancel, trace)
    }

    /// Transcribe mono samples at any sample rate
    pub fn transcribe_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> Result<Transcription, TranscribeError> {
        self.run(samples, sample_rate, cancel, RunTrace::new(Uuid::new_v4()))
    }

    /// Run the blocking pipeline on tokio's blocking pool
    pub async fn transcribe_async(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        cancel: CancellationToken,
    ) -> Result<Transcription, TranscribeError> {
        let transcriber = self.clone();
        tokio::task::spawn_blocking(move || {
            transcriber.transcribe_samples(&samples, sample_rate, &cancel)
        })
        .await
        .map_err(|e| TranscribeError::Join(e.to_string()))?
    }

    /// Read a WAV file asynchronously and transcribe it off the async runtime
    pub async fn transcribe_file_async(
        &self,
        path: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<Transcription, TranscribeError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let transcriber = self.clone();
        tokio::task::spawn_blocking(move || transcriber.transcribe_wav(&bytes, &cancel))
            .await
            .map_err(|e| TranscribeError::Join(e.to_string()))?
    }

    /// Re-run tab mapping only, e.g. after the user picks another tuning
    pub fn retab(&self, notes: &[NoteEvent], tuning: &Tuning) -> Tablature {
        map_notes(notes, tuning, &self.config.tab)
    }

    fn run(
        &self,
        samples: &[f32],
        sample_rate: u32,
        cancel: &CancellationToken,
        mut trace: RunTrace,
    ) -> Result<Transcription, TranscribeError> {
        let run_id = trace.run_id();
        let config = &self.config;
        let geometry = &config.geometry;

        log::info!(
            "[{}] Transcribing {} samples at {} Hz with backend '{}'",
            run_id,
            samples.len(),
            sample_rate,
            self.backend.name()
        );

        let frames = schedule_windows(
            samples,
            sample_rate,
            self.backend.as_ref(),
            geometry,
            &config.scheduler,
            cancel,
        )
        .map_err(|e| {
            match &e {
                ScheduleError::Cancelled => log::info!("[{}] Cancelled during inference", run_id),
                ScheduleError::Validation(v) => log::warn!("[{}] Rejected model output: {}", run_id, v),
                other => log::warn!("[{}] {}", run_id, other),
            }
            TranscribeError::from(e)
        })?;
        trace.record_with_data(
            Stage::Inference,
            0.5,
            format!("Inferred {} frames", frames.len()),
            serde_json::json!({
                "windows": frames.len() / geometry.frames_per_window.max(1),
                "frames": frames.len(),
            }),
        );

        let notes = extract_notes(&frames, geometry, &config.notes);
        trace.record_with_data(
            Stage::NoteExtraction,
            0.6,
            format!("Extracted {} notes", notes.len()),
            serde_json::json!({ "notes": notes.len() }),
        );

        let notes = apply_articulations(notes, &frames, geometry, &config.articulation);
        let tallies = articulation_tallies(&notes);
        trace.record_with_data(
            Stage::Articulation,
            0.7,
            "Analyzed articulations",
            serde_json::to_value(&tallies)?,
        );

        let tablature = map_notes(&notes, &config.tuning, &config.tab);
        let dropped = notes.len() - tablature.note_count();
        trace.record_with_data(
            Stage::Tablature,
            0.85,
            format!("Mapped {} tab events", tablature.events.len()),
            serde_json::json!({
                "events": tablature.events.len(),
                "dropped_notes": dropped,
            }),
        );

        if cancel.is_cancelled() {
            log::info!("[{}] Cancelled before export", run_id);
            return Err(TranscribeError::Cancelled);
        }

        let midi = if config.export_midi {
            let bytes = export_midi(&notes, &config.midi);
            trace.record_with_data(
                Stage::MidiExport,
                1.0,
                format!("Exported {} bytes of MIDI", bytes.len()),
                serde_json::json!({ "bytes": bytes.len() }),
            );
            Some(bytes)
        } else {
            trace.record(Stage::MidiExport, 1.0, "MIDI export skipped");
            None
        };

        log::info!(
            "[{}] Transcribed {} notes into {} tab events ({} dropped), articulations: {}",
            run_id,
            notes.len(),
            tablature.events.len(),
            dropped,
            tally_summary(&tallies)
        );

        Ok(Transcription {
            run_id,
            notes,
            tablature,
            midi,
            trace: trace.into_entries(),
        })
    }
}

fn articulation_tallies(notes: &[NoteEvent]) -> BTreeMap<Articulation, usize> {
    let mut tallies = BTreeMap::new();
    for note in notes {
        for articulation in &note.articulations {
            *tallies.entry(*articulation).or_insert(0) += 1;
        }
    }
    tallies
}

/// "Vibrato x2, Hammer-on x1", or "none"
fn tally_summary(tallies: &BTreeMap<Articulation, usize>) -> String {
    if tallies.is_empty() {
        return "none".to_string();
    }
    tallies
        .iter()
        .map(|(articulation, count)| format!("{} x{}", articulation.display_name(), count))
        .collect::<Vec<_>>()
        .join(", ")
}
