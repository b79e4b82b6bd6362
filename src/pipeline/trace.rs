// Transcription run tracing
// Stage progress entries collected in memory during a run, optionally
// persisted afterwards as append-only JSONL

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Pipeline stage a trace entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Inference,
    NoteExtraction,
    Articulation,
    Tablature,
    MidiExport,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Inference => "inference",
            Stage::NoteExtraction => "note_extraction",
            Stage::Articulation => "articulation",
            Stage::Tablature => "tablature",
            Stage::MidiExport => "midi_export",
        };
        f.write_str(name)
    }
}

/// A single trace entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub run_id: Uuid,

    pub timestamp: DateTime<Utc>,

    pub stage: Stage,

    /// Progress through the whole run [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Stage counters (windows, notes, dropped tab notes, bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run_id: Uuid, stage: Stage, progress: f32, message: impl Into<String>) -> Self {
        TraceEntry {
            run_id,
            timestamp: Utc::now(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// In-memory trace for one run
///
/// Entries are also mirrored to the `log` facade at debug level.
#[derive(Debug, Clone)]
pub struct RunTrace {
    run_id: Uuid,
    entries: Vec<TraceEntry>,
}

impl RunTrace {
    pub fn new(run_id: Uuid) -> Self {
        RunTrace {
            run_id,
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record(&mut self, stage: Stage, progress: f32, message: impl Into<String>) {
        self.push(TraceEntry::new(self.run_id, stage, progress, message));
    }

    pub fn record_with_data(
        &mut self,
        stage: Stage,
        progress: f32,
        message: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.push(TraceEntry::new(self.run_id, stage, progress, message).with_data(data));
    }

    fn push(&mut self, entry: TraceEntry) {
        log::debug!("[{}] {} ({:.0}%): {}", self.run_id, entry.stage, entry.progress * 100.0, entry.message);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

/// Append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        TraceWriter {
            file_path: file_path.into(),
        }
    }

    /// Append one entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trace entries from a JSONL file, skipping blank lines
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}
