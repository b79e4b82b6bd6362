// Pipeline orchestration module
// Runs the transcription stages in order, with cancellation, configuration, and run tracing

pub mod cancel;
pub mod config;
pub mod trace;
pub mod transcribe;

pub use cancel::CancellationToken;
pub use config::TranscriptionConfig;
pub use trace::{read_trace_file, RunTrace, Stage, TraceEntry, TraceError, TraceWriter};
pub use transcribe::{TranscribeError, Transcriber, Transcription};
