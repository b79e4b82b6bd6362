// Note detection module
// Window scheduling, note extraction, and articulation analysis over model posteriors

pub mod articulation;
pub mod frames;
pub mod inference;
pub mod notes;
pub mod scheduler;
pub mod types;

pub use articulation::{analyze_articulations, apply_articulations, ArticulationConfig, Bend, Vibrato};
pub use frames::{FrameKind, FrameSet, ValidationError};
pub use inference::{InferenceBackend, InferenceError, ModelGeometry, WindowOutput};
pub use notes::{extract_notes, NoteExtractorConfig};
pub use scheduler::{schedule_windows, ScheduleError, SchedulerConfig};
pub use types::{Articulation, ArticulationSet, NoteArticulations, NoteEvent};
