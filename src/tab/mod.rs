// Tablature module
// Tunings, fretboard position mapping, and ASCII rendering

pub mod ascii;
pub mod mapper;
pub mod tuning;
pub mod types;

pub use ascii::articulation_suffix;
pub use mapper::{map_notes, TabMapperConfig};
pub use tuning::{PitchClass, Tuning};
pub use types::{TabEvent, TabNote, Tablature};
