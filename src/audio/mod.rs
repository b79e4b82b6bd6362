// Audio processing module
// Handles WAV decoding, down-mixing, and resampling to the model rate

pub mod ingest;
pub mod resample;

pub use ingest::{decode_wav, ingest_wav, DecodeError, DecodedAudio, WavAudio};
pub use resample::{resample_mono, ResampleError};
