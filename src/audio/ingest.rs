// Audio ingestion module
// Reads WAV files, normalizes samples, and prepares mono audio at the model rate

use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use thiserror::Error;

use super::resample::{resample_mono, ResampleError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// Interleaved PCM as stored in the source file
#[derive(Debug, Clone)]
pub struct WavAudio {
    /// Audio samples normalized to f32 in range [-1.0, 1.0], interleaved
    pub samples: Vec<f32>,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Bit depth of original audio (8, 16, 24, 32)
    pub bit_depth: u16,

    /// Total number of frames (samples / channels)
    pub frame_count: usize,
}

impl WavAudio {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Mono audio ready for the window scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Ingest a WAV file from raw bytes
/// Returns interleaved normalized samples and metadata
pub fn ingest_wav(data: &[u8]) -> Result<WavAudio, DecodeError> {
    let cursor = Cursor::new(data);
    let mut reader = WavReader::new(cursor)?;

    let spec = reader.spec();
    let channels = spec.channels;
    let bit_depth = spec.bits_per_sample;

    if spec.sample_rate == 0 {
        return Err(DecodeError::InvalidSampleRate(spec.sample_rate));
    }

    let samples: Vec<f32> = match (spec.sample_format, bit_depth) {
        (SampleFormat::Int, 8) => read_int(&mut reader, 128.0)?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 24) => read_int(&mut reader, 8_388_608.0)?,
        (SampleFormat::Int, 32) => read_int(&mut reader, 2_147_483_648.0)?,
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                format, bits
            )));
        }
    };

    let frame_count = samples.len() / channels.max(1) as usize;

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels,
        bit_depth,
        frame_count,
    })
}

/// Decode a WAV file to mono audio at `target_rate`
///
/// Channels are averaged; a differing source rate is band-limited resampled.
pub fn decode_wav(data: &[u8], target_rate: u32) -> Result<DecodedAudio, DecodeError> {
    if target_rate == 0 {
        return Err(DecodeError::InvalidSampleRate(target_rate));
    }

    let wav = ingest_wav(data)?;
    let mono = wav.to_mono();
    let samples = resample_mono(&mono, wav.sample_rate, target_rate)?;

    log::debug!(
        "Decoded WAV: {} Hz x{} ch, {:.2}s -> {} mono samples at {} Hz",
        wav.sample_rate,
        wav.channels,
        wav.duration_secs(),
        samples.len(),
        target_rate
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Read integer PCM as i32 and scale into [-1.0, 1.0]
/// 8-bit WAV is stored unsigned but hound hands it back already centred
fn read_int<R: std::io::Read>(
    reader: &mut WavReader<R>,
    full_scale: f32,
) -> Result<Vec<f32>, hound::Error> {
    reader
        .samples::<i32>()
        .map(|s| s.map(|v| v as f32 / full_scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes(spec: WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn spec(channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    #[test]
    fn test_wav_audio_to_mono() {
        // Create stereo audio: [L, R, L, R, L, R]
        let audio = WavAudio {
            samples: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
            frame_count: 3,
        };

        let mono = audio.to_mono();

        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.15).abs() < 1e-6);
        assert!((mono[1] - 0.35).abs() < 1e-6);
        assert!((mono[2] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_ingest_16bit_stereo() {
        let bytes = wav_bytes(spec(2, 22_050), &[16384, -16384, 8192, 8192]);
        let audio = ingest_wav(&bytes).unwrap();

        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frame_count, 2);
        assert!((audio.samples[0] - 0.5).abs() < 1e-6);
        assert!((audio.samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_wav_downmixes_and_keeps_rate() {
        let bytes = wav_bytes(spec(2, 22_050), &[16384, 0, 16384, 0]);
        let decoded = decode_wav(&bytes, 22_050).unwrap();

        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.samples.len(), 2);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_decode_wav_resamples() {
        let samples = vec![0i16; 44_100];
        let bytes = wav_bytes(spec(1, 44_100), &samples);
        let decoded = decode_wav(&bytes, 22_050).unwrap();

        assert_eq!(decoded.samples.len(), 22_050);
        assert_eq!(decoded.duration_ms(), 1000);
    }

    #[test]
    fn test_decode_wav_filters_before_downsampling() {
        let samples: Vec<i16> = (0..44_100)
            .map(|i| {
                let t = i as f32 / 44_100.0;
                ((2.0 * std::f32::consts::PI * 15_000.0 * t).sin() * 16_000.0) as i16
            })
            .collect();
        let bytes = wav_bytes(spec(1, 44_100), &samples);
        let decoded = decode_wav(&bytes, 22_050).unwrap();

        let middle = &decoded.samples[5_000..17_000];
        let rms = (middle.iter().map(|s| s * s).sum::<f32>() / middle.len() as f32).sqrt();
        assert!(rms < 0.02, "15 kHz leaked through as {}", rms);
    }

    #[test]
    fn test_decode_empty_wav() {
        let bytes = wav_bytes(spec(1, 22_050), &[]);
        let decoded = decode_wav(&bytes, 22_050).unwrap();
        assert!(decoded.samples.is_empty());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_wav(b"definitely not a wav file", 22_050);
        assert!(matches!(result, Err(DecodeError::WavReadError(_))));
    }
}
