//! FLAC stream encoder built on the `flacenc` crate.
//!
//! [`StreamEncoder`] is created per recording session via
//! [`StreamEncoder::open`], fed `f32` frames from the audio callback, and
//! consumed by [`StreamEncoder::finish`], which returns the complete FLAC
//! byte stream as [`EncodedAudio`].  After `finish()` the encoder is gone —
//! a new session must allocate a new one.

use thiserror::Error;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;
use flacenc::source::MemSource;

/// Samples are `f32` nominally in `[-1, 1]`; values up to ±2 are tolerated
/// as intentional headroom and saturate at the 16-bit rails.  Anything
/// beyond ±2 is a caller bug and is rejected instead of wrapping.
const SAMPLE_HEADROOM: f32 = 2.0;

// ---------------------------------------------------------------------------
// EncoderError
// ---------------------------------------------------------------------------

/// Errors that can arise while encoding a session's audio.
///
/// All encoder errors are fatal to the *current session only*: the
/// controller aborts the session, discards partial output and returns to
/// `Idle` — the audio callback thread itself never crashes.
#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    /// A fed sample fell outside the permitted `[-2, 2]` range.
    #[error("sample {0} is outside the [-2, 2] range")]
    SampleOutOfRange(f32),

    /// The encoder configuration failed verification.
    #[error("invalid encoder configuration: {0}")]
    Config(String),

    /// The FLAC encode itself failed.
    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    /// `finish()` was called with no samples fed — there is nothing to
    /// frame into a valid stream.
    #[error("no samples were fed to the encoder")]
    Empty,
}

// ---------------------------------------------------------------------------
// EncodedAudio
// ---------------------------------------------------------------------------

/// A finished, self-contained FLAC byte stream plus the metadata the
/// submitter needs to build the request.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    bytes: Vec<u8>,
    sample_rate: u32,
}

impl EncodedAudio {
    /// The encoded FLAC stream.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total number of encoded bytes (headers and frames included).
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Sample rate of the encoded audio in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Consume and return the raw byte stream.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Build an `EncodedAudio` from raw parts — tests only; production
    /// payloads always come out of [`StreamEncoder::finish`].
    #[cfg(test)]
    pub(crate) fn from_parts(bytes: Vec<u8>, sample_rate: u32) -> Self {
        Self { bytes, sample_rate }
    }
}

// ---------------------------------------------------------------------------
// StreamEncoder
// ---------------------------------------------------------------------------

/// Per-session FLAC encoder.
///
/// # Contract
///
/// - [`feed`](Self::feed) is called only from the single real-time thread;
///   it takes no locks and performs no I/O.
/// - [`finish`](Self::finish) consumes the encoder, frames the accumulated
///   samples into a FLAC container and returns the byte stream.
///
/// # Example
///
/// ```rust
/// use speech_relay::encode::StreamEncoder;
///
/// let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
/// enc.feed(&vec![0.1_f32; 4096], 0).unwrap();
/// let audio = enc.finish().unwrap();
/// assert!(audio.byte_len() > 0);
/// ```
#[derive(Debug)]
pub struct StreamEncoder {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    /// Converted interleaved samples, accumulated until `finish()`.
    samples: Vec<i32>,
}

impl StreamEncoder {
    /// Open a new encoder for one recording session.
    pub fn open(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Self, EncoderError> {
        if bits_per_sample != 16 {
            return Err(EncoderError::Config(format!(
                "unsupported bits per sample: {bits_per_sample} (only 16 is supported)"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
            samples: Vec::new(),
        })
    }

    /// Feed one buffer of `f32` frames, skipping the first `overlap_to_skip`
    /// samples (already fed as part of the previous buffer's overlap).
    ///
    /// Samples are linearly scaled to signed 16-bit integers.  Values in the
    /// headroom band `(1, 2]` saturate at the rails; values outside `[-2, 2]`
    /// return [`EncoderError::SampleOutOfRange`].
    ///
    /// `overlap_to_skip >= frames.len()` feeds nothing and is not an error.
    pub fn feed(&mut self, frames: &[f32], overlap_to_skip: usize) -> Result<(), EncoderError> {
        let fresh = frames.get(overlap_to_skip..).unwrap_or(&[]);
        self.samples.reserve(fresh.len());

        for &sample in fresh {
            if !sample.is_finite() || sample.abs() > SAMPLE_HEADROOM {
                return Err(EncoderError::SampleOutOfRange(sample));
            }
            let scaled = (sample * i16::MAX as f32)
                .clamp(i16::MIN as f32, i16::MAX as f32)
                .round() as i32;
            self.samples.push(scaled);
        }
        Ok(())
    }

    /// Number of samples fed so far (post overlap skipping).
    pub fn samples_fed(&self) -> usize {
        self.samples.len()
    }

    /// Flush buffered samples, close the container framing and return the
    /// finished byte stream.
    ///
    /// # Errors
    ///
    /// - [`EncoderError::Empty`] when no samples were fed.
    /// - [`EncoderError::Config`] / [`EncoderError::Encode`] on `flacenc`
    ///   failures.
    pub fn finish(self) -> Result<EncodedAudio, EncoderError> {
        if self.samples.is_empty() {
            return Err(EncoderError::Empty);
        }

        let config = flacenc::config::Encoder::default()
            .into_verified()
            .map_err(|e| EncoderError::Config(format!("{e:?}")))?;

        let source = MemSource::from_samples(
            &self.samples,
            self.channels as usize,
            self.bits_per_sample as usize,
            self.sample_rate as usize,
        );

        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| EncoderError::Encode(format!("{e:?}")))?;

        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| EncoderError::Encode(format!("{e:?}")))?;

        let bytes = sink.as_slice().to_vec();
        log::debug!(
            "encoder: finished session stream — {} samples → {} bytes",
            self.samples.len(),
            bytes.len()
        );

        Ok(EncodedAudio {
            bytes,
            sample_rate: self.sample_rate,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// One second of a 440 Hz sine at half amplitude, 16 kHz mono.
    fn sine_440(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin())
            .collect()
    }

    fn expected_i32(sample: f32) -> i32 {
        (sample * i16::MAX as f32)
            .clamp(i16::MIN as f32, i16::MAX as f32)
            .round() as i32
    }

    // ---- feed ----

    #[test]
    fn feed_accumulates_samples() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&[0.0, 0.25, -0.25], 0).unwrap();
        enc.feed(&[0.5], 0).unwrap();
        assert_eq!(enc.samples_fed(), 4);
    }

    #[test]
    fn feed_skips_overlap() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&[0.1, 0.2, 0.3, 0.4], 2).unwrap();
        assert_eq!(enc.samples_fed(), 2);
    }

    #[test]
    fn overlap_larger_than_buffer_feeds_nothing() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&[0.1, 0.2], 5).unwrap();
        assert_eq!(enc.samples_fed(), 0);
    }

    #[test]
    fn headroom_samples_saturate_instead_of_wrapping() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&[1.5, -1.5, 2.0, -2.0], 0).unwrap();
        assert_eq!(enc.samples_fed(), 4);
    }

    #[test]
    fn out_of_range_sample_is_rejected() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        let err = enc.feed(&[2.5], 0).unwrap_err();
        assert!(matches!(err, EncoderError::SampleOutOfRange(_)));
    }

    #[test]
    fn nan_sample_is_rejected() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        let err = enc.feed(&[f32::NAN], 0).unwrap_err();
        assert!(matches!(err, EncoderError::SampleOutOfRange(_)));
    }

    // ---- finish ----

    #[test]
    fn finish_empty_returns_empty_error() {
        let enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        assert!(matches!(enc.finish().unwrap_err(), EncoderError::Empty));
    }

    #[test]
    fn finish_produces_flac_magic() {
        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&sine_440(16_000), 0).unwrap();
        let audio = enc.finish().unwrap();
        assert_eq!(&audio.bytes()[..4], b"fLaC");
        assert_eq!(audio.sample_rate(), 16_000);
        assert_eq!(audio.byte_len(), audio.bytes().len());
    }

    #[test]
    fn unsupported_bit_depth_is_rejected() {
        assert!(matches!(
            StreamEncoder::open(16_000, 1, 24),
            Err(EncoderError::Config(_))
        ));
    }

    // ---- round trip ----

    /// Encoding then decoding a synthetic sine wave must reproduce the
    /// quantized samples exactly (FLAC is lossless past the f32 → i16 step).
    #[test]
    fn round_trip_reproduces_quantized_sine() {
        let original = sine_440(16_000);

        let mut enc = StreamEncoder::open(16_000, 1, 16).unwrap();
        enc.feed(&original, 0).unwrap();
        let audio = enc.finish().unwrap();

        let mut reader = claxon::FlacReader::new(Cursor::new(audio.into_bytes())).expect("flac");
        assert_eq!(reader.streaminfo().sample_rate, 16_000);
        assert_eq!(reader.streaminfo().channels, 1);
        assert_eq!(reader.streaminfo().bits_per_sample, 16);

        let decoded: Vec<i32> = reader.samples().map(|s| s.expect("sample")).collect();
        assert_eq!(decoded.len(), original.len());

        for (i, (&d, &o)) in decoded.iter().zip(original.iter()).enumerate() {
            assert_eq!(d, expected_i32(o), "sample {i} mismatch");
        }
    }
}
