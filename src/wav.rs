//! WAV codec: 16-bit PCM encoding, decoding through `hound`.
//!
//! Encoding writes the canonical 44-byte header layout: `RIFF`/`WAVE`, a
//! 16-byte `fmt ` chunk with format tag 1, then a `data` chunk of
//! interleaved little-endian i16 samples. Positive samples scale by 32767,
//! negative ones by 32768, and decoding inverts the same mapping.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::buffer::SampleBuffer;
use crate::error::FxError;

const FORMAT_PCM: u16 = 1;

/// Encode a buffer as a 16-bit PCM WAV file.
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>, FxError> {
    let channels = u16::try_from(buffer.num_channels())
        .map_err(|_| FxError::encode("too many channels for WAV"))?;
    let data_size = buffer
        .len()
        .checked_mul(buffer.num_channels() * 2)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n <= u32::MAX - 36)
        .ok_or_else(|| FxError::encode("audio too long for a WAV file"))?;

    let mut interleaved = Vec::with_capacity(buffer.len() * buffer.num_channels());
    for i in 0..buffer.len() {
        for c in 0..buffer.num_channels() {
            interleaved.push(float_to_i16(buffer.channel(c)[i]));
        }
    }
    Ok(encode_wav(&interleaved, buffer.sample_rate(), channels, data_size))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16, data_size: u32) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

fn float_to_i16(s: f32) -> i16 {
    let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
    if s < 0.0 {
        (s * 32768.0).round() as i16
    } else {
        (s * 32767.0).round() as i16
    }
}

fn i16_to_float(s: i16) -> f32 {
    if s < 0 {
        s as f32 / 32768.0
    } else {
        s as f32 / 32767.0
    }
}

/// Decode a WAV file: integer PCM up to 32 bits or 32-bit float.
///
/// 16-bit input uses the same asymmetric scale as [`encode`], so a decoded
/// file re-encodes to identical bytes.
pub fn decode(bytes: &[u8]) -> Result<SampleBuffer, FxError> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(decode_error)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(FxError::decode("fmt chunk declares zero channels"));
    }
    if spec.sample_rate == 0 {
        return Err(FxError::decode("fmt chunk declares zero sample rate"));
    }

    let num_channels = spec.channels as usize;
    let mut channels = vec![Vec::with_capacity(reader.duration() as usize); num_channels];
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => {
            for (k, s) in reader.samples::<f32>().enumerate() {
                channels[k % num_channels].push(s.map_err(decode_error)?);
            }
        }
        (SampleFormat::Int, 16) => {
            for (k, s) in reader.samples::<i16>().enumerate() {
                channels[k % num_channels].push(i16_to_float(s.map_err(decode_error)?));
            }
        }
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f64;
            for (k, s) in reader.samples::<i32>().enumerate() {
                let v = s.map_err(decode_error)?;
                channels[k % num_channels].push((v as f64 / scale) as f32);
            }
        }
        (format, bits) => {
            return Err(FxError::decode(format!(
                "unsupported sample format ({format:?}, {bits} bits)"
            )));
        }
    }

    // A trailing partial frame is dropped.
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for ch in channels.iter_mut() {
        ch.truncate(frames);
    }
    SampleBuffer::new(channels, spec.sample_rate).map_err(|e| FxError::decode(e.to_string()))
}

fn decode_error(e: hound::Error) -> FxError {
    FxError::decode(e.to_string())
}
