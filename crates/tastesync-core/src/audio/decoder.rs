//! Audio decoding for multiple formats

use super::AudioFormat;
use anyhow::{Context, Result};
use std::path::Path;

/// Decoded audio data (interleaved samples at the file's native rate)
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let frames = samples.len() as f64 / channels.max(1) as f64;
        let duration_ms = if sample_rate == 0 {
            0
        } else {
            (frames / sample_rate as f64 * 1000.0) as u32
        };

        Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        }
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    }
}

/// Decode audio file, keeping its native sample rate
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    if !path.exists() {
        anyhow::bail!("Audio file not found: {}", path.display());
    }

    let format = AudioFormat::from_path(path);

    let audio_data = match format {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 => decode_mp3(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Ogg => decode_ogg(path)?,
        // Let Symphonia probe containers and unknown extensions
        AudioFormat::Mp4 | AudioFormat::Mkv | AudioFormat::Unknown => {
            super::decode_with_symphonia(path)?
        }
    };

    if audio_data.samples.is_empty() {
        anyhow::bail!("No audio samples decoded from {}", path.display());
    }

    log::debug!(
        "Decoded {}: {} samples, {} channel(s) @ {}Hz",
        path.display(),
        audio_data.samples.len(),
        audio_data.channels,
        audio_data.sample_rate
    );

    Ok(audio_data)
}

/// Decode WAV file
fn decode_wav(path: &Path) -> Result<AudioData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioData::new(samples, spec.sample_rate, spec.channels))
}

/// Decode MP3 file
fn decode_mp3(path: &Path) -> Result<AudioData> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read MP3 file: {}", path.display()))?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error in {}: {}", path.display(), e),
        }
    }

    Ok(AudioData::new(samples, sample_rate, channels))
}

/// Decode FLAC file
fn decode_flac(path: &Path) -> Result<AudioData> {
    let mut reader = claxon::FlacReader::open(path)
        .with_context(|| format!("Failed to open FLAC file: {}", path.display()))?;

    let info = reader.streaminfo();
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;
    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AudioData::new(samples, info.sample_rate, info.channels as u16))
}

/// Decode OGG Vorbis file
fn decode_ogg(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open OGG file: {}", path.display()))?;

    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }

    Ok(AudioData::new(samples, sample_rate, channels))
}
