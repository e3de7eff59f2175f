//! Audio decoding
//!
//! Supports WAV, MP3, FLAC and OGG with dedicated pure Rust decoders, and
//! falls back to Symphonia for containers such as M4A.

mod container;
mod decoder;

pub use container::decode_with_symphonia;
pub use decoder::{decode_audio, AudioData};

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,

    // Container formats handled by Symphonia
    Mp4,
    Mkv,

    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            Some("mp4") | Some("m4a") | Some("aac") => AudioFormat::Mp4,
            Some("mkv") | Some("mka") | Some("webm") => AudioFormat::Mkv,
            _ => AudioFormat::Unknown,
        }
    }

    /// Check if format is decoded through Symphonia
    pub fn is_container(&self) -> bool {
        matches!(self, AudioFormat::Mp4 | AudioFormat::Mkv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioFormat::from_path(Path::new("a/b/song.mp3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("song.WAV")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("song.m4a")), AudioFormat::Mp4);
        assert_eq!(AudioFormat::from_path(Path::new("song")), AudioFormat::Unknown);
        assert!(AudioFormat::Mkv.is_container());
        assert!(!AudioFormat::Flac.is_container());
    }
}
