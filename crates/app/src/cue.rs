use std::{fmt, io::Cursor, path::Path};

use heartbeat_trainer_core::{AudioCue, SilentCue};
use rodio::{source::Buffered, Decoder, OutputStream, Sink, Source};
use thiserror::Error;

type CueSound = Buffered<Decoder<Cursor<Vec<u8>>>>;

#[derive(Debug, Error)]
pub enum CueError {
    #[error("failed to read cue asset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode cue asset: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("no audio output available: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("failed to open audio sink: {0}")]
    Play(#[from] rodio::PlayError),
}

/// Decodes a cue asset once; every play replays the buffered samples.
pub fn decode_cue(bytes: Vec<u8>) -> Result<CueSound, CueError> {
    Ok(Decoder::new(Cursor::new(bytes))?.buffered())
}

/// Beat cue played through the default output device.
pub struct SinkCue {
    _stream: OutputStream,
    sink: Sink,
    sound: CueSound,
    volume: f32,
}

impl SinkCue {
    pub fn open(path: &Path, volume: f32) -> Result<Self, CueError> {
        let sound = decode_cue(std::fs::read(path)?)?;
        let (stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;

        let volume = volume.clamp(0.0, 1.0);
        sink.set_volume(volume);

        Ok(Self {
            _stream: stream,
            sink,
            sound,
            volume,
        })
    }
}

impl AudioCue for SinkCue {
    fn play_cue(&mut self) {
        self.sink.append(self.sound.clone());
    }
}

impl fmt::Debug for SinkCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkCue")
            .field("volume", &self.volume)
            .field("queued", &self.sink.len())
            .finish()
    }
}

/// Opens the configured cue. A missing asset, an undecodable file or a
/// machine without audio output is logged and yields a silent cue.
pub fn load_cue(path: Option<&str>, volume: f32) -> Box<dyn AudioCue> {
    let Some(path) = path else {
        return Box::new(SilentCue);
    };

    match SinkCue::open(Path::new(path), volume) {
        Ok(cue) => {
            tracing::info!(path, volume = cue.volume, "cue asset loaded");
            Box::new(cue)
        }
        Err(err) => {
            tracing::warn!(path, %err, "cue unavailable, playback disabled");
            Box::new(SilentCue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_wav(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn decodes_pcm_wav_once_and_replays_it() {
        let sound = decode_cue(pcm_wav(&[0, 1000, -1000, 0])).unwrap();
        assert_eq!(sound.channels(), 1);
        assert_eq!(sound.sample_rate(), 8000);

        assert_eq!(sound.clone().count(), 4);
        assert_eq!(sound.count(), 4);
    }

    #[test]
    fn undecodable_asset_is_rejected() {
        let err = decode_cue(b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec()).err().unwrap();
        assert!(matches!(err, CueError::Decode(_)));
    }

    #[test]
    fn missing_asset_falls_back_to_silence() {
        let mut cue = load_cue(Some("/no/such/beep-03.wav"), 1.0);
        assert_eq!(format!("{cue:?}"), "SilentCue");
        cue.play_cue();
        cue.play_cue();
    }

    #[test]
    fn unconfigured_cue_is_silent() {
        let cue = load_cue(None, 0.5);
        assert_eq!(format!("{cue:?}"), "SilentCue");
    }
}
