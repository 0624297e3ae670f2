//! Audio output through SDL2's callback-driven playback device

use std::sync::Arc;

use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use sdl2::AudioSubsystem;
use tracing::{debug, info, warn};

use super::AudioStream;

/// Device buffer in stereo frames (~23ms at 44.1kHz)
const DEVICE_BUFFER_FRAMES: u16 = 1024;

/// Pulls interleaved stereo frames from the stream on SDL's audio thread
pub struct StreamSink {
    stream: Arc<AudioStream>,
    ended: bool,
}

impl StreamSink {
    pub fn new(stream: Arc<AudioStream>) -> Self {
        Self {
            stream,
            ended: false,
        }
    }
}

impl AudioCallback for StreamSink {
    type Channel = i16;

    fn callback(&mut self, out: &mut [i16]) {
        let end_of_stream = self.stream.fill(out);
        if end_of_stream && !self.ended {
            self.ended = true;
            debug!("Audio sink reached end of stream");
        }
    }
}

/// Open the default playback device and start pulling from `stream`.
///
/// Playback stops when the returned device is dropped.
pub fn open_output(
    audio: &AudioSubsystem,
    stream: Arc<AudioStream>,
) -> Result<AudioDevice<StreamSink>, String> {
    let rate = stream.sample_rate() as i32;
    let desired = AudioSpecDesired {
        freq: Some(rate),
        channels: Some(2),
        samples: Some(DEVICE_BUFFER_FRAMES),
    };

    let device = audio.open_playback(None, &desired, |spec| {
        info!(
            "Audio device opened: {} Hz, {} channels, {} frame buffer",
            spec.freq, spec.channels, spec.samples
        );
        if spec.freq != rate {
            warn!(
                "Audio device runs at {} Hz, music is rendered at {} Hz",
                spec.freq, rate
            );
        }
        StreamSink::new(stream)
    })?;

    device.resume();
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ChipDecoder, DecodeError};

    /// Constant tone that stops after `left` samples
    struct Tone {
        left: usize,
    }

    impl ChipDecoder for Tone {
        fn open(&mut self, _data: &[u8], _sample_rate: u32) -> Result<(), DecodeError> {
            Ok(())
        }

        fn compute(&mut self, out: &mut [i16]) -> bool {
            for slot in out.iter_mut() {
                *slot = if self.left > 0 { 1000 } else { 0 };
                self.left = self.left.saturating_sub(1);
            }
            self.left > 0
        }

        fn set_loop(&mut self, _looping: bool) {}

        fn duration_ms(&self) -> u64 {
            1000
        }
    }

    #[test]
    fn test_sink_fills_device_buffer() {
        let stream = Arc::new(AudioStream::load(Tone { left: 10_000 }, b"x", 44_100, false).unwrap());
        stream.set_volume(1.0).unwrap();
        let mut sink = StreamSink::new(Arc::clone(&stream));

        let mut out = vec![0i16; 2048];
        sink.callback(&mut out);
        assert!(out.iter().all(|&s| s == 1000));
        assert!(!sink.ended);
        assert_eq!(stream.position(), 1024);
    }

    #[test]
    fn test_sink_goes_silent_after_close() {
        let stream = Arc::new(AudioStream::load(Tone { left: 10_000 }, b"x", 44_100, true).unwrap());
        let mut sink = StreamSink::new(Arc::clone(&stream));
        stream.close();

        let mut out = vec![5i16; 256];
        sink.callback(&mut out);
        assert!(out.iter().all(|&s| s == 0));
        assert!(sink.ended);
    }
}
