//! Lock-guarded PCM stream over a chip decoder
//!
//! The render thread adjusts volume and seeks while SDL's audio thread
//! pulls samples. Both go through the same mutex; every operation holds it
//! for its whole (bounded, non-blocking) duration.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

use super::{ChipDecoder, DecodeError};

/// Mono samples requested from the decoder per call
pub const SCRATCH_SAMPLES: usize = 4096;

/// Volume a freshly loaded stream starts at
pub const DEFAULT_VOLUME: f32 = 0.5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("failed to load music: {0}")]
    Load(#[from] DecodeError),
    #[error("invalid seek mode: {0}")]
    InvalidSeekMode(i32),
    #[error("audio stream is closed")]
    Closed,
}

/// Reference point for [`AudioStream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for SeekMode {
    type Error = StreamError;

    /// Classic whence values: 0 start, 1 current, 2 end
    fn try_from(whence: i32) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidSeekMode(other)),
        }
    }
}

/// Little-endian interleaved stereo i16 bytes from one read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmChunk {
    pub bytes: Vec<u8>,
    pub end_of_stream: bool,
}

impl PcmChunk {
    /// Stereo frames held (4 bytes each)
    pub fn frames(&self) -> usize {
        self.bytes.len() / 4
    }
}

struct StreamState {
    /// `None` once closed
    decoder: Option<Box<dyn ChipDecoder>>,
    scratch: Box<[i16]>,
    position: u64,
    /// Decoder ran dry in non-looping mode; only silence from here on
    exhausted: bool,
    volume: f32,
}

/// A decoder turned into a seekable, volume-controlled stereo stream
pub struct AudioStream {
    state: Mutex<StreamState>,
    sample_rate: u32,
    total_samples: u64,
    looping: bool,
}

impl AudioStream {
    /// Open `data` with `decoder` at `sample_rate`.
    ///
    /// The decoder is consumed either way; on failure it is dropped here,
    /// releasing whatever it had allocated.
    pub fn load<D>(
        mut decoder: D,
        data: &[u8],
        sample_rate: u32,
        looping: bool,
    ) -> Result<Self, StreamError>
    where
        D: ChipDecoder + 'static,
    {
        decoder.open(data, sample_rate)?;
        decoder.set_loop(looping);

        let total_samples = decoder.duration_ms() * u64::from(sample_rate) / 1000;
        info!(
            "Music loaded: {} ms, {} samples at {} Hz, loop {}",
            decoder.duration_ms(),
            total_samples,
            sample_rate,
            looping
        );

        Ok(Self {
            state: Mutex::new(StreamState {
                decoder: Some(Box::new(decoder)),
                scratch: vec![0; SCRATCH_SAMPLES].into_boxed_slice(),
                position: 0,
                exhausted: false,
                volume: DEFAULT_VOLUME,
            }),
            sample_rate,
            total_samples,
            looping,
        })
    }

    /// State is plain data and consistent after every operation, so a
    /// panic elsewhere while holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Song length in mono samples, fixed at load
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_closed(&self) -> bool {
        self.lock().decoder.is_none()
    }

    /// Logical playback position in mono samples
    pub fn position(&self) -> u64 {
        self.lock().position
    }

    /// Fill an interleaved stereo buffer, returning end-of-stream.
    ///
    /// Every frame of `out` is written: decoded samples scaled by the
    /// current volume and duplicated into both channels, then silence once
    /// a non-looping song runs dry. After `close` the buffer is silenced
    /// and `true` is returned without touching any decoder.
    pub fn fill(&self, out: &mut [i16]) -> bool {
        let mut state = self.lock();
        self.fill_locked(&mut state, out)
    }

    fn fill_locked(&self, state: &mut StreamState, out: &mut [i16]) -> bool {
        let frames = out.len() / 2;
        // A dangling half frame is never part of the stream
        out[frames * 2..].fill(0);
        let out = &mut out[..frames * 2];

        let Some(decoder) = state.decoder.as_mut() else {
            out.fill(0);
            return true;
        };

        if state.exhausted {
            out.fill(0);
            state.position = self.advance(state.position, frames);
            return true;
        }

        let volume = state.volume;
        let mut processed = 0;
        let mut end_of_stream = false;

        while processed < frames {
            let chunk = (frames - processed).min(state.scratch.len());
            let scratch = &mut state.scratch[..chunk];

            if !decoder.compute(scratch) && !self.looping {
                out[processed * 2..].fill(0);
                state.exhausted = true;
                end_of_stream = true;
                debug!("Music ended at sample {}", state.position);
                break;
            }

            let dest = &mut out[processed * 2..(processed + chunk) * 2];
            for (pair, &sample) in dest.chunks_exact_mut(2).zip(scratch.iter()) {
                // `as` saturates, which is the 16-bit truncation we want
                let scaled = (f32::from(sample) * volume) as i16;
                pair[0] = scaled;
                pair[1] = scaled;
            }
            processed += chunk;
        }

        // The silent tail counts toward the position too
        state.position = self.advance(state.position, frames);
        end_of_stream
    }

    /// Pull `frame_count` stereo frames as little-endian bytes.
    ///
    /// A closed stream returns no bytes and `end_of_stream`.
    pub fn read(&self, frame_count: usize) -> PcmChunk {
        let mut state = self.lock();
        if state.decoder.is_none() {
            return PcmChunk {
                bytes: Vec::new(),
                end_of_stream: true,
            };
        }

        let mut samples = vec![0i16; frame_count * 2];
        let end_of_stream = self.fill_locked(&mut state, &mut samples);
        let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        PcmChunk {
            bytes,
            end_of_stream,
        }
    }

    fn advance(&self, position: u64, frames: usize) -> u64 {
        let next = position.saturating_add(frames as u64);
        if self.looping {
            next
        } else {
            next.min(self.total_samples)
        }
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    /// Set the gain applied to every following sample.
    ///
    /// Not clamped: callers keep it within [0, 1].
    pub fn set_volume(&self, volume: f32) -> Result<(), StreamError> {
        let mut state = self.lock();
        if state.decoder.is_none() {
            return Err(StreamError::Closed);
        }
        state.volume = volume;
        Ok(())
    }

    /// Move the logical position, clamped to `[0, total_samples]`.
    ///
    /// The decoder is asked to follow; one that cannot seek keeps playing
    /// from where it is, and position and audible output drift apart.
    pub fn seek(&self, offset: i64, mode: SeekMode) -> Result<u64, StreamError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(decoder) = state.decoder.as_mut() else {
            return Err(StreamError::Closed);
        };

        let total = i64::try_from(self.total_samples).unwrap_or(i64::MAX);
        let current = i64::try_from(state.position).unwrap_or(i64::MAX);
        let base = match mode {
            SeekMode::Start => 0,
            SeekMode::Current => current,
            SeekMode::End => total,
        };
        let target = base.saturating_add(offset).clamp(0, total) as u64;
        state.position = target;

        if decoder.seek_sample(target) {
            state.exhausted = false;
            debug!("Seeked to sample {}", target);
        } else {
            debug!(
                "Decoder cannot seek; logical position {} no longer matches output",
                target
            );
        }
        Ok(target)
    }

    /// [`seek`](Self::seek) with a raw whence value
    pub fn seek_whence(&self, offset: i64, whence: i32) -> Result<u64, StreamError> {
        self.seek(offset, SeekMode::try_from(whence)?)
    }

    /// Release the decoder. Returns `true` only for the call that did it.
    pub fn close(&self) -> bool {
        let decoder = self.lock().decoder.take();
        let released = decoder.is_some();
        drop(decoder);
        if released {
            info!("Audio stream closed");
        }
        released
    }
}
