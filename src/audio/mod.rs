//! Chip-music streaming
//!
//! A chip decoder synthesizes mono samples on demand. [`AudioStream`] wraps
//! one decoder behind a lock and turns it into an interleaved stereo i16
//! stream that SDL's audio thread pulls through [`StreamSink`].

mod output;
mod stream;
mod ym;

pub use output::{open_output, StreamSink};
pub use stream::{AudioStream, PcmChunk, SeekMode, StreamError, SCRATCH_SAMPLES};
pub use ym::YmDecoder;

use thiserror::Error;

/// Output sample rate (44.1 kHz)
pub const SAMPLE_RATE: u32 = 44_100;

/// Why a decoder refused a music blob
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("music data too small ({0} bytes)")]
    TooSmall(usize),
    #[error("unrecognized music format")]
    InvalidMagic,
    /// LHA archive using a compression method that cannot be depacked
    #[error("music data is packed with an unsupported LHA method")]
    Packed,
    #[error("cannot depack music data: {0}")]
    Depack(String),
    #[error("music data truncated: {0}")]
    Truncated(&'static str),
    #[error("unsupported music data: {0}")]
    Unsupported(String),
}

/// What the stream needs from a chip-music decoder.
///
/// Ownership of the decoder is the release contract: whatever native
/// resource it holds is freed when the value is dropped, so the stream
/// frees it exactly once by dropping it.
pub trait ChipDecoder: Send {
    /// Parse `data` and prepare to synthesize at `sample_rate`
    fn open(&mut self, data: &[u8], sample_rate: u32) -> Result<(), DecodeError>;

    /// Fill `out` with the next mono samples.
    ///
    /// Returns `false` once the music has run out (never while looping).
    fn compute(&mut self, out: &mut [i16]) -> bool;

    fn set_loop(&mut self, looping: bool);

    /// Length of one pass through the song
    fn duration_ms(&self) -> u64;

    /// Move playback to an absolute sample offset.
    ///
    /// Decoders without random access keep the default and return `false`.
    fn seek_sample(&mut self, _sample: u64) -> bool {
        false
    }
}
