//! YM register-stream player
//!
//! A YM file is a dump of the AY-3-8910 / YM2149 registers taken once per
//! player tick (50 Hz on the Atari ST). Playback writes one frame of
//! registers per tick into a small PSG model and synthesizes mono samples
//! between ticks.
//!
//! Most YM files in the wild are single-member LHA archives (`-lh5-`);
//! those are depacked with `delharc` before parsing.

use std::io::{Cursor, Read, Seek, SeekFrom};

use delharc::LhaDecodeReader;
use tracing::debug;

use super::{ChipDecoder, DecodeError};

/// Atari ST PSG clock
const DEFAULT_CLOCK: u32 = 2_000_000;
const DEFAULT_PLAYER_RATE: u32 = 50;

const YM_V5_SIGNATURE: &[u8; 8] = b"LeOnArD!";

/// Attribute bit: register data stored one register at a time
const ATTR_INTERLEAVED: u32 = 1;

/// Registers stored per frame in YM5/YM6
const REGS_V5: usize = 16;
/// Registers stored per frame in YM2/YM3
const REGS_V3: usize = 14;

/// Largest depacked song accepted
const MAX_DEPACKED: u64 = 16 * 1024 * 1024;

/// Register 13 value meaning "envelope shape not written this frame"
const SHAPE_UNCHANGED: u8 = 0xff;

/// Per-channel amplitude for the 16 logarithmic volume levels.
/// Three channels at full level stay inside i16.
const LEVELS: [i32; 16] = [
    0, 137, 205, 291, 423, 618, 847, 1369, 1691, 2647, 3527, 4499, 5704, 6873, 8482, 10000,
];

/// DC blocker pole; the PSG output is unipolar
const DC_POLE: f32 = 0.995;

/// A parsed song
#[derive(Debug, Clone)]
struct Song {
    frames: Vec<[u8; REGS_V5]>,
    loop_frame: usize,
    clock: u32,
    player_rate: u32,
    title: String,
    author: String,
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, DecodeError> {
    let mut buf = [0u8; 2];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::Truncated("header"))?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| DecodeError::Truncated("header"))?;
    Ok(u32::from_be_bytes(buf))
}

fn skip(cursor: &mut Cursor<&[u8]>, len: u64, what: &'static str) -> Result<(), DecodeError> {
    let end = cursor.position() + len;
    if end > cursor.get_ref().len() as u64 {
        return Err(DecodeError::Truncated(what));
    }
    cursor
        .seek(SeekFrom::Start(end))
        .map_err(|_| DecodeError::Truncated(what))?;
    Ok(())
}

/// NUL-terminated string
fn read_cstr(cursor: &mut Cursor<&[u8]>) -> Result<String, DecodeError> {
    let data = *cursor.get_ref();
    let start = cursor.position() as usize;
    let len = data
        .get(start..)
        .and_then(|rest| rest.iter().position(|&b| b == 0))
        .ok_or(DecodeError::Truncated("song info"))?;
    cursor.set_position((start + len + 1) as u64);
    Ok(String::from_utf8_lossy(&data[start..start + len]).into_owned())
}

/// Split a register block into frames.
///
/// Interleaved blocks hold every frame's register 0, then every frame's
/// register 1, and so on.
fn split_frames(
    block: &[u8],
    count: usize,
    regs: usize,
    interleaved: bool,
) -> Result<Vec<[u8; REGS_V5]>, DecodeError> {
    if block.len() < count * regs {
        return Err(DecodeError::Truncated("register data"));
    }
    let mut frames = vec![[0u8; REGS_V5]; count];
    for (f, frame) in frames.iter_mut().enumerate() {
        for (r, reg) in frame.iter_mut().take(regs).enumerate() {
            *reg = if interleaved {
                block[r * count + f]
            } else {
                block[f * regs + r]
            };
        }
    }
    Ok(frames)
}

/// LHA headers carry the method id at offset 2, e.g. `-lh5-`
fn is_lha(data: &[u8]) -> bool {
    data.len() >= 7 && &data[2..5] == b"-lh" && data[6] == b'-'
}

fn depack_error(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Depack(e.to_string())
}

/// Extract the first member of an LHA archive
fn depack(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = LhaDecodeReader::new(data).map_err(depack_error)?;
    if !reader.is_decoder_supported() {
        return Err(DecodeError::Packed);
    }

    let mut out = Vec::new();
    (&mut reader)
        .take(MAX_DEPACKED + 1)
        .read_to_end(&mut out)
        .map_err(depack_error)?;
    if out.len() as u64 > MAX_DEPACKED {
        return Err(DecodeError::Depack(format!(
            "more than {MAX_DEPACKED} bytes unpacked"
        )));
    }
    reader.crc_check().map_err(depack_error)?;

    debug!("Depacked {} -> {} bytes", data.len(), out.len());
    Ok(out)
}

fn parse(data: &[u8]) -> Result<Song, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::TooSmall(data.len()));
    }
    if is_lha(data) {
        let unpacked = depack(data)?;
        if unpacked.len() < 4 {
            return Err(DecodeError::TooSmall(unpacked.len()));
        }
        return parse_unpacked(&unpacked);
    }
    parse_unpacked(data)
}

fn parse_unpacked(data: &[u8]) -> Result<Song, DecodeError> {
    match &data[0..4] {
        b"YM2!" | b"YM3!" => {
            let block = &data[4..];
            let count = block.len() / REGS_V3;
            let frames = split_frames(block, count, REGS_V3, true)?;
            Ok(Song {
                frames,
                loop_frame: 0,
                clock: DEFAULT_CLOCK,
                player_rate: DEFAULT_PLAYER_RATE,
                title: String::new(),
                author: String::new(),
            })
        },
        b"YM3b" => {
            if data.len() < 8 {
                return Err(DecodeError::TooSmall(data.len()));
            }
            let (block, tail) = data[4..].split_at(data.len() - 8);
            let loop_frame = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]) as usize;
            let count = block.len() / REGS_V3;
            let frames = split_frames(block, count, REGS_V3, true)?;
            Ok(Song {
                frames,
                loop_frame,
                clock: DEFAULT_CLOCK,
                player_rate: DEFAULT_PLAYER_RATE,
                title: String::new(),
                author: String::new(),
            })
        },
        b"YM4!" => parse_leonard(data, false),
        b"YM5!" | b"YM6!" => parse_leonard(data, true),
        _ => Err(DecodeError::InvalidMagic),
    }
}

/// YM4/YM5/YM6: `LeOnArD!` header, digidrums, song info, 16 registers a frame.
///
/// YM4 has a 32-bit drum count and no clock, rate or additional data.
fn parse_leonard(data: &[u8], v5: bool) -> Result<Song, DecodeError> {
    if data.len() < 12 || &data[4..12] != YM_V5_SIGNATURE {
        return Err(DecodeError::InvalidMagic);
    }
    let mut cursor = Cursor::new(data);
    cursor.set_position(12);

    let count = read_u32(&mut cursor)? as usize;
    let attributes = read_u32(&mut cursor)?;
    let (drums, clock, player_rate) = if v5 {
        let drums = u32::from(read_u16(&mut cursor)?);
        let clock = read_u32(&mut cursor)?;
        let player_rate = u32::from(read_u16(&mut cursor)?);
        (drums, clock, player_rate)
    } else {
        (read_u32(&mut cursor)?, DEFAULT_CLOCK, DEFAULT_PLAYER_RATE)
    };
    let loop_frame = read_u32(&mut cursor)? as usize;
    if v5 {
        let extra = read_u16(&mut cursor)?;
        skip(&mut cursor, u64::from(extra), "additional data")?;
    }

    // Digidrum samples are not played, only stepped over
    for _ in 0..drums {
        let size = read_u32(&mut cursor)?;
        skip(&mut cursor, u64::from(size), "digidrum")?;
    }

    let title = read_cstr(&mut cursor)?;
    let author = read_cstr(&mut cursor)?;
    let _comment = read_cstr(&mut cursor)?;

    let block = &data[cursor.position() as usize..];
    let frames = split_frames(
        block,
        count,
        REGS_V5,
        attributes & ATTR_INTERLEAVED != 0,
    )?;

    Ok(Song {
        frames,
        loop_frame,
        clock: if clock == 0 { DEFAULT_CLOCK } else { clock },
        player_rate: if player_rate == 0 {
            DEFAULT_PLAYER_RATE
        } else {
            player_rate
        },
        title,
        author,
    })
}

/// Envelope level (0-15) `step` steps after the shape was written.
///
/// Shape bits: 8 continue, 4 attack, 2 alternate, 1 hold.
fn envelope_level(shape: u8, step: u32) -> usize {
    let attack = shape & 4 != 0;
    let cycle = step / 16;
    let pos = (step % 16) as usize;

    if cycle == 0 {
        return if attack { pos } else { 15 - pos };
    }
    if shape & 8 == 0 {
        return 0;
    }
    let alternate = shape & 2 != 0;
    if shape & 1 != 0 {
        // Held at wherever the first ramp ended, flipped by alternate
        return if attack != alternate { 15 } else { 0 };
    }
    let rising = if alternate && cycle % 2 == 1 {
        !attack
    } else {
        attack
    };
    if rising {
        pos
    } else {
        15 - pos
    }
}

/// Minimal AY-3-8910 / YM2149 model
#[derive(Debug, Clone)]
struct Psg {
    clock: f32,
    rate: f32,
    regs: [u8; REGS_V5],
    tone_phase: [f32; 3],
    tone_step: [f32; 3],
    noise_acc: f32,
    noise_step: f32,
    lfsr: u32,
    noise_high: bool,
    env_acc: f32,
    env_inc: f32,
    env_step: u32,
    shape: u8,
    dc_in: f32,
    dc_out: f32,
}

impl Psg {
    fn new(clock: u32, rate: u32) -> Self {
        Self {
            clock: clock as f32,
            rate: rate.max(1) as f32,
            regs: [0; REGS_V5],
            tone_phase: [0.0; 3],
            tone_step: [0.0; 3],
            noise_acc: 0.0,
            noise_step: 0.0,
            lfsr: 1,
            noise_high: false,
            env_acc: 0.0,
            env_inc: 0.0,
            env_step: 0,
            shape: 0,
            dc_in: 0.0,
            dc_out: 0.0,
        }
    }

    fn write_frame(&mut self, frame: &[u8; REGS_V5]) {
        for ch in 0..3 {
            self.regs[ch * 2] = frame[ch * 2];
            // Upper bits of the coarse tune carry YM5/6 effect flags
            self.regs[ch * 2 + 1] = frame[ch * 2 + 1] & 0x0f;
            let period =
                u32::from(self.regs[ch * 2]) | (u32::from(self.regs[ch * 2 + 1]) << 8);
            self.tone_step[ch] = self.clock / (16.0 * period.max(1) as f32) / self.rate;
        }

        self.regs[6] = frame[6] & 0x1f;
        self.noise_step = self.clock / (16.0 * u32::from(self.regs[6]).max(1) as f32) / self.rate;

        self.regs[7] = frame[7];
        for ch in 0..3 {
            self.regs[8 + ch] = frame[8 + ch] & 0x1f;
        }

        self.regs[11] = frame[11];
        self.regs[12] = frame[12];
        let env_period = u32::from(self.regs[11]) | (u32::from(self.regs[12]) << 8);
        self.env_inc = self.clock / (16.0 * env_period.max(1) as f32) / self.rate;

        if frame[13] != SHAPE_UNCHANGED {
            self.shape = frame[13] & 0x0f;
            self.env_step = 0;
            self.env_acc = 0.0;
        }
    }

    fn clock_noise(&mut self) {
        // 17-bit LFSR, taps 0 and 3
        let bit = (self.lfsr ^ (self.lfsr >> 3)) & 1;
        self.lfsr = (self.lfsr >> 1) | (bit << 16);
        self.noise_high = self.lfsr & 1 == 1;
    }

    fn sample(&mut self) -> i16 {
        self.noise_acc += self.noise_step;
        while self.noise_acc >= 1.0 {
            self.noise_acc -= 1.0;
            self.clock_noise();
        }

        self.env_acc += self.env_inc;
        if self.env_acc >= 1.0 {
            let steps = self.env_acc.floor();
            self.env_acc -= steps;
            self.env_step = self.env_step.saturating_add(steps as u32);
            // Keep the cycle parity, stay past the first ramp
            while self.env_step >= 48 {
                self.env_step -= 32;
            }
        }
        let env_level = envelope_level(self.shape, self.env_step);

        let mixer = self.regs[7];
        let mut mix = 0;
        for ch in 0..3 {
            self.tone_phase[ch] = (self.tone_phase[ch] + self.tone_step[ch]).fract();
            // Above Nyquist the square wave is just a DC level
            let tone_high = self.tone_step[ch] >= 0.5 || self.tone_phase[ch] < 0.5;
            let tone_off = mixer & (1 << ch) != 0;
            let noise_off = mixer & (8 << ch) != 0;

            if (tone_high || tone_off) && (self.noise_high || noise_off) {
                let vol = self.regs[8 + ch];
                let level = if vol & 0x10 != 0 {
                    env_level
                } else {
                    usize::from(vol & 0x0f)
                };
                mix += LEVELS[level];
            }
        }

        let x = mix as f32;
        let y = x - self.dc_in + DC_POLE * self.dc_out;
        self.dc_in = x;
        self.dc_out = y;
        y.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
    }
}

/// [`ChipDecoder`] for YM2/YM3/YM3b/YM4/YM5/YM6 files, plain or LHA-packed
#[derive(Debug, Clone, Default)]
pub struct YmDecoder {
    song: Option<Song>,
    psg: Option<Psg>,
    samples_per_frame: u32,
    frame: usize,
    sample_in_frame: u32,
    looping: bool,
    finished: bool,
}

impl YmDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<&str> {
        self.song.as_ref().map(|s| s.title.as_str())
    }

    pub fn author(&self) -> Option<&str> {
        self.song.as_ref().map(|s| s.author.as_str())
    }

    pub fn frame_count(&self) -> usize {
        self.song.as_ref().map_or(0, |s| s.frames.len())
    }
}

impl ChipDecoder for YmDecoder {
    fn open(&mut self, data: &[u8], sample_rate: u32) -> Result<(), DecodeError> {
        let song = parse(data)?;
        if song.frames.is_empty() {
            return Err(DecodeError::Unsupported("song has no frames".into()));
        }
        debug!(
            "YM song '{}' by '{}': {} frames at {} Hz, clock {} Hz, loop at {}",
            song.title,
            song.author,
            song.frames.len(),
            song.player_rate,
            song.clock,
            song.loop_frame
        );

        self.samples_per_frame = (sample_rate / song.player_rate).max(1);
        self.psg = Some(Psg::new(song.clock, sample_rate));
        self.song = Some(song);
        self.frame = 0;
        self.sample_in_frame = 0;
        self.finished = false;
        Ok(())
    }

    fn compute(&mut self, out: &mut [i16]) -> bool {
        let (Some(song), Some(psg)) = (self.song.as_ref(), self.psg.as_mut()) else {
            out.fill(0);
            return false;
        };

        let mut more = true;
        for slot in out.iter_mut() {
            if self.finished {
                *slot = 0;
                more = false;
                continue;
            }
            if self.sample_in_frame == 0 {
                if self.frame >= song.frames.len() {
                    if self.looping {
                        self.frame = song.loop_frame.min(song.frames.len() - 1);
                    } else {
                        self.finished = true;
                        *slot = 0;
                        more = false;
                        continue;
                    }
                }
                psg.write_frame(&song.frames[self.frame]);
            }

            *slot = psg.sample();
            self.sample_in_frame += 1;
            if self.sample_in_frame >= self.samples_per_frame {
                self.sample_in_frame = 0;
                self.frame += 1;
            }
        }
        more
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn duration_ms(&self) -> u64 {
        self.song.as_ref().map_or(0, |s| {
            s.frames.len() as u64 * 1000 / u64::from(s.player_rate)
        })
    }

    fn seek_sample(&mut self, sample: u64) -> bool {
        let (Some(song), Some(psg)) = (self.song.as_ref(), self.psg.as_mut()) else {
            return false;
        };

        let spf = u64::from(self.samples_per_frame);
        let frame = (sample / spf) as usize;
        // Start from a clean chip so a seek sounds like a fresh start
        *psg = Psg::new(psg.clock as u32, psg.rate as u32);

        if frame >= song.frames.len() {
            self.frame = song.frames.len();
            self.sample_in_frame = 0;
            self.finished = !self.looping;
            return true;
        }

        self.frame = frame;
        self.sample_in_frame = (sample % spf) as u32;
        self.finished = false;
        if self.sample_in_frame != 0 {
            psg.write_frame(&song.frames[frame]);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    /// YM3 song: channel A square wave, tone period 100, full volume
    fn ym3_tone(frames: usize) -> Vec<u8> {
        let mut regs = [0u8; REGS_V3];
        regs[0] = 100;
        regs[7] = 0b0011_1110; // tone A only
        regs[8] = 15;
        regs[13] = SHAPE_UNCHANGED;

        let mut data = b"YM3!".to_vec();
        for reg in regs {
            data.extend(std::iter::repeat(reg).take(frames));
        }
        data
    }

    fn ym5(frames: usize, interleaved: bool, loop_frame: u32) -> Vec<u8> {
        let mut data = b"YM5!LeOnArD!".to_vec();
        data.extend((frames as u32).to_be_bytes());
        data.extend(u32::from(interleaved).to_be_bytes());
        data.extend(1u16.to_be_bytes()); // one digidrum
        data.extend(2_000_000u32.to_be_bytes());
        data.extend(50u16.to_be_bytes());
        data.extend(loop_frame.to_be_bytes());
        data.extend(2u16.to_be_bytes());
        data.extend([0xaa, 0xbb]); // additional data
        data.extend(3u32.to_be_bytes());
        data.extend([1, 2, 3]); // digidrum sample
        data.extend(b"Title\0Author\0Comment\0");
        for f in 0..frames {
            let mut regs = [0u8; REGS_V5];
            regs[0] = f as u8 + 1;
            regs[7] = 0b0011_1110;
            regs[8] = 12;
            regs[13] = SHAPE_UNCHANGED;
            data.extend(regs);
        }
        data.extend(b"End!");
        data
    }

    fn ym4(frames: usize) -> Vec<u8> {
        let mut data = b"YM4!LeOnArD!".to_vec();
        data.extend((frames as u32).to_be_bytes());
        data.extend(0u32.to_be_bytes()); // linear layout
        data.extend(1u32.to_be_bytes()); // one digidrum
        data.extend(2u32.to_be_bytes()); // loop frame
        data.extend(2u32.to_be_bytes());
        data.extend([9, 9]);
        data.extend(b"Four\0Someone\0\0");
        for f in 0..frames {
            let mut regs = [0u8; REGS_V5];
            regs[0] = 10 * f as u8;
            regs[13] = SHAPE_UNCHANGED;
            data.extend(regs);
        }
        data
    }

    /// MSB-first bit packer, as LHA streams are read
    #[derive(Default)]
    struct BitWriter {
        bytes: Vec<u8>,
        acc: u8,
        used: u32,
    }

    impl BitWriter {
        fn put(&mut self, value: u32, width: u32) {
            for i in (0..width).rev() {
                self.acc = (self.acc << 1) | ((value >> i) & 1) as u8;
                self.used += 1;
                if self.used == 8 {
                    self.bytes.push(self.acc);
                    self.acc = 0;
                    self.used = 0;
                }
            }
        }

        fn finish(mut self) -> Vec<u8> {
            if self.used > 0 {
                self.put(0, 8 - self.used);
            }
            self.bytes
        }
    }

    /// LH5 stream built from literal runs. Each run is its own block whose
    /// trees hold a single symbol, so every literal costs zero bits.
    fn lh5_runs(data: &[u8]) -> Vec<u8> {
        let mut bits = BitWriter::default();
        let mut rest = data;
        while let Some(&byte) = rest.first() {
            let run = rest.iter().take_while(|&&b| b == byte).count().min(0xffff);
            bits.put(run as u32, 16); // symbols in block
            bits.put(0, 5); // code-length tree: one symbol
            bits.put(0, 5);
            bits.put(0, 9); // literal tree: one symbol
            bits.put(u32::from(byte), 9);
            bits.put(0, 4); // offset tree: one symbol
            bits.put(0, 4);
            rest = &rest[run..];
        }
        let mut packed = bits.finish();
        packed.extend([0; 4]);
        packed
    }

    /// CRC-16/ARC, the LHA member checksum
    fn crc16(data: &[u8]) -> u16 {
        data.iter().fold(0u16, |crc, &b| {
            (0..8).fold(crc ^ u16::from(b), |c, _| {
                if c & 1 != 0 {
                    (c >> 1) ^ 0xa001
                } else {
                    c >> 1
                }
            })
        })
    }

    /// Single-member archive with a level-0 header
    fn lha_archive(name: &[u8], packed: &[u8], original: &[u8]) -> Vec<u8> {
        let mut header = b"-lh5-".to_vec();
        header.extend((packed.len() as u32).to_le_bytes());
        header.extend((original.len() as u32).to_le_bytes());
        header.extend([0, 0, 0x21, 0x28]); // 2000-01-01 00:00, DOS format
        header.extend([0x20, 0, name.len() as u8]); // attribute, level, name length
        header.extend(name);
        header.extend(crc16(original).to_le_bytes());

        let checksum = header.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
        let mut archive = vec![header.len() as u8, checksum];
        archive.extend(header);
        archive.extend(packed);
        archive.push(0); // end of archive
        archive
    }

    fn opened(data: &[u8], looping: bool) -> YmDecoder {
        let mut dec = YmDecoder::new();
        dec.open(data, RATE).unwrap();
        dec.set_loop(looping);
        dec
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut dec = YmDecoder::new();
        assert_eq!(dec.open(b"YM", RATE), Err(DecodeError::TooSmall(2)));
        assert_eq!(dec.open(b"RIFF....", RATE), Err(DecodeError::InvalidMagic));
        assert!(matches!(
            dec.open(b"\x1f\x00-lh5-rest", RATE),
            Err(DecodeError::Depack(_))
        ));
        assert_eq!(
            dec.open(b"YM5!NotLeonard", RATE),
            Err(DecodeError::InvalidMagic)
        );
        assert!(matches!(dec.open(b"YM3!", RATE), Err(DecodeError::Unsupported(_))));
    }

    #[test]
    fn test_lh5_packed_song_plays_like_plain() {
        let plain = ym3_tone(50);
        let archive = lha_archive(b"tone.ym", &lh5_runs(&plain), &plain);
        assert!(archive.len() < plain.len() / 4);

        let mut packed = opened(&archive, false);
        let mut reference = opened(&plain, false);
        assert_eq!(packed.frame_count(), 50);
        assert_eq!(packed.duration_ms(), 1000);

        let mut a = vec![0i16; 4410];
        let mut b = vec![0i16; 4410];
        packed.compute(&mut a);
        reference.compute(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_corrupt_archive_is_rejected() {
        let plain = ym3_tone(10);
        let mut archive = lha_archive(b"tone.ym", &lh5_runs(&plain), &plain);
        // Break the stored member CRC, keep the header checksum valid
        let header_end = 2 + usize::from(archive[0]);
        archive[header_end - 2] ^= 0xff;
        archive[1] = archive[2..header_end]
            .iter()
            .fold(0u8, |sum, &b| sum.wrapping_add(b));

        let mut dec = YmDecoder::new();
        assert!(matches!(dec.open(&archive, RATE), Err(DecodeError::Depack(_))));
        assert_eq!(dec.frame_count(), 0);
    }

    #[test]
    fn test_ym4_song() {
        let dec = opened(&ym4(4), false);
        assert_eq!(dec.frame_count(), 4);
        assert_eq!(dec.title(), Some("Four"));
        assert_eq!(dec.author(), Some("Someone"));
        assert_eq!(dec.duration_ms(), 80);
        let song = dec.song.as_ref().unwrap();
        assert_eq!(song.loop_frame, 2);
        assert_eq!(song.clock, DEFAULT_CLOCK);
        assert_eq!(song.frames[3][0], 30);
    }

    #[test]
    fn test_truncated_v5_is_rejected() {
        let mut data = ym5(4, false, 0);
        data.truncate(data.len() - 30);
        let mut dec = YmDecoder::new();
        assert!(matches!(dec.open(&data, RATE), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn test_ym3_duration() {
        let dec = opened(&ym3_tone(50), false);
        assert_eq!(dec.frame_count(), 50);
        assert_eq!(dec.duration_ms(), 1000);
    }

    #[test]
    fn test_ym5_header_fields() {
        let dec = opened(&ym5(3, false, 1), false);
        assert_eq!(dec.frame_count(), 3);
        assert_eq!(dec.title(), Some("Title"));
        assert_eq!(dec.author(), Some("Author"));
        assert_eq!(dec.duration_ms(), 60);
        let song = dec.song.as_ref().unwrap();
        assert_eq!(song.loop_frame, 1);
        assert_eq!(song.frames[2][0], 3);
    }

    #[test]
    fn test_interleaved_and_linear_layouts_agree() {
        let linear = [1, 2, 3, 4, 5, 6];
        let interleaved = [1, 4, 2, 5, 3, 6];
        assert_eq!(
            split_frames(&linear, 2, 3, false).unwrap(),
            split_frames(&interleaved, 2, 3, true).unwrap()
        );
    }

    #[test]
    fn test_tone_is_audible_then_ends() {
        let mut dec = opened(&ym3_tone(50), false);
        let mut buf = vec![0i16; 4410];
        let mut total = 0;
        let mut peak = 0i16;
        while dec.compute(&mut buf) {
            total += buf.len();
            peak = peak.max(buf.iter().copied().max().unwrap_or(0));
            assert!(total < RATE as usize * 2, "song never ended");
        }
        assert!(peak > 1000);
        // 50 frames of 882 samples, the last buffer ends exactly on the song end
        assert_eq!(total, 44_100);
        assert!(!dec.compute(&mut buf));
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_looping_song_keeps_going() {
        let mut dec = opened(&ym3_tone(5), true);
        let mut buf = vec![0i16; 4096];
        for _ in 0..50 {
            assert!(dec.compute(&mut buf));
        }
    }

    #[test]
    fn test_seek_to_start_replays_identically() {
        let data = ym3_tone(20);
        let mut fresh = opened(&data, false);
        let mut first = vec![0i16; 2000];
        fresh.compute(&mut first);

        let mut dec = opened(&data, false);
        let mut scratch = vec![0i16; 7000];
        dec.compute(&mut scratch);
        assert!(dec.seek_sample(0));
        let mut again = vec![0i16; 2000];
        dec.compute(&mut again);
        assert_eq!(first, again);
    }

    #[test]
    fn test_seek_past_end_finishes() {
        let mut dec = opened(&ym3_tone(5), false);
        assert!(dec.seek_sample(1_000_000));
        let mut buf = vec![1i16; 16];
        assert!(!dec.compute(&mut buf));
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_envelope_shapes() {
        // \___
        assert_eq!(envelope_level(0x0, 0), 15);
        assert_eq!(envelope_level(0x0, 15), 0);
        assert_eq!(envelope_level(0x0, 40), 0);
        // ////
        assert_eq!(envelope_level(0xC, 3), 3);
        assert_eq!(envelope_level(0xC, 19), 3);
        // /\/\
        assert_eq!(envelope_level(0xE, 16), 15);
        assert_eq!(envelope_level(0xE, 32), 0);
        // /‾‾‾
        assert_eq!(envelope_level(0xD, 20), 15);
        // \‾‾‾
        assert_eq!(envelope_level(0xB, 20), 15);
        // /___
        assert_eq!(envelope_level(0xF, 20), 0);
    }

    #[test]
    fn test_compute_before_open_is_silent() {
        let mut dec = YmDecoder::new();
        let mut buf = [3i16; 8];
        assert!(!dec.compute(&mut buf));
        assert_eq!(buf, [0; 8]);
    }
}
