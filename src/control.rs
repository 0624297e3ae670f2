//! Playback and animation controls
//!
//! Keyboard and remote (MQTT) input are both turned into [`Command`]s and
//! applied through [`Controls`], which owns the animation speed and drives
//! the audio stream's volume and position.

use sdl2::keyboard::Keycode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::audio::{AudioStream, SeekMode, StreamError};

pub const VOLUME_STEP: f32 = 0.05;
pub const SPEED_STEP: f32 = 0.1;
pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// Seconds skipped by the arrow keys
const SEEK_STEP_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    VolumeUp,
    VolumeDown,
    SetVolume(f32),
    SpeedUp,
    SpeedDown,
    SetSpeed(f32),
    /// Music back to the first sample
    Restart,
    /// Relative seek in whole seconds
    SeekSeconds(i64),
    Quit,
}

/// What the frame loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// JSON form of a remote command, e.g. `{"volume": 0.3}` or `{"command": "quit"}`
#[derive(Deserialize)]
struct JsonCommand {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    volume: Option<f32>,
    #[serde(default)]
    speed: Option<f32>,
    #[serde(default)]
    seek: Option<i64>,
}

/// Parse a text or JSON command
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if text.starts_with('{') {
        let json: JsonCommand = serde_json::from_str(text).ok()?;
        return json
            .volume
            .map(Command::SetVolume)
            .or_else(|| json.speed.map(Command::SetSpeed))
            .or_else(|| json.seek.map(Command::SeekSeconds))
            .or_else(|| json.command.as_deref().and_then(parse_command));
    }

    let line = text.to_lowercase();
    match line.as_str() {
        "vol+" | "volume+" | "louder" => Some(Command::VolumeUp),
        "vol-" | "volume-" | "quieter" => Some(Command::VolumeDown),
        "speed+" | "faster" => Some(Command::SpeedUp),
        "speed-" | "slower" => Some(Command::SpeedDown),
        "restart" | "rewind" => Some(Command::Restart),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => {
            let (verb, arg) = line.split_once(char::is_whitespace)?;
            let arg = arg.trim();
            match verb {
                "vol" | "volume" => arg.parse().ok().map(Command::SetVolume),
                "speed" => arg.parse().ok().map(Command::SetSpeed),
                "seek" => arg.parse().ok().map(Command::SeekSeconds),
                _ => None,
            }
        },
    }
}

/// Keyboard binding. While a key is held only volume keeps stepping;
/// speed, seek and restart need a fresh press.
pub fn command_for_key(key: Keycode, repeat: bool) -> Option<Command> {
    let command = match key {
        Keycode::Up => Some(Command::VolumeUp),
        Keycode::Down => Some(Command::VolumeDown),
        Keycode::Plus | Keycode::Equals | Keycode::KpPlus => Some(Command::SpeedUp),
        Keycode::Minus | Keycode::KpMinus => Some(Command::SpeedDown),
        Keycode::Home => Some(Command::Restart),
        Keycode::Left => Some(Command::SeekSeconds(-SEEK_STEP_SECS)),
        Keycode::Right => Some(Command::SeekSeconds(SEEK_STEP_SECS)),
        Keycode::Escape => Some(Command::Quit),
        _ => None,
    }?;
    match command {
        Command::VolumeUp | Command::VolumeDown => Some(command),
        _ if repeat => None,
        _ => Some(command),
    }
}

/// Animation speed plus the handle to the music stream, if any
#[derive(Debug, Clone)]
pub struct Controls {
    speed: f32,
}

impl Controls {
    pub fn new(speed: f32) -> Self {
        Self {
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
        }
    }

    /// Animation speed multiplier
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn apply(&mut self, command: Command, stream: Option<&AudioStream>) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::SpeedUp => self.set_speed(self.speed + SPEED_STEP),
            Command::SpeedDown => self.set_speed(self.speed - SPEED_STEP),
            Command::SetSpeed(speed) => self.set_speed(speed),
            Command::VolumeUp | Command::VolumeDown | Command::SetVolume(_) => {
                if let Some(stream) = stream {
                    log_stream_error(change_volume(stream, command));
                }
            },
            Command::Restart => {
                if let Some(stream) = stream {
                    log_stream_error(
                        stream
                            .seek(0, SeekMode::Start)
                            .map(|_| info!("Music restarted")),
                    );
                }
            },
            Command::SeekSeconds(secs) => {
                if let Some(stream) = stream {
                    let offset = secs.saturating_mul(i64::from(stream.sample_rate()));
                    log_stream_error(stream.seek(offset, SeekMode::Current).map(|pos| {
                        debug!("Music at {:.1}s", pos as f32 / stream.sample_rate() as f32);
                    }));
                }
            },
        }
        Flow::Continue
    }

    fn set_speed(&mut self, speed: f32) {
        if !speed.is_finite() {
            return;
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        debug!("Speed {:.1}x", self.speed);
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// The stream takes any volume; clamping to [0, 1] happens here
fn change_volume(stream: &AudioStream, command: Command) -> Result<(), StreamError> {
    let target = match command {
        Command::VolumeUp => stream.volume() + VOLUME_STEP,
        Command::VolumeDown => stream.volume() - VOLUME_STEP,
        Command::SetVolume(v) if v.is_finite() => v,
        _ => return Ok(()),
    };
    stream.set_volume(target.clamp(0.0, 1.0))?;
    debug!("Volume {:.2}", stream.volume());
    Ok(())
}

fn log_stream_error(result: Result<(), StreamError>) {
    if let Err(e) = result {
        debug!("Ignoring control: {}", e);
    }
}
