//! Demo configuration
//!
//! Defaults, overridden by `cubetune.json` (or `--config PATH`), overridden
//! by command-line flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::mqtt::parse_target;
use crate::solid::DEFAULT_FOCAL_LENGTH;

pub const DEFAULT_CONFIG_PATH: &str = "cubetune.json";

/// Largest accepted window edge in pixels
const MAX_DIMENSION: u32 = 16_384;

/// Cube half-diagonal over edge length (sqrt(3) / 2, rounded up)
const HALF_DIAGONAL_RATIO: f32 = 0.87;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// YM file to play; silent when unset
    pub music: Option<PathBuf>,
    pub looping: bool,
    pub volume: f32,
    pub cube_count: usize,
    pub cube_size: f32,
    pub focal_length: f32,
    /// Animation speed multiplier
    pub speed: f32,
    pub mqtt: Option<MqttConfig>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            vsync: true,
            music: None,
            looping: true,
            volume: 0.5,
            cube_count: 12,
            cube_size: 20.0,
            focal_length: DEFAULT_FOCAL_LENGTH,
            speed: 1.0,
            mqtt: None,
        }
    }
}

/// What the command line asked for
#[derive(Debug)]
pub enum Launch {
    Run(DemoConfig),
    Help,
}

impl DemoConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load, reporting problems and falling back to defaults.
    /// A missing default file is not worth a warning.
    fn load_or_default(path: &Path, explicit: bool) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Read { source, .. })
                if !explicit && source.kind() == io::ErrorKind::NotFound =>
            {
                Self::default()
            },
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            },
        }
    }

    /// Build the configuration from the process arguments
    pub fn from_args(args: &[String]) -> Result<Launch, ConfigError> {
        if args.iter().skip(1).any(|a| a == "--help") {
            return Ok(Launch::Help);
        }

        let explicit = args
            .windows(2)
            .find(|pair| pair[0] == "--config")
            .map(|pair| PathBuf::from(&pair[1]));
        let mut config = match &explicit {
            Some(path) => Self::load_or_default(path, true),
            None => Self::load_or_default(Path::new(DEFAULT_CONFIG_PATH), false),
        };
        config.apply_args(args)?;
        Ok(Launch::Run(config))
    }

    /// Apply command-line overrides. `args[0]` is the program name.
    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--no-vsync" => self.vsync = false,
                "--no-loop" => self.looping = false,
                "--width" | "-w" => self.width = parse_value(flag, value(args, i)?)?,
                "--height" | "-h" => self.height = parse_value(flag, value(args, i)?)?,
                "--resolution" | "-r" => {
                    // WxH, e.g. 1920x1080
                    let res = value(args, i)?;
                    let (w, h) = res.split_once('x').ok_or_else(|| {
                        ConfigError::InvalidArgument(format!("{flag} expects WxH, got '{res}'"))
                    })?;
                    self.width = parse_value(flag, w)?;
                    self.height = parse_value(flag, h)?;
                },
                "--music" => self.music = Some(PathBuf::from(value(args, i)?)),
                "--mqtt" => {
                    let (host, topic) = parse_target(value(args, i)?);
                    self.mqtt = Some(MqttConfig { host, topic });
                },
                // Already consumed by from_args
                "--config" => {
                    value(args, i)?;
                },
                other => {
                    return Err(ConfigError::InvalidArgument(format!(
                        "unknown option '{other}' (try --help)"
                    )));
                },
            }
            if takes_value(flag) {
                i += 1;
            }
            i += 1;
        }

        self.validate()
    }

    /// Reject settings the renderer cannot draw
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidArgument(format!(
                "resolution {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ConfigError::InvalidArgument(format!(
                "resolution {}x{} exceeds {MAX_DIMENSION} pixels per edge",
                self.width, self.height
            )));
        }
        if !(self.cube_size.is_finite() && self.cube_size > 0.0) {
            return Err(ConfigError::InvalidArgument(format!(
                "cube_size {} must be a positive number",
                self.cube_size
            )));
        }
        // Every corner must stay in front of the eye in any orientation
        let half_diagonal = self.cube_size * HALF_DIAGONAL_RATIO;
        if !(self.focal_length.is_finite() && self.focal_length > half_diagonal) {
            return Err(ConfigError::InvalidArgument(format!(
                "focal_length {} must exceed {half_diagonal} for cubes of size {}",
                self.focal_length, self.cube_size
            )));
        }
        Ok(())
    }
}

fn takes_value(flag: &str) -> bool {
    matches!(
        flag,
        "--width" | "-w" | "--height" | "-h" | "--resolution" | "-r" | "--music" | "--mqtt"
            | "--config"
    )
}

fn value(args: &[String], i: usize) -> Result<&str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::InvalidArgument(format!("{} needs a value", args[i])))
}

fn parse_value<T: std::str::FromStr>(flag: &str, text: &str) -> Result<T, ConfigError> {
    text.parse()
        .map_err(|_| ConfigError::InvalidArgument(format!("{flag}: invalid value '{text}'")))
}

pub fn usage() -> String {
    format!(
        "Usage: cubetune [OPTIONS]

Options:
  --width W, -w W           Set window width (default: {DEFAULT_WIDTH})
  --height H, -h H          Set window height (default: {DEFAULT_HEIGHT})
  --resolution WxH, -r WxH  Set resolution (e.g., 1920x1080)
  --no-vsync                Disable VSync for uncapped framerate
  --music PATH              Play a YM file (plain or LHA-packed)
  --no-loop                 Play the music once
  --config PATH             Read settings from PATH (default: {DEFAULT_CONFIG_PATH})
  --mqtt HOST[:TOPIC]       Accept remote commands from an MQTT broker
  --help                    Show this help message

Keys:
  Up/Down       Volume
  +/-           Animation speed
  Left/Right    Seek 5 seconds
  Home          Restart music
  Escape        Quit"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("cubetune")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DemoConfig =
            serde_json::from_str(r#"{"cube_count": 4, "music": "song.ym"}"#).unwrap();
        assert_eq!(config.cube_count, 4);
        assert_eq!(config.music, Some(PathBuf::from("song.ym")));
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert!(config.looping);
        assert_eq!(config.focal_length, 200.0);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = DemoConfig::default();
        config
            .apply_args(&args(&[
                "-r", "1280x720", "--no-vsync", "--music", "a.ym", "--no-loop", "--mqtt",
                "broker:cubes",
            ]))
            .unwrap();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(!config.vsync);
        assert!(!config.looping);
        assert_eq!(config.music, Some(PathBuf::from("a.ym")));
        assert_eq!(
            config.mqtt,
            Some(MqttConfig {
                host: "broker".into(),
                topic: "cubes".into()
            })
        );
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        let mut config = DemoConfig::default();
        assert!(config.apply_args(&args(&["--width", "wide"])).is_err());
        assert!(config.apply_args(&args(&["--height"])).is_err());
        assert!(config.apply_args(&args(&["-r", "640"])).is_err());
        assert!(config.apply_args(&args(&["--width", "0"])).is_err());
        assert!(config.apply_args(&args(&["--bogus"])).is_err());
        assert!(config.apply_args(&args(&["-r", "70000x70000"])).is_err());
    }

    #[test]
    fn test_camera_inside_cube_is_rejected() {
        let inside = DemoConfig {
            cube_size: 20.0,
            focal_length: 10.5,
            ..DemoConfig::default()
        };
        assert!(matches!(inside.validate(), Err(ConfigError::InvalidArgument(_))));

        let flat = DemoConfig {
            cube_size: 0.0,
            ..DemoConfig::default()
        };
        assert!(flat.validate().is_err());

        let from_file: DemoConfig =
            serde_json::from_str(r#"{"cube_size": 100.0, "focal_length": 80.0}"#).unwrap();
        assert!(from_file.validate().is_err());
        assert!(DemoConfig::default().validate().is_ok());
    }

    #[test]
    fn test_help_wins() {
        assert!(matches!(
            DemoConfig::from_args(&args(&["--width", "5", "--help"])),
            Ok(Launch::Help)
        ));
    }

    #[test]
    fn test_load_reports_errors() {
        let dir = std::env::temp_dir().join(format!("cubetune-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.json");
        fs::write(&good, r#"{"speed": 1.5, "vsync": false}"#).unwrap();
        let config = DemoConfig::load(&good).unwrap();
        assert_eq!(config.speed, 1.5);
        assert!(!config.vsync);

        let bad = dir.join("bad.json");
        fs::write(&bad, "{ nope").unwrap();
        assert!(matches!(DemoConfig::load(&bad), Err(ConfigError::Parse { .. })));
        assert_eq!(DemoConfig::load_or_default(&bad, true), DemoConfig::default());

        let missing = dir.join("missing.json");
        assert!(matches!(DemoConfig::load(&missing), Err(ConfigError::Read { .. })));

        fs::remove_dir_all(&dir).unwrap();
    }
}
