// The stream's byte-oriented pull API (read, seek_whence) and some accessors
// are not driven by the SDL callback path
#![allow(dead_code)]

mod audio;
mod config;
mod control;
mod display;
mod effects;
mod math3d;
mod mqtt;
mod raster;
mod solid;
mod util;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use audio::{open_output, AudioStream, StreamSink, YmDecoder, SAMPLE_RATE};
use config::{DemoConfig, Launch};
use control::{command_for_key, Command, Controls, Flow};
use display::{Display, InputEvent, PixelBuffer, RenderTarget, Rgb};
use effects::{CubeSwarm, Effect, SwarmParams};
use mqtt::MqttClient;
use sdl2::audio::AudioDevice;
use tracing::{error, info, warn};
use util::{FpsCounter, FrameClock};

const BACKGROUND: Rgb = (0, 0, 0);
const METER_COLOR: Rgb = (255, 120, 200);
const METER_TRACK: Rgb = (40, 16, 32);
const METER_HEIGHT: u32 = 4;

const FPS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Thin volume bar along the bottom edge
fn draw_volume_meter(buffer: &mut PixelBuffer, volume: f32) {
    let width = buffer.width();
    let y = buffer.height().saturating_sub(METER_HEIGHT) as i32;
    let filled = (width as f32 * volume.clamp(0.0, 1.0)).round() as u32;
    buffer.fill_rect(0, y, width, METER_HEIGHT, METER_TRACK);
    buffer.fill_rect(0, y, filled, METER_HEIGHT, METER_COLOR);
}

/// Load the configured song. Any failure leaves the demo silent.
fn load_music(config: &DemoConfig) -> Option<Arc<AudioStream>> {
    let path = config.music.as_ref()?;
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Cannot read music {}: {}", path.display(), e);
            return None;
        },
    };

    match AudioStream::load(YmDecoder::new(), &data, SAMPLE_RATE, config.looping) {
        Ok(stream) => {
            if let Err(e) = stream.set_volume(config.volume.clamp(0.0, 1.0)) {
                warn!("Cannot set initial volume: {}", e);
            }
            Some(Arc::new(stream))
        },
        Err(e) => {
            warn!("Cannot play {}: {}", path.display(), e);
            None
        },
    }
}

fn start_audio(
    display: &Display,
    stream: &Arc<AudioStream>,
) -> Option<AudioDevice<StreamSink>> {
    let result = display
        .audio()
        .and_then(|audio| open_output(&audio, Arc::clone(stream)));
    match result {
        Ok(device) => Some(device),
        Err(e) => {
            warn!("Audio output unavailable, continuing silent: {}", e);
            None
        },
    }
}

fn connect_mqtt(config: &DemoConfig) -> Option<MqttClient> {
    let mqtt = config.mqtt.as_ref()?;
    match MqttClient::new(&mqtt.host, &mqtt.topic) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("{}", e);
            None
        },
    }
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match DemoConfig::from_args(&args) {
        Ok(Launch::Run(config)) => config,
        Ok(Launch::Help) => {
            println!("{}", config::usage());
            return Ok(());
        },
        Err(e) => {
            error!("{}", e);
            return Err(e.to_string());
        },
    };

    let (width, height) = (config.width, config.height);
    let (mut display, texture_creator) =
        Display::with_options("cubetune", width, height, config.vsync)?;
    let mut target = RenderTarget::with_size(&texture_creator, width, height)?;
    let mut buffer = PixelBuffer::with_size(width, height);

    let stream = load_music(&config);
    let device = stream.as_ref().and_then(|s| start_audio(&display, s));
    let remote = connect_mqtt(&config);

    let mut swarm = CubeSwarm::new(SwarmParams {
        count: config.cube_count,
        size: config.cube_size,
        focal_length: config.focal_length,
    });
    let mut controls = Controls::new(config.speed);
    let mut clock = FrameClock::default();
    let mut fps_counter = FpsCounter::new(60);

    info!(
        "{}x{}, vsync {}, {} cubes, music {}",
        width,
        height,
        if config.vsync { "on" } else { "off" },
        swarm.len(),
        if stream.is_some() { "on" } else { "off" }
    );
    info!("Effect: {}", swarm.name());

    'main: loop {
        let dt = fps_counter.tick();

        let mut commands: Vec<Command> = Vec::new();
        for event in display.poll_events() {
            match event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown { key, repeat } => {
                    commands.extend(command_for_key(key, repeat));
                },
            }
        }
        if let Some(remote) = &remote {
            commands.extend(remote.poll());
        }
        for command in commands {
            if controls.apply(command, stream.as_deref()) == Flow::Quit {
                break 'main;
            }
        }

        for _ in 0..clock.advance(dt) {
            swarm.update(controls.speed());
        }

        buffer.clear(BACKGROUND);
        swarm.render(&mut buffer);
        if let Some(stream) = &stream {
            draw_volume_meter(&mut buffer, stream.volume());
        }

        display.present(&mut target, &buffer)?;

        if fps_counter.report_due(FPS_REPORT_INTERVAL) {
            let (min_fps, max_fps) = fps_counter.min_max_fps();
            info!(
                "FPS {:.0} avg  {:.0} min  {:.0} max  {:.1}ms",
                fps_counter.avg_fps(),
                min_fps,
                max_fps,
                fps_counter.avg_frame_time_ms()
            );
        }
    }

    // Stop the callback before releasing the decoder it reads from
    drop(device);
    if let Some(stream) = stream {
        stream.close();
    }
    info!("Bye");
    Ok(())
}
