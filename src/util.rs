//! Frame timing

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Logical update rate of the demo
pub const LOGICAL_HZ: u32 = 60;

/// Most logical ticks run for a single displayed frame.
/// A long stall (window drag, breakpoint) is dropped rather than replayed.
const MAX_CATCH_UP_TICKS: u32 = 5;

/// Turns wall-clock frame deltas into whole fixed-rate ticks
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: f32,
    accumulator: f32,
}

impl FrameClock {
    pub fn new(hz: u32) -> Self {
        Self {
            step: 1.0 / hz.max(1) as f32,
            accumulator: 0.0,
        }
    }

    /// Feed the elapsed seconds, get the number of logical ticks due
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt;
        let due = (self.accumulator / self.step).floor();
        if due >= MAX_CATCH_UP_TICKS as f32 {
            self.accumulator = 0.0;
            return MAX_CATCH_UP_TICKS;
        }
        self.accumulator -= due * self.step;
        due as u32
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(LOGICAL_HZ)
    }
}

/// FPS counter with rolling average
pub struct FpsCounter {
    frame_times: VecDeque<f32>,
    last_frame: Instant,
    sample_count: usize,
    last_report: Instant,
}

impl FpsCounter {
    /// Create a new FPS counter with specified sample window
    pub fn new(sample_count: usize) -> Self {
        let now = Instant::now();
        Self {
            frame_times: VecDeque::with_capacity(sample_count),
            last_frame: now,
            sample_count: sample_count.max(1),
            last_report: now,
        }
    }

    /// Call at the start of each frame. Returns the frame delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(dt);
        dt
    }

    fn record(&mut self, dt: f32) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.sample_count {
            self.frame_times.pop_front();
        }
    }

    pub fn avg_fps(&self) -> f32 {
        let avg_dt = self.avg_frame_time_ms() / 1000.0;
        if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 }
    }

    /// Average frame time in milliseconds
    pub fn avg_frame_time_ms(&self) -> f32 {
        let avg_dt: f32 =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len().max(1) as f32;
        avg_dt * 1000.0
    }

    /// Min/max FPS over the sample window
    pub fn min_max_fps(&self) -> (f32, f32) {
        if self.frame_times.is_empty() {
            return (0.0, 0.0);
        }
        let min_dt = self.frame_times.iter().copied().fold(f32::INFINITY, f32::min);
        let max_dt = self.frame_times.iter().copied().fold(0.0, f32::max);
        let max_fps = if min_dt > 0.0 { 1.0 / min_dt } else { 0.0 };
        let min_fps = if max_dt > 0.0 { 1.0 / max_dt } else { 0.0 };
        (min_fps, max_fps)
    }

    /// True once per `interval`; the caller logs the averages
    pub fn report_due(&mut self, interval: Duration) -> bool {
        if self.last_report.elapsed() >= interval {
            self.last_report = Instant::now();
            true
        } else {
            false
        }
    }
}
