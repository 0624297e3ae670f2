mod cube_swarm;

pub use cube_swarm::{CubeSwarm, SwarmParams};

use crate::display::PixelBuffer;

/// A demo layer driven by the fixed-rate frame clock
pub trait Effect {
    /// Advance one logical tick (1/60 s) scaled by the speed multiplier
    fn update(&mut self, speed: f32);

    /// Draw the current state; never advances it
    fn render(&self, buffer: &mut PixelBuffer);

    /// Effect name for logging
    fn name(&self) -> &str;
}
