//! Cube swarm
//!
//! A line of small pink cubes chasing each other along a Lissajous-style
//! path, each tumbling at its own rate.

use super::Effect;
use crate::display::PixelBuffer;
use crate::solid::Solid;

/// Path phase step per tick
const PHASE_STEP: f32 = 0.04;
/// Phase spacing between neighbours
const PHASE_SPACING: f32 = 0.15;

/// Horizontal margin kept free of cube centers
const MARGIN_X: f32 = 40.0;
/// Path center and amplitude, given for a 600 line screen
const PATH_Y: f32 = 186.0;
const PATH_AMPLITUDE_Y: f32 = 84.0;
const REFERENCE_HEIGHT: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmParams {
    pub count: usize,
    pub size: f32,
    pub focal_length: f32,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            count: 12,
            size: 20.0,
            focal_length: crate::solid::DEFAULT_FOCAL_LENGTH,
        }
    }
}

struct Member {
    solid: Solid,
    phase: f32,
    /// Rotation rate scales: (1 + 0.1 i, 1 + 0.15 i, 1 + 0.05 i)
    spin: (f32, f32, f32),
}

pub struct CubeSwarm {
    members: Vec<Member>,
}

impl CubeSwarm {
    pub fn new(params: SwarmParams) -> Self {
        let members = (0..params.count)
            .map(|i| {
                let i = i as f32;
                Member {
                    solid: Solid::cube(params.size)
                        .with_focal_length(params.focal_length)
                        .with_angles(0.3 * i, 0.5 * i, 0.2 * i),
                    phase: PHASE_SPACING * (i + 1.0),
                    spin: (1.0 + 0.1 * i, 1.0 + 0.15 * i, 1.0 + 0.05 * i),
                }
            })
            .collect();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Screen position of a path phase
    pub fn path_position(phase: f32, width: u32, height: u32) -> (f32, f32) {
        let half_span = (width as f32 - MARGIN_X) / 2.0;
        let scale = height as f32 / REFERENCE_HEIGHT;
        let x = half_span * (1.0 + phase.sin());
        let y = PATH_Y * scale + PATH_AMPLITUDE_Y * scale * (phase * 2.5).cos();
        (x, y)
    }
}

impl Default for CubeSwarm {
    fn default() -> Self {
        Self::new(SwarmParams::default())
    }
}

impl Effect for CubeSwarm {
    fn update(&mut self, speed: f32) {
        for m in &mut self.members {
            m.phase += PHASE_STEP * speed;
            m.solid.advance_orientation(
                0.02 * speed * m.spin.0,
                0.03 * speed * m.spin.1,
                0.01 * speed * m.spin.2,
            );
        }
    }

    fn render(&self, buffer: &mut PixelBuffer) {
        let (w, h) = (buffer.width(), buffer.height());
        for m in &self.members {
            let (x, y) = Self::path_position(m.phase, w, h);
            m.solid.render(buffer, x, y);
        }
    }

    fn name(&self) -> &str {
        "Cube Swarm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_initial_state() {
        let swarm = CubeSwarm::default();
        assert_eq!(swarm.len(), 12);
        let m = &swarm.members[3];
        assert!((m.solid.angle_x - 0.9).abs() < EPS);
        assert!((m.solid.angle_y - 1.5).abs() < EPS);
        assert!((m.solid.angle_z - 0.6).abs() < EPS);
        assert!((m.phase - 0.6).abs() < EPS);
    }

    #[test]
    fn test_update_scales_with_speed() {
        let mut swarm = CubeSwarm::default();
        let before = swarm.members[2].solid.clone();
        swarm.update(2.0);
        let after = &swarm.members[2].solid;
        assert!((after.angle_x - before.angle_x - 0.02 * 2.0 * 1.2).abs() < EPS);
        assert!((after.angle_y - before.angle_y - 0.03 * 2.0 * 1.3).abs() < EPS);
        assert!((after.angle_z - before.angle_z - 0.01 * 2.0 * 1.1).abs() < EPS);
        assert!((swarm.members[2].phase - (0.45 + 0.08)).abs() < EPS);
    }

    #[test]
    fn test_path_at_reference_size() {
        let (x, y) = CubeSwarm::path_position(0.0, 800, 600);
        assert!((x - 380.0).abs() < EPS);
        assert!((y - 270.0).abs() < EPS);
        let (x, _) = CubeSwarm::path_position(std::f32::consts::FRAC_PI_2, 800, 600);
        assert!((x - 760.0).abs() < 1e-3);
        // Height scales the vertical band
        let (_, y) = CubeSwarm::path_position(0.0, 800, 1200);
        assert!((y - 540.0).abs() < EPS);
    }

    #[test]
    fn test_render_leaves_state_alone() {
        let swarm = CubeSwarm::default();
        let mut buf = PixelBuffer::with_size(320, 240);
        buf.clear((0, 0, 0));
        swarm.render(&mut buf);
        assert_eq!(swarm.members[5].phase, PHASE_SPACING * 6.0);
        // At least one cube landed on screen
        assert!(buf.as_bytes().chunks_exact(4).any(|p| p[1..].iter().any(|&c| c != 0)));
    }

    #[test]
    fn test_empty_swarm() {
        let mut swarm = CubeSwarm::new(SwarmParams {
            count: 0,
            ..SwarmParams::default()
        });
        assert!(swarm.is_empty());
        swarm.update(1.0);
        swarm.render(&mut PixelBuffer::with_size(8, 8));
    }
}
