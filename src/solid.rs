//! Rotating solids
//!
//! A solid keeps an immutable object-space template and three orientation
//! angles. Every render rotates the template afresh; nothing derived is
//! cached between frames.

use crate::display::{PixelBuffer, Rgb};
use crate::math3d::Vec3;
use crate::raster::{render_faces, Face};

/// Default distance from eye to projection plane
pub const DEFAULT_FOCAL_LENGTH: f32 = 200.0;

/// Face colors of the cube, pink/magenta tones
const CUBE_COLORS: [Rgb; 6] = [
    (255, 80, 160),  // hot pink
    (255, 120, 200), // light pink
    (200, 60, 140),  // dark pink
    (255, 100, 180), // medium pink
    (220, 80, 160),  // rose
    (255, 140, 200), // pale pink
];

/// A convex polyhedron with orientation state
#[derive(Debug, Clone)]
pub struct Solid {
    template: Vec<Vec3>,
    faces: Vec<Face>,
    focal: f32,
    pub angle_x: f32,
    pub angle_y: f32,
    pub angle_z: f32,
}

impl Solid {
    /// Cube of edge `size` centered at the object origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let template = vec![
            Vec3::new(-h, -h, -h), // 0
            Vec3::new(h, -h, -h),  // 1
            Vec3::new(h, h, -h),   // 2
            Vec3::new(-h, h, -h),  // 3
            Vec3::new(-h, -h, h),  // 4
            Vec3::new(h, -h, h),   // 5
            Vec3::new(h, h, h),    // 6
            Vec3::new(-h, h, h),   // 7
        ];

        let faces = vec![
            Face::new([0, 1, 2, 3], CUBE_COLORS[0]), // z-
            Face::new([4, 5, 6, 7], CUBE_COLORS[1]), // z+
            Face::new([0, 1, 5, 4], CUBE_COLORS[2]), // y-
            Face::new([2, 3, 7, 6], CUBE_COLORS[3]), // y+
            Face::new([0, 3, 7, 4], CUBE_COLORS[4]), // x-
            Face::new([1, 2, 6, 5], CUBE_COLORS[5]), // x+
        ];

        Self {
            template,
            faces,
            focal: DEFAULT_FOCAL_LENGTH,
            angle_x: 0.0,
            angle_y: 0.0,
            angle_z: 0.0,
        }
    }

    /// Builder-style initial orientation
    pub fn with_angles(mut self, ax: f32, ay: f32, az: f32) -> Self {
        self.angle_x = ax;
        self.angle_y = ay;
        self.angle_z = az;
        self
    }

    pub fn with_focal_length(mut self, focal: f32) -> Self {
        self.focal = focal;
        self
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Accumulate rotation. Angles are never wrapped; sin/cos take care of it.
    pub fn advance_orientation(&mut self, dx: f32, dy: f32, dz: f32) {
        self.angle_x += dx;
        self.angle_y += dy;
        self.angle_z += dz;
    }

    /// Template rotated by the current orientation (X, then Y, then Z)
    pub fn rotated_vertices(&self) -> Vec<Vec3> {
        self.template
            .iter()
            .map(|v| v.rotate_xyz(self.angle_x, self.angle_y, self.angle_z))
            .collect()
    }

    /// Draw the solid centered at (cx, cy). Does not touch orientation.
    pub fn render(&self, buffer: &mut PixelBuffer, cx: f32, cy: f32) {
        let rotated = self.rotated_vertices();
        render_faces(buffer, &rotated, &self.faces, self.focal, cx, cy);
    }
}
