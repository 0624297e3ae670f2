//! Flat-shaded quad rasterizer
//!
//! Painter's algorithm over a solid's faces: sort by average view depth,
//! draw far faces first, fill each quad as two scanline triangles and stroke
//! its edges in a darker shade. There is no depth buffer, so the result is
//! only correct for a single convex solid whose faces never interpenetrate.

use crate::display::{PixelBuffer, Rgb};
use crate::math3d::{project, Vec3};

/// Outline shade relative to the fill color
const OUTLINE_SHADE: f32 = 0.75;

/// A planar, convex quad referencing four vertices of its solid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [usize; 4],
    pub color: Rgb,
}

impl Face {
    pub const fn new(indices: [usize; 4], color: Rgb) -> Self {
        Self { indices, color }
    }
}

/// A face after rotation and projection, valid for one render call only
#[derive(Debug, Clone, Copy)]
pub struct ProjectedFace {
    /// Screen-space corners, already translated to the draw center
    pub points: [(f32, f32); 4],
    /// Average rotated z of the corners (before projection)
    pub depth: f32,
    pub color: Rgb,
}

/// Average rotated z of a face's corners.
///
/// `None` if the face references a vertex that does not exist.
pub fn depth_key(rotated: &[Vec3], face: &Face) -> Option<f32> {
    let mut sum = 0.0;
    for &i in &face.indices {
        sum += rotated.get(i)?.z;
    }
    Some(sum / face.indices.len() as f32)
}

/// Face indices in drawing order, farthest first.
///
/// The viewer sits at `z = -focal`, so larger z is farther away and is
/// drawn first. The sort is stable: faces with equal depth keep their
/// declaration order. Faces with dangling indices are left out.
pub fn painter_order(rotated: &[Vec3], faces: &[Face]) -> Vec<(usize, f32)> {
    let mut order: Vec<(usize, f32)> = faces
        .iter()
        .enumerate()
        .filter_map(|(i, face)| depth_key(rotated, face).map(|d| (i, d)))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order
}

/// Project every drawable face, returned in painter order
pub fn project_faces(
    rotated: &[Vec3],
    faces: &[Face],
    focal: f32,
    cx: f32,
    cy: f32,
) -> Vec<ProjectedFace> {
    painter_order(rotated, faces)
        .into_iter()
        .filter_map(|(idx, depth)| {
            let face = &faces[idx];
            let mut points = [(0.0, 0.0); 4];
            for (slot, &vi) in points.iter_mut().zip(&face.indices) {
                let (x, y) = project(rotated[vi], focal)?;
                *slot = (cx + x, cy + y);
            }
            Some(ProjectedFace {
                points,
                depth,
                color: face.color,
            })
        })
        .collect()
}

/// Draw already-rotated geometry centered at (cx, cy)
pub fn render_faces(
    buffer: &mut PixelBuffer,
    rotated: &[Vec3],
    faces: &[Face],
    focal: f32,
    cx: f32,
    cy: f32,
) {
    for face in project_faces(rotated, faces, focal, cx, cy) {
        fill_quad(buffer, &face.points, face.color);
        outline_quad(buffer, &face.points, shade(face.color, OUTLINE_SHADE));
    }
}

/// Scale every channel of a color
#[inline]
pub fn shade((r, g, b): Rgb, factor: f32) -> Rgb {
    let scale = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
    (scale(r), scale(g), scale(b))
}

/// Fill a quad as triangles 0-1-2 and 0-2-3
pub fn fill_quad(buffer: &mut PixelBuffer, p: &[(f32, f32); 4], color: Rgb) {
    fill_triangle(buffer, p[0], p[1], p[2], color);
    fill_triangle(buffer, p[0], p[2], p[3], color);
}

/// Stroke the four edges of a quad
pub fn outline_quad(buffer: &mut PixelBuffer, p: &[(f32, f32); 4], color: Rgb) {
    for i in 0..4 {
        let (x0, y0) = p[i];
        let (x1, y1) = p[(i + 1) % 4];
        buffer.line(
            x0.round() as i32,
            y0.round() as i32,
            x1.round() as i32,
            y1.round() as i32,
            color,
        );
    }
}

/// Scanline triangle fill.
///
/// Corners are sorted by y; each integer row between the top and bottom
/// corner gets one span between the long edge (top to bottom) and whichever
/// short edge straddles that row. A triangle with no height draws nothing,
/// and a short edge with no height is never divided by.
pub fn fill_triangle(
    buffer: &mut PixelBuffer,
    a: (f32, f32),
    b: (f32, f32),
    c: (f32, f32),
    color: Rgb,
) {
    let mut pts = [a, b, c];
    pts.sort_by(|p, q| p.1.total_cmp(&q.1));
    let [(x1, y1), (x2, y2), (x3, y3)] = pts;

    let total = y3 - y1;
    if total.is_nan() || total <= 0.0 {
        return;
    }

    let first = (y1.ceil() as i32).max(0);
    let last = (y3.floor() as i32).min(buffer.height() as i32 - 1);

    for y in first..=last {
        let yf = y as f32;
        let long = x1 + (x3 - x1) * (yf - y1) / total;
        let short = if yf < y2 {
            // yf >= y1 here, so y2 - y1 > 0
            x1 + (x2 - x1) * (yf - y1) / (y2 - y1)
        } else {
            let lower = y3 - y2;
            if lower > 0.0 {
                x2 + (x3 - x2) * (yf - y2) / lower
            } else {
                x2
            }
        };

        let (start, end) = if long <= short {
            (long, short)
        } else {
            (short, long)
        };
        buffer.hline(start.round() as i32, end.round() as i32, y, color);
    }
}
