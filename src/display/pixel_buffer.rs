/// Flat RGB color, one byte per channel
pub type Rgb = (u8, u8, u8);

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], (r, g, b): Rgb) {
    dest[0] = 255; // A
    dest[1] = b; // B
    dest[2] = g; // G
    dest[3] = r; // R
}

/// `a0 + da * num / den` without intermediate overflow
#[inline]
fn intercept(a0: i64, da: i64, num: i64, den: i64) -> i64 {
    a0 + (i128::from(da) * i128::from(num) / i128::from(den)) as i64
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 pixel buffer for software rendering
///
/// The cubes are rasterized into this and the whole buffer is uploaded to a
/// streaming SDL texture once per frame. There is deliberately no depth
/// plane: solids are painter-sorted before they get here.
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a new pixel buffer with custom resolution
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Clear to a solid color using u32 writes
    pub fn clear(&mut self, (r, g, b): Rgb) {
        let pixel = u32::from_ne_bytes([255, b, g, r]);

        // Safety: pixels.len() is always width * height * 4, and
        // write_unaligned makes no assumption about the Vec<u8> alignment.
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;
        for i in 0..len {
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set a single pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], color);
        }
    }

    /// Read a pixel back, `None` outside the buffer
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some((
                self.pixels[idx + 3], // R
                self.pixels[idx + 2], // G
                self.pixels[idx + 1], // B
            ))
        } else {
            None
        }
    }

    /// Horizontal span from `x1` to `x2` inclusive, clipped to the buffer.
    /// Endpoints may come in either order.
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, color: Rgb) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }

        let mut idx = self.pixel_index(start as u32, y as u32);
        for _ in start..=end {
            write_pixel(&mut self.pixels[idx..idx + 4], color);
            idx += 4;
        }
    }

    /// Draw a line using Bresenham's algorithm with Cohen-Sutherland clipping
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let Some((cx0, cy0, cx1, cy1)) = self.clip_line(x0, y0, x1, y1) else {
            return;
        };

        let dx = (cx1 - cx0).abs();
        let dy = -((cy1 - cy0).abs());
        let sx = if cx0 < cx1 { 1 } else { -1 };
        let sy = if cy0 < cy1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (cx0, cy0);

        loop {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], color);
            if x == cx1 && y == cy1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Cohen-Sutherland clip against the buffer rectangle.
    /// Returns the clipped endpoints, or `None` when nothing is visible.
    ///
    /// Endpoints may lie anywhere in i32; intercept products are widened so
    /// lines from far off-screen clip without overflow.
    fn clip_line(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(i32, i32, i32, i32)> {
        const LEFT: u8 = 1;
        const RIGHT: u8 = 2;
        const BOTTOM: u8 = 4;
        const TOP: u8 = 8;
        // Converges in at most 4 rounds for sane input
        const MAX_ITERATIONS: u32 = 16;

        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let (mut x0, mut y0) = (i64::from(x0), i64::from(y0));
        let (mut x1, mut y1) = (i64::from(x1), i64::from(y1));

        let outcode = |x: i64, y: i64| -> u8 {
            let mut code = 0;
            if x < 0 {
                code |= LEFT;
            } else if x >= w {
                code |= RIGHT;
            }
            if y < 0 {
                code |= TOP;
            } else if y >= h {
                code |= BOTTOM;
            }
            code
        };

        let mut code0 = outcode(x0, y0);
        let mut code1 = outcode(x1, y1);

        for _ in 0..MAX_ITERATIONS {
            if (code0 | code1) == 0 {
                // Both ends inside the buffer, so they fit in i32
                return Some((x0 as i32, y0 as i32, x1 as i32, y1 as i32));
            }
            if (code0 & code1) != 0 {
                return None;
            }

            let code_out = if code0 != 0 { code0 } else { code1 };
            let dy = y1 - y0;
            let dx = x1 - x0;

            let (x, y) = if (code_out & BOTTOM) != 0 {
                if dy == 0 {
                    return None;
                }
                (intercept(x0, dx, h - 1 - y0, dy), h - 1)
            } else if (code_out & TOP) != 0 {
                if dy == 0 {
                    return None;
                }
                (intercept(x0, dx, -y0, dy), 0)
            } else if (code_out & RIGHT) != 0 {
                if dx == 0 {
                    return None;
                }
                (w - 1, intercept(y0, dy, w - 1 - x0, dx))
            } else {
                if dx == 0 {
                    return None;
                }
                (0, intercept(y0, dy, -x0, dx))
            };

            if code_out == code0 {
                x0 = x;
                y0 = y;
                code0 = outcode(x0, y0);
            } else {
                x1 = x;
                y1 = y;
                code1 = outcode(x1, y1);
            }
        }

        None
    }

    /// Fill a rectangle
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb) {
        if w == 0 {
            return;
        }
        for row in 0..h as i32 {
            self.hline(x, x + w as i32 - 1, y + row, color);
        }
    }

    /// Raw bytes for SDL texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}
