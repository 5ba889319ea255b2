//! Status glyph rasterizer
//!
//! Draws the tray glyph: a dark round badge with three status dots
//! (top: Caps, middle: Num, bottom: Fan) and tiny C / N / F letters.
//! Layout is defined on a 16x16 grid and scaled to the requested size.

/// Reference grid the layout is expressed in
const GRID: f32 = 16.0;

const BADGE_FILL: [u8; 4] = [20, 20, 20, 255];
const BADGE_RIM: [u8; 4] = [60, 60, 60, 255];
const DOT_ON: [u8; 4] = [0, 200, 90, 255];
const DOT_OFF: [u8; 4] = [220, 60, 60, 255];
const DOT_RIM: [u8; 4] = [20, 20, 20, 255];
const LETTER: [u8; 4] = [220, 220, 220, 255];

/// 3x5 bitmaps, one row per byte, bit 2 is the leftmost column
const LETTER_C: [u8; 5] = [0b111, 0b100, 0b100, 0b100, 0b111];
const LETTER_N: [u8; 5] = [0b101, 0b111, 0b111, 0b111, 0b101];
const LETTER_F: [u8; 5] = [0b111, 0b100, 0b110, 0b100, 0b100];

/// Square RGBA8 image, row-major, straight alpha
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphImage {
    size: u32,
    pixels: Vec<u8>,
}

impl GlyphImage {
    fn blank(size: u32) -> Self {
        Self {
            size,
            pixels: vec![0; (size * size * 4) as usize],
        }
    }

    /// Raw RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.size + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    fn put(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = ((y * self.size + x) * 4) as usize;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }
}

/// Errors producing a glyph or its OS icon handle
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("glyph size {0} is outside 8..=256")]
    UnsupportedSize(u32),

    #[error("failed to create icon handle: {0}")]
    IconHandle(String),
}

/// Renders glyphs at a fixed pixel size
#[derive(Debug, Clone, Copy)]
pub struct GlyphRenderer {
    size: u32,
}

impl GlyphRenderer {
    pub const MIN_SIZE: u32 = 8;
    pub const MAX_SIZE: u32 = 256;

    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Pure and deterministic: same flags, same pixels
    pub fn render(&self, num_on: bool, caps_on: bool, fan_on: bool) -> Result<GlyphImage, RenderError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.size) {
            return Err(RenderError::UnsupportedSize(self.size));
        }

        let mut image = GlyphImage::blank(self.size);
        let scale = self.size as f32 / GRID;
        let dots = [(4.0, caps_on), (8.0, num_on), (12.0, fan_on)];
        let letters = [(1.0, &LETTER_C), (6.0, &LETTER_N), (11.0, &LETTER_F)];

        for y in 0..self.size {
            for x in 0..self.size {
                // Pixel centre in grid units
                let gx = (x as f32 + 0.5) / scale;
                let gy = (y as f32 + 0.5) / scale;

                let mut color = badge_color(gx, gy);
                for (cy, on) in dots {
                    if let Some(dot) = dot_color(gx, gy, 8.5, cy + 0.5, on) {
                        color = Some(dot);
                    }
                }
                for (top, bitmap) in letters {
                    if letter_covers(bitmap, gx - 1.0, gy - top) {
                        color = Some(LETTER);
                    }
                }

                if let Some(rgba) = color {
                    image.put(x, y, rgba);
                }
            }
        }

        Ok(image)
    }
}

fn badge_color(gx: f32, gy: f32) -> Option<[u8; 4]> {
    let dist = ((gx - 8.0).powi(2) + (gy - 8.0).powi(2)).sqrt();
    if dist > 8.0 {
        None
    } else if dist > 7.0 {
        Some(BADGE_RIM)
    } else {
        Some(BADGE_FILL)
    }
}

fn dot_color(gx: f32, gy: f32, cx: f32, cy: f32, on: bool) -> Option<[u8; 4]> {
    let dist = ((gx - cx).powi(2) + (gy - cy).powi(2)).sqrt();
    if dist > 2.5 {
        None
    } else if dist > 1.8 {
        Some(DOT_RIM)
    } else if on {
        Some(DOT_ON)
    } else {
        Some(DOT_OFF)
    }
}

/// `lx`/`ly` are grid offsets from the letter's top-left corner
fn letter_covers(bitmap: &[u8; 5], lx: f32, ly: f32) -> bool {
    if lx < 0.0 || ly < 0.0 {
        return false;
    }
    let (col, row) = (lx as usize, ly as usize);
    if col >= 3 || row >= 5 {
        return false;
    }
    bitmap[row] & (0b100 >> col) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let renderer = GlyphRenderer::new(16);
        let a = renderer.render(true, false, true).unwrap();
        let b = renderer.render(true, false, true).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, renderer.render(false, false, true).unwrap());
    }

    #[test]
    fn test_corners_are_transparent() {
        let image = GlyphRenderer::new(16).render(true, true, true).unwrap();
        assert_eq!(image.pixels().len(), 16 * 16 * 4);
        assert_eq!(image.pixel(0, 0)[3], 0);
        assert_eq!(image.pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_dot_colors_follow_flags() {
        let renderer = GlyphRenderer::new(16);

        let all_on = renderer.render(true, true, true).unwrap();
        assert_eq!(all_on.pixel(8, 4), DOT_ON);
        assert_eq!(all_on.pixel(8, 8), DOT_ON);
        assert_eq!(all_on.pixel(8, 12), DOT_ON);

        // num on, caps off, fan off
        let mixed = renderer.render(true, false, false).unwrap();
        assert_eq!(mixed.pixel(8, 4), DOT_OFF);
        assert_eq!(mixed.pixel(8, 8), DOT_ON);
        assert_eq!(mixed.pixel(8, 12), DOT_OFF);
    }

    #[test]
    fn test_letters_and_badge() {
        let image = GlyphRenderer::new(16).render(false, false, false).unwrap();
        // Top-left stroke of the C
        assert_eq!(image.pixel(1, 1), LETTER);
        // Open side of the C shows the badge
        assert_eq!(image.pixel(3, 3), BADGE_FILL);
    }

    #[test]
    fn test_scales_to_larger_icons() {
        let image = GlyphRenderer::new(32).render(false, true, false).unwrap();
        assert_eq!(image.size, 32);
        assert_eq!(image.pixel(17, 9), DOT_ON);
    }

    #[test]
    fn test_unsupported_size() {
        assert!(matches!(
            GlyphRenderer::new(4).render(true, true, true),
            Err(RenderError::UnsupportedSize(4))
        ));
        assert!(GlyphRenderer::new(512).render(true, true, true).is_err());
    }
}
