//! Fiducial marker border.
//!
//! Four square markers with fixed IDs 0–3 sit in a white margin around the
//! secret region, canonically at top-left, top-right, bottom-right and
//! bottom-left. Each marker is a 6×6 cell grid: a solid black outer ring and a
//! 4×4 ID code inside. The codes are at least 6 bits apart from each other, from
//! every rotation of each other and themselves, and from a QR finder pattern.
//!
//! Both shares carry identical markers at identical positions, so stacking
//! cancels them to white.

use image::{GrayImage, Luma};

use crate::error::{Error, Result};
use crate::models::{BLACK, WHITE};
use crate::utils::imaging::{crop, pad_white};

/// Cells per marker side (ring + 4 code cells + ring)
pub const MARKER_CELLS: usize = 6;

/// 4×4 ID codes, row-major, most significant bit = top-left cell
pub const MARKER_CODES: [u16; 4] = [0xD045, 0xE888, 0x5CDD, 0x54B3];

/// Geometry of the white margin and its corner markers (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerBorder {
    margin: u32,
    marker_size: u32,
    inset: u32,
}

impl Default for MarkerBorder {
    fn default() -> Self {
        Self {
            margin: 64,
            marker_size: 48,
            inset: 8,
        }
    }
}

impl MarkerBorder {
    /// `inset` is the gap between the image edge and each marker; the marker
    /// must fit inside the margin without touching the secret region.
    pub fn new(margin: u32, marker_size: u32, inset: u32) -> Result<Self> {
        if marker_size < MARKER_CELLS as u32 * 2 {
            return Err(Error::Config(format!(
                "marker size {marker_size} too small (min {})",
                MARKER_CELLS * 2
            )));
        }
        if inset + marker_size >= margin {
            return Err(Error::Config(format!(
                "marker ({marker_size}px at inset {inset}px) does not fit a {margin}px margin"
            )));
        }
        Ok(Self {
            margin,
            marker_size,
            inset,
        })
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn marker_size(&self) -> u32 {
        self.marker_size
    }

    pub fn inset(&self) -> u32 {
        self.inset
    }

    /// Wrap `share` in the white margin and stamp the four markers
    pub fn apply(&self, share: &GrayImage) -> GrayImage {
        let mut out = pad_white(share, self.margin);
        let (w, h) = out.dimensions();
        let far_x = w - self.inset - self.marker_size;
        let far_y = h - self.inset - self.marker_size;
        let origins = [
            (self.inset, self.inset),
            (far_x, self.inset),
            (far_x, far_y),
            (self.inset, far_y),
        ];
        for (id, (x, y)) in origins.into_iter().enumerate() {
            draw_marker(&mut out, id as u8, x, y, self.marker_size);
        }
        out
    }

    /// Remove the margin, leaving only the secret region
    pub fn strip(&self, bordered: &GrayImage) -> Option<GrayImage> {
        let (w, h) = bordered.dimensions();
        if w <= self.margin * 2 || h <= self.margin * 2 {
            return None;
        }
        Some(crop(
            bordered,
            self.margin,
            self.margin,
            w - self.margin * 2,
            h - self.margin * 2,
        ))
    }
}

/// Whether the code cell at (cx, cy) of the 4×4 grid is black
pub fn code_bit(code: u16, cx: usize, cy: usize) -> bool {
    (code >> (15 - (cy * 4 + cx))) & 1 == 1
}

/// Render marker `id` as a `size`×`size` square with its top-left at (x, y)
pub fn draw_marker(img: &mut GrayImage, id: u8, x: u32, y: u32, size: u32) {
    let code = MARKER_CODES[usize::from(id) % MARKER_CODES.len()];
    let cells = MARKER_CELLS as u32;
    for dy in 0..size {
        for dx in 0..size {
            let cx = (dx * cells / size) as usize;
            let cy = (dy * cells / size) as usize;
            let ring = cx == 0 || cy == 0 || cx == MARKER_CELLS - 1 || cy == MARKER_CELLS - 1;
            let black = ring || code_bit(code, cx - 1, cy - 1);
            let (px, py) = (x + dx, y + dy);
            if px < img.width() && py < img.height() {
                img.put_pixel(px, py, Luma([if black { BLACK } else { WHITE }]));
            }
        }
    }
}

/// Rotate a 4×4 code 90° clockwise
pub fn rotate_code(code: u16) -> u16 {
    let mut out = 0u16;
    for cy in 0..4 {
        for cx in 0..4 {
            // cell (cx, cy) of the rotated grid comes from (cy, 3 - cx)
            if code_bit(code, cy, 3 - cx) {
                out |= 1 << (15 - (cy * 4 + cx));
            }
        }
    }
    out
}

/// Identify a code read in unknown orientation
pub fn identify_code(code: u16) -> Option<u8> {
    let mut rotated = code;
    for _ in 0..4 {
        if let Some(id) = MARKER_CODES.iter().position(|&c| c == rotated) {
            return Some(id as u8);
        }
        rotated = rotate_code(rotated);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_distinct_under_rotation() {
        let finder: u16 = 0x0660;
        for (i, &a) in MARKER_CODES.iter().enumerate() {
            let mut r = a;
            for turn in 0..4 {
                if turn > 0 {
                    assert!((r ^ a).count_ones() >= 6, "code {i} near its own rotation");
                }
                for &b in &MARKER_CODES[i + 1..] {
                    assert!((r ^ b).count_ones() >= 6);
                }
                assert!((r ^ finder).count_ones() >= 6);
                r = rotate_code(r);
            }
            assert_eq!(r, a, "four turns return the original code");
        }
    }

    #[test]
    fn test_identify_any_orientation() {
        for (id, &code) in MARKER_CODES.iter().enumerate() {
            let mut r = code;
            for _ in 0..4 {
                assert_eq!(identify_code(r), Some(id as u8));
                r = rotate_code(r);
            }
        }
        assert_eq!(identify_code(0x0000), None);
        assert_eq!(identify_code(0x0660), None);
    }

    #[test]
    fn test_apply_and_strip() {
        let border = MarkerBorder::default();
        let share = GrayImage::from_pixel(40, 30, Luma([BLACK]));
        let bordered = border.apply(&share);
        assert_eq!(bordered.dimensions(), (40 + 128, 30 + 128));

        // ring corner of each marker is black, the region between markers is white
        assert_eq!(bordered.get_pixel(8, 8)[0], BLACK);
        assert_eq!(bordered.get_pixel(168 - 9, 8)[0], BLACK);
        assert_eq!(bordered.get_pixel(168 - 9, 158 - 9)[0], BLACK);
        assert_eq!(bordered.get_pixel(8, 158 - 9)[0], BLACK);
        assert_eq!(bordered.get_pixel(60, 2)[0], WHITE);

        assert_eq!(border.strip(&bordered).unwrap(), share);
    }

    #[test]
    fn test_border_validation() {
        assert!(MarkerBorder::new(64, 48, 8).is_ok());
        assert!(MarkerBorder::new(40, 48, 8).is_err());
        assert!(MarkerBorder::new(64, 6, 8).is_err());
    }
}
