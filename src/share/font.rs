/// Built-in 5×7 bitmap font for ticket labels
use image::{GrayImage, Luma};

use crate::models::BLACK;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, including one column of spacing
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row bitmaps, bit 4 = leftmost column. Lowercase letters render as uppercase;
/// characters without a glyph render as `?`.
pub fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ' ' => [0x00; 7],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

/// Rendered width of `text` at `scale`
pub fn text_width(text: &str, scale: u32) -> u32 {
    (text.chars().count() as u32 * ADVANCE).saturating_sub(1) * scale
}

/// Draw `text` in black with its top-left corner at (x, y); clipped to the image
pub fn draw_text(img: &mut GrayImage, text: &str, x: u32, y: u32, scale: u32) {
    let scale = scale.max(1);
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as u32 * ADVANCE * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        let py = y + row as u32 * scale + dy;
                        if px < img.width() && py < img.height() {
                            img.put_pixel(px, py, Luma([BLACK]));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WHITE;

    #[test]
    fn test_lowercase_maps_to_uppercase() {
        assert_eq!(glyph('e'), glyph('E'));
        assert_eq!(glyph('~'), glyph('?'));
    }

    #[test]
    fn test_draw_text() {
        let mut img = GrayImage::from_pixel(40, 20, Luma([WHITE]));
        draw_text(&mut img, "1-", 2, 3, 2);
        // top of the '1' stem: row 0 = 0x04 → column 2
        assert_eq!(img.get_pixel(2 + 4, 3)[0], BLACK);
        assert_eq!(img.get_pixel(2 + 5, 4)[0], BLACK);
        assert_eq!(img.get_pixel(2, 3)[0], WHITE);
        // '-' bar on row 3 of the second glyph
        assert_eq!(img.get_pixel(2 + 12, 3 + 6)[0], BLACK);
    }

    #[test]
    fn test_text_width_and_clipping() {
        assert_eq!(text_width("CODE", 1), 23);
        assert_eq!(text_width("", 3), 0);
        let mut img = GrayImage::from_pixel(4, 4, Luma([WHITE]));
        draw_text(&mut img, "8888", 0, 0, 3);
    }
}
