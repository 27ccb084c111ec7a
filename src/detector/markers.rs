/// Fiducial marker detection in raw share images
use image::GrayImage;

use super::connected_components::{Region, find_black_regions};
use crate::models::{BinaryImage, Point};
use crate::share::markers::{MARKER_CELLS, identify_code};
use crate::utils::binarization::MID_GRAY;

/// A marker found in an image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedMarker {
    /// Marker ID (0–3)
    pub id: u8,
    /// Center of the marker's bounding box
    pub center: Point,
    /// Bounding box of the marker's black ring
    pub region: Region,
}

impl DetectedMarker {
    /// Mean side length in pixels
    pub fn size(&self) -> f32 {
        (self.region.width() + self.region.height()) as f32 / 2.0
    }
}

/// Find every fiducial marker in `gray`, at most one per ID, ordered by ID
pub fn detect_markers(gray: &GrayImage) -> Vec<DetectedMarker> {
    let binary = BinaryImage::from_gray(gray, MID_GRAY);
    let max_side = binary.width().min(binary.height()) / 3;

    let mut best: [Option<DetectedMarker>; 4] = [None; 4];
    for region in find_black_regions(&binary) {
        if !plausible_marker(&region, max_side) {
            continue;
        }
        let Some(id) = read_marker(&binary, &region) else {
            continue;
        };
        let slot = &mut best[usize::from(id)];
        if slot.is_none_or(|m| region.area > m.region.area) {
            *slot = Some(DetectedMarker {
                id,
                center: Point::new(
                    (region.min_x + region.max_x + 1) as f32 / 2.0,
                    (region.min_y + region.max_y + 1) as f32 / 2.0,
                ),
                region,
            });
        }
    }

    best.into_iter().flatten().collect()
}

fn plausible_marker(region: &Region, max_side: usize) -> bool {
    let (w, h) = (region.width(), region.height());
    let min_side = MARKER_CELLS * 2;
    if w < min_side || h < min_side || w > max_side || h > max_side {
        return false;
    }
    let aspect = w.max(h) as f32 / w.min(h) as f32;
    // the ring alone covers 20/36 of the box
    aspect <= 1.25 && region.fill_ratio() >= 0.5
}

/// Sample the 6×6 cell grid and decode the ID, tolerating one bad ring cell
fn read_marker(binary: &BinaryImage, region: &Region) -> Option<u8> {
    let cell_w = region.width() as f32 / MARKER_CELLS as f32;
    let cell_h = region.height() as f32 / MARKER_CELLS as f32;

    let mut ring_misses = 0;
    let mut code = 0u16;
    for cy in 0..MARKER_CELLS {
        for cx in 0..MARKER_CELLS {
            let x = region.min_x as f32 + (cx as f32 + 0.5) * cell_w;
            let y = region.min_y as f32 + (cy as f32 + 0.5) * cell_h;
            let black = majority_black(binary, x as usize, y as usize);

            let ring = cx == 0 || cy == 0 || cx == MARKER_CELLS - 1 || cy == MARKER_CELLS - 1;
            if ring {
                if !black {
                    ring_misses += 1;
                }
            } else if black {
                code |= 1 << (15 - ((cy - 1) * 4 + (cx - 1)));
            }
        }
    }

    if ring_misses > 1 {
        return None;
    }
    identify_code(code)
}

/// 3×3 majority vote around (x, y)
fn majority_black(binary: &BinaryImage, x: usize, y: usize) -> bool {
    let mut black = 0;
    for dy in 0..3 {
        for dx in 0..3 {
            let (sx, sy) = ((x + dx).saturating_sub(1), (y + dy).saturating_sub(1));
            if binary.get(sx, sy) {
                black += 1;
            }
        }
    }
    black >= 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::markers::MarkerBorder;
    use image::Luma;

    fn bordered_noise() -> GrayImage {
        // deterministic 2x2-block texture standing in for a share
        let share = GrayImage::from_fn(120, 120, |x, y| {
            let block = (x / 2 * 7 + y / 2 * 13) % 3 == 0;
            let diag = (x % 2) == (y % 2);
            Luma([if block == diag { 0 } else { 255 }])
        });
        MarkerBorder::default().apply(&share)
    }

    #[test]
    fn test_detects_all_four() {
        let img = bordered_noise();
        let markers = detect_markers(&img);
        let ids: Vec<u8> = markers.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let top_left = markers[0];
        assert_eq!((top_left.region.min_x, top_left.region.min_y), (8, 8));
        assert!((top_left.size() - 48.0).abs() < 0.5);
        assert_eq!(top_left.center, Point::new(32.0, 32.0));
    }

    #[test]
    fn test_detects_after_rotation() {
        let rotated = image::imageops::rotate90(&bordered_noise());
        let markers = detect_markers(&rotated);
        assert_eq!(markers.len(), 4);
        // marker 0 moves from top-left to top-right
        let w = rotated.width() as f32;
        assert!(markers[0].center.x > w / 2.0);
        assert!(markers[0].center.y < w / 2.0);
    }

    #[test]
    fn test_blank_image_has_no_markers() {
        let img = GrayImage::from_pixel(200, 200, Luma([255]));
        assert!(detect_markers(&img).is_empty());
    }
}
