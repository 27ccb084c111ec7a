//! Cardinal derotation from the four corner markers.
//!
//! Marker 0 is top-left in the unrotated layout, so the quadrant it lands in
//! (relative to the centroid of all four markers) names the rotation. The
//! marker constellation also gives the share's scale and position, which makes
//! the crop independent of any footer or padding around it.

use image::GrayImage;
use tracing::debug;

use super::AlignmentStrategy;
use crate::detector::markers::{DetectedMarker, detect_markers};
use crate::models::Point;
use crate::reconstruct::{Reconstruction, combine};
use crate::share::markers::MarkerBorder;
use crate::utils::imaging::{Rotation, crop, resize_nearest};

#[derive(Debug, Clone, Copy)]
pub struct FiducialStrategy {
    border: MarkerBorder,
}

impl FiducialStrategy {
    pub fn new(border: MarkerBorder) -> Self {
        Self { border }
    }

    /// Secret region of a raw share A, back in canonical orientation
    pub fn derotate(&self, share_a: &GrayImage) -> Option<(GrayImage, Rotation)> {
        let markers = detect_markers(share_a);
        if markers.len() < 4 || markers[0].id != 0 {
            debug!(found = markers.len(), "fiducial: marker set incomplete");
            return None;
        }

        let centers: Vec<Point> = markers.iter().map(|m| m.center).collect();
        let centroid = Point::centroid(&centers)?;
        let rotation = rotation_from_marker0(markers[0].center, centroid);

        let region = secret_region(&markers, &self.border)?;
        let secret = crop(share_a, region.0, region.1, region.2, region.3);
        Some((rotation.inverse().apply(&secret), rotation))
    }
}

impl AlignmentStrategy for FiducialStrategy {
    fn name(&self) -> &'static str {
        "fiducial"
    }

    fn attempt(&self, share_a: &GrayImage, share_b: &GrayImage) -> Option<Reconstruction> {
        let (secret_a, rotation) = self.derotate(share_a)?;
        let secret_b = self.border.strip(share_b)?;
        debug!(degrees = rotation.degrees(), "fiducial: derotated share A");

        let (width, height) = secret_b.dimensions();
        let fitted = resize_nearest(&secret_a, width, height);
        combine(&fitted, &secret_b)
    }
}

/// Rotation that was applied to a share whose marker 0 sits at `marker0`
pub fn rotation_from_marker0(marker0: Point, centroid: Point) -> Rotation {
    match (marker0.x < centroid.x, marker0.y < centroid.y) {
        (true, true) => Rotation::None,
        (false, true) => Rotation::Cw90,
        (false, false) => Rotation::Cw180,
        (true, false) => Rotation::Cw270,
    }
}

/// (x, y, width, height) of the secret region inside the marker constellation
fn secret_region(
    markers: &[DetectedMarker],
    border: &MarkerBorder,
) -> Option<(u32, u32, u32, u32)> {
    let min_x = markers.iter().map(|m| m.region.min_x).min()?;
    let min_y = markers.iter().map(|m| m.region.min_y).min()?;
    let max_x = markers.iter().map(|m| m.region.max_x + 1).max()?;
    let max_y = markers.iter().map(|m| m.region.max_y + 1).max()?;

    let mean_size = markers.iter().map(|m| m.size()).sum::<f32>() / markers.len() as f32;
    let scale = mean_size / border.marker_size() as f32;
    let shrink = ((border.margin() - border.inset()) as f32 * scale).round() as usize;

    let width = (max_x - min_x).checked_sub(shrink * 2)?;
    let height = (max_y - min_y).checked_sub(shrink * 2)?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((
        (min_x + shrink) as u32,
        (min_y + shrink) as u32,
        width as u32,
        height as u32,
    ))
}
