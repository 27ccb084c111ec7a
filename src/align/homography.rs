//! Feature-based registration for shares that are shifted, skewed or turned
//! by something other than a multiple of 90°.

use image::{GrayImage, Luma};
use rayon::prelude::*;
use tracing::debug;

use super::AlignmentStrategy;
use crate::detector::features::{FeatureConfig, detect_and_describe, match_cross_check};
use crate::models::{Point, WHITE};
use crate::reconstruct::{Reconstruction, combine};
use crate::utils::geometry::{Homography, find_homography_ransac};
use crate::utils::imaging::crop;

#[derive(Debug, Clone, Copy)]
pub struct HomographyStrategy {
    pub features: FeatureConfig,
    /// Fewest cross-checked matches worth fitting
    pub min_matches: usize,
    /// Lowest-distance matches handed to RANSAC
    pub max_matches: usize,
    /// RANSAC inlier threshold, pixels
    pub ransac_threshold: f32,
    pub ransac_iterations: usize,
}

impl Default for HomographyStrategy {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            min_matches: 4,
            max_matches: 50,
            ransac_threshold: 5.0,
            ransac_iterations: 1000,
        }
    }
}

impl HomographyStrategy {
    /// Transform taking share A coordinates to share B coordinates
    pub fn estimate(&self, share_a: &GrayImage, share_b: &GrayImage) -> Option<Homography> {
        let fa = detect_and_describe(share_a, &self.features);
        let fb = detect_and_describe(share_b, &self.features);
        let mut matches = match_cross_check(&fa.descriptors, &fb.descriptors);
        debug!(
            keypoints_a = fa.len(),
            keypoints_b = fb.len(),
            matches = matches.len(),
            "homography: matched features"
        );
        if matches.len() < self.min_matches {
            return None;
        }

        matches.sort_by_key(|m| (m.distance, m.query));
        matches.truncate(self.max_matches);
        let (src, dst): (Vec<Point>, Vec<Point>) = matches
            .iter()
            .map(|m| (fa.keypoints[m.query].point(), fb.keypoints[m.train].point()))
            .unzip();

        let fit =
            find_homography_ransac(&src, &dst, self.ransac_threshold, self.ransac_iterations)?;
        debug!(inliers = fit.inlier_count(), of = src.len(), "homography: RANSAC fit");
        Some(fit.homography)
    }
}

impl AlignmentStrategy for HomographyStrategy {
    fn name(&self) -> &'static str {
        "homography"
    }

    fn attempt(&self, share_a: &GrayImage, share_b: &GrayImage) -> Option<Reconstruction> {
        let (width, height) = share_b.dimensions();
        let cropped = crop(share_a, 0, 0, width, height);
        let h = self.estimate(&cropped, share_b)?;
        let warped = warp_nearest(&cropped, &h, width, height)?;
        combine(&warped, share_b)
    }
}

/// Resample `src` into a `width`×`height` frame through `h` (source → frame),
/// nearest neighbor; pixels that map outside `src` are white
pub fn warp_nearest(src: &GrayImage, h: &Homography, width: u32, height: u32) -> Option<GrayImage> {
    let inverse = h.inverse()?;
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let mut out = GrayImage::from_pixel(width, height, Luma([WHITE]));
    if width == 0 {
        return Some(out);
    }

    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.iter_mut().enumerate() {
                let Some(p) = inverse.apply(&Point::new(x as f32, y as f32)) else {
                    continue;
                };
                let (sx, sy) = (p.x.round() as i64, p.y.round() as i64);
                if sx >= 0 && sy >= 0 && sx < sw && sy < sh {
                    *px = src.get_pixel(sx as u32, sy as u32)[0];
                }
            }
        });
    Some(out)
}
