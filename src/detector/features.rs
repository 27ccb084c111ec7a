//! Oriented binary keypoint features for share-to-share registration.
//!
//! Shares are 2×2-block noise, so raw pixels carry no corners of their own
//! (every block is half black). Everything here works on a 3×3 box-summed copy
//! of the image, in integer arithmetic wherever possible so that identical
//! neighborhoods give bit-identical responses, angles and descriptors:
//!
//! 1. Harris response on Sobel gradients of the summed image, 5×5 window
//! 2. 3×3 non-maximum suppression, then the strongest few per grid cell
//! 3. Intensity-centroid orientation over a radius-15 disc
//! 4. 256-bit rotated BRIEF descriptor from a fixed sampling pattern
//!
//! Matching is brute-force Hamming with a mutual-nearest-neighbor cross check.

use std::sync::OnceLock;

use image::GrayImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::models::Point;

/// Keypoints closer than this to an edge are dropped.
const BORDER: usize = 20;
const HARRIS_K: f64 = 0.04;
const HARRIS_RADIUS: usize = 2;
const ORIENTATION_RADIUS: i32 = 15;
/// Sampling pairs stay inside this radius so rotated pairs stay inside the border.
const PATTERN_RADIUS: i32 = 12;
const DESCRIPTOR_BITS: usize = 256;
const PATTERN_SEED: u64 = 0x0b1e_f00d;

/// Detection limits
#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    /// Total keypoint cap
    pub max_features: usize,
    /// Grid cell size for spatial bucketing (pixels)
    pub cell_size: usize,
    /// Keypoints kept per grid cell
    pub per_cell: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 3000,
            cell_size: 32,
            per_cell: 6,
        }
    }
}

/// An oriented corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: usize,
    pub y: usize,
    /// Harris response
    pub response: f64,
    /// Orientation, radians
    pub angle: f64,
}

impl Keypoint {
    pub fn point(&self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }
}

/// 256-bit binary descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor(pub [u64; 4]);

impl Descriptor {
    pub fn distance(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Keypoints and their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// A cross-checked correspondence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMatch {
    /// Index into the query feature set
    pub query: usize,
    /// Index into the train feature set
    pub train: usize,
    /// Hamming distance
    pub distance: u32,
}

/// 3×3 box sums with clamped edges
struct SummedImage {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl SummedImage {
    fn new(gray: &GrayImage) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let raw = gray.as_raw();
        let mut data = vec![0u16; width * height];
        data.par_chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let mut sum = 0u16;
                    for dy in -1i64..=1 {
                        for dx in -1i64..=1 {
                            let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
                            let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
                            sum += u16::from(raw[sy * width + sx]);
                        }
                    }
                    *out = sum;
                }
            });
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> i32 {
        i32::from(self.data[y * self.width + x])
    }
}

/// Detect oriented corners in `gray` and describe them
pub fn detect_and_describe(gray: &GrayImage, config: &FeatureConfig) -> Features {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    if width <= BORDER * 2 || height <= BORDER * 2 {
        return Features::default();
    }

    let summed = SummedImage::new(gray);
    let response = harris_response(&summed);
    let candidates = local_maxima(&response, width, height);
    let selected = bucket(candidates, width, config);

    let pattern = sampling_pattern();
    let keypoints: Vec<Keypoint> = selected
        .into_iter()
        .map(|(x, y, r)| Keypoint {
            x,
            y,
            response: r,
            angle: orientation(&summed, x, y),
        })
        .collect();
    let descriptors = keypoints
        .par_iter()
        .map(|kp| describe(&summed, kp, pattern))
        .collect();

    Features {
        keypoints,
        descriptors,
    }
}

fn harris_response(img: &SummedImage) -> Vec<f64> {
    let (w, h) = (img.width, img.height);
    let mut gx = vec![0i64; w * h];
    let mut gy = vec![0i64; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let dx = (img.at(x + 1, y - 1) + 2 * img.at(x + 1, y) + img.at(x + 1, y + 1))
                - (img.at(x - 1, y - 1) + 2 * img.at(x - 1, y) + img.at(x - 1, y + 1));
            let dy = (img.at(x - 1, y + 1) + 2 * img.at(x, y + 1) + img.at(x + 1, y + 1))
                - (img.at(x - 1, y - 1) + 2 * img.at(x, y - 1) + img.at(x + 1, y - 1));
            gx[y * w + x] = i64::from(dx);
            gy[y * w + x] = i64::from(dy);
        }
    }

    let mut response = vec![0.0f64; w * h];
    response
        .par_chunks_mut(w)
        .enumerate()
        .filter(|(y, _)| *y >= BORDER && *y < h - BORDER)
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate().take(w - BORDER).skip(BORDER) {
                let (mut sxx, mut syy, mut sxy) = (0i64, 0i64, 0i64);
                for wy in y - HARRIS_RADIUS..=y + HARRIS_RADIUS {
                    for wx in x - HARRIS_RADIUS..=x + HARRIS_RADIUS {
                        let (ix, iy) = (gx[wy * w + wx], gy[wy * w + wx]);
                        sxx += ix * ix;
                        syy += iy * iy;
                        sxy += ix * iy;
                    }
                }
                let (sxx, syy, sxy) = (sxx as f64, syy as f64, sxy as f64);
                let trace = sxx + syy;
                *out = sxx * syy - sxy * sxy - HARRIS_K * trace * trace;
            }
        });
    response
}

fn local_maxima(response: &[f64], w: usize, h: usize) -> Vec<(usize, usize, f64)> {
    let mut out = Vec::new();
    for y in BORDER..h - BORDER {
        for x in BORDER..w - BORDER {
            let r = response[y * w + x];
            if r <= 0.0 {
                continue;
            }
            let mut is_max = true;
            'window: for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (nx, ny) != (x, y) && response[ny * w + nx] > r {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                out.push((x, y, r));
            }
        }
    }
    out
}

/// Keep the strongest `per_cell` corners of every grid cell, then the global cap
fn bucket(
    candidates: Vec<(usize, usize, f64)>,
    width: usize,
    config: &FeatureConfig,
) -> Vec<(usize, usize, f64)> {
    let cell = config.cell_size.max(1);
    let cols = width.div_ceil(cell);
    let mut cells: Vec<Vec<(usize, usize, f64)>> = Vec::new();
    for c in candidates {
        let idx = (c.1 / cell) * cols + c.0 / cell;
        if idx >= cells.len() {
            cells.resize_with(idx + 1, Vec::new);
        }
        cells[idx].push(c);
    }

    let strongest_first = |a: &(usize, usize, f64), b: &(usize, usize, f64)| {
        b.2.total_cmp(&a.2).then((a.1, a.0).cmp(&(b.1, b.0)))
    };
    let mut kept: Vec<(usize, usize, f64)> = cells
        .into_iter()
        .flat_map(|mut bucket| {
            bucket.sort_by(strongest_first);
            bucket.truncate(config.per_cell);
            bucket
        })
        .collect();
    if kept.len() > config.max_features {
        kept.sort_by(strongest_first);
        kept.truncate(config.max_features);
    }
    kept
}

fn orientation(img: &SummedImage, x: usize, y: usize) -> f64 {
    let (mut m10, mut m01) = (0i64, 0i64);
    let r2 = ORIENTATION_RADIUS * ORIENTATION_RADIUS;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let v = i64::from(img.at((x as i32 + dx) as usize, (y as i32 + dy) as usize));
            m10 += i64::from(dx) * v;
            m01 += i64::from(dy) * v;
        }
    }
    (m01 as f64).atan2(m10 as f64)
}

fn describe(img: &SummedImage, kp: &Keypoint, pattern: &[[(f64, f64); 2]]) -> Descriptor {
    let (sin, cos) = kp.angle.sin_cos();
    let sample = |(px, py): (f64, f64)| -> i32 {
        let rx = (cos * px - sin * py).round() as i64;
        let ry = (sin * px + cos * py).round() as i64;
        img.at((kp.x as i64 + rx) as usize, (kp.y as i64 + ry) as usize)
    };

    let mut bits = [0u64; 4];
    for (i, pair) in pattern.iter().enumerate() {
        if sample(pair[0]) < sample(pair[1]) {
            bits[i / 64] |= 1 << (i % 64);
        }
    }
    Descriptor(bits)
}

/// Fixed test-pair pattern shared by every descriptor
fn sampling_pattern() -> &'static [[(f64, f64); 2]] {
    static PATTERN: OnceLock<Vec<[(f64, f64); 2]>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
        let mut point = move || loop {
            let x = rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            let y = rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            if x * x + y * y <= PATTERN_RADIUS * PATTERN_RADIUS {
                return (f64::from(x), f64::from(y));
            }
        };
        (0..DESCRIPTOR_BITS).map(|_| [point(), point()]).collect()
    })
}

/// Brute-force Hamming matching keeping only mutual nearest neighbors
pub fn match_cross_check(query: &[Descriptor], train: &[Descriptor]) -> Vec<FeatureMatch> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }
    let nearest = |d: &Descriptor, set: &[Descriptor]| -> (usize, u32) {
        set.iter()
            .enumerate()
            .map(|(i, other)| (i, d.distance(other)))
            .min_by_key(|&(i, dist)| (dist, i))
            .unwrap_or((0, u32::MAX))
    };

    let forward: Vec<(usize, u32)> = query.par_iter().map(|d| nearest(d, train)).collect();
    let backward: Vec<usize> = train.par_iter().map(|d| nearest(d, query).0).collect();

    forward
        .into_iter()
        .enumerate()
        .filter(|&(qi, (ti, _))| backward[ti] == qi)
        .map(|(qi, (ti, distance))| FeatureMatch {
            query: qi,
            train: ti,
            distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::RngCore;

    fn block_noise(w: u32, h: u32, seed: u64) -> GrayImage {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bits: Vec<bool> = (0..(w / 2) * (h / 2)).map(|_| rng.next_u32() & 1 == 1).collect();
        GrayImage::from_fn(w, h, |x, y| {
            let p1 = bits[((y / 2) * (w / 2) + x / 2) as usize];
            let diag = (x % 2) == (y % 2);
            Luma([if p1 != diag { 0 } else { 255 }])
        })
    }

    #[test]
    fn test_flat_image_has_no_features() {
        let img = GrayImage::from_pixel(100, 100, Luma([255]));
        assert!(detect_and_describe(&img, &FeatureConfig::default()).is_empty());
    }

    #[test]
    fn test_block_noise_has_features() {
        let img = block_noise(200, 200, 1);
        let features = detect_and_describe(&img, &FeatureConfig::default());
        assert!(features.len() > 50, "only {} features", features.len());
        assert_eq!(features.len(), features.descriptors.len());
        for kp in &features.keypoints {
            assert!(kp.x >= BORDER && kp.x < 200 - BORDER);
        }
    }

    #[test]
    fn test_identical_images_match_exactly() {
        let img = block_noise(160, 160, 2);
        let features = detect_and_describe(&img, &FeatureConfig::default());
        let matches = match_cross_check(&features.descriptors, &features.descriptors);
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|m| m.distance == 0));
    }

    #[test]
    fn test_translated_copy_matches() {
        let base = block_noise(240, 240, 3);
        let shifted = image::imageops::crop_imm(&base, 10, 6, 200, 200).to_image();
        let original = image::imageops::crop_imm(&base, 0, 0, 200, 200).to_image();

        let config = FeatureConfig::default();
        let fa = detect_and_describe(&shifted, &config);
        let fb = detect_and_describe(&original, &config);
        let matches = match_cross_check(&fa.descriptors, &fb.descriptors);

        let consistent = matches
            .iter()
            .filter(|m| {
                let a = fa.keypoints[m.query];
                let b = fb.keypoints[m.train];
                a.x + 10 == b.x && a.y + 6 == b.y
            })
            .count();
        assert!(consistent >= 10, "only {consistent} consistent matches");
    }

    #[test]
    fn test_descriptor_distance() {
        let a = Descriptor([0, 0, 0, 0]);
        let b = Descriptor([0b1011, 0, 1, u64::MAX]);
        assert_eq!(a.distance(&b), 3 + 1 + 64);
    }
}
