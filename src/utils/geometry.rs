/// Projective transforms between share images and their robust estimation
use nalgebra::{Matrix3, SMatrix, SymmetricEigen, Vector3};
use rand::SeedableRng;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;

use crate::models::Point;

/// Fixed seed so repeated alignment of the same inputs gives the same model.
const RANSAC_SEED: u64 = 0x5eed_ca5c;

/// Planar homography (3x3, row-major, normalized so h33 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// Build from a raw matrix, rejecting degenerate ones
    pub fn from_matrix(m: Matrix3<f64>) -> Option<Self> {
        if !m.iter().all(|v| v.is_finite()) || m[(2, 2)].abs() < 1e-12 {
            return None;
        }
        let m = m / m[(2, 2)];
        if m.determinant().abs() < 1e-9 {
            return None;
        }
        Some(Self { m })
    }

    /// Exact transform from 4 source points to 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Direct linear transform with h33 fixed to 1
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (f64::from(src[i].x), f64::from(src[i].y));
            let (dx, dy) = (f64::from(dst[i].x), f64::from(dst[i].y));

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        let h = solve_linear_system(&a, &b)?;
        Self::from_matrix(Matrix3::new(
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
        ))
    }

    /// Least-squares fit over any number (>= 4) of correspondences.
    ///
    /// Hartley-normalized DLT; the solution is the eigenvector of AᵀA with the
    /// smallest eigenvalue.
    pub fn fit(src: &[Point], dst: &[Point]) -> Option<Self> {
        if src.len() < 4 || src.len() != dst.len() {
            return None;
        }
        let (ns, ts) = normalize(src)?;
        let (nd, td) = normalize(dst)?;

        let mut ata = SMatrix::<f64, 9, 9>::zeros();
        for (s, d) in ns.iter().zip(&nd) {
            let (x, y, u, v) = (s[0], s[1], d[0], d[1]);
            let r1 = SMatrix::<f64, 1, 9>::from_row_slice(&[
                -x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u,
            ]);
            let r2 = SMatrix::<f64, 1, 9>::from_row_slice(&[
                0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v,
            ]);
            ata += r1.transpose() * r1 + r2.transpose() * r2;
        }

        let eigen = SymmetricEigen::new(ata);
        let (min_idx, _) = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let h = eigen.eigenvectors.column(min_idx);
        let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

        let td_inv = td.try_inverse()?;
        Self::from_matrix(td_inv * hn * ts)
    }

    /// Transform a point
    pub fn apply(&self, p: &Point) -> Option<Point> {
        let v = self.m * Vector3::new(f64::from(p.x), f64::from(p.y), 1.0);
        if v[2].abs() < 1e-12 {
            return None;
        }
        Some(Point::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32))
    }

    /// Inverse transform
    pub fn inverse(&self) -> Option<Self> {
        self.m.try_inverse().and_then(Self::from_matrix)
    }

    /// Reprojection error of one correspondence
    pub fn reprojection_error(&self, src: &Point, dst: &Point) -> f32 {
        match self.apply(src) {
            Some(p) => p.distance(dst),
            None => f32::INFINITY,
        }
    }
}

/// Translate to the centroid and scale so the mean distance is √2
fn normalize(points: &[Point]) -> Option<(Vec<[f64; 2]>, Matrix3<f64>)> {
    let c = Point::centroid(points)?;
    let (cx, cy) = (f64::from(c.x), f64::from(c.y));
    let mean_dist = points
        .iter()
        .map(|p| (f64::from(p.x) - cx).hypot(f64::from(p.y) - cy))
        .sum::<f64>()
        / points.len() as f64;
    if mean_dist < 1e-9 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| [s * (f64::from(p.x) - cx), s * (f64::from(p.y) - cy)])
        .collect();
    Some((normalized, t))
}

/// Outcome of a robust homography fit
#[derive(Debug, Clone)]
pub struct RansacFit {
    /// Estimated transform (source → destination)
    pub homography: Homography,
    /// Inlier flags, parallel to the input correspondences
    pub inliers: Vec<bool>,
}

impl RansacFit {
    /// Number of inliers
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&i| i).count()
    }
}

/// RANSAC homography: random 4-point models scored by inlier count under
/// `threshold` pixels of reprojection error, then a least-squares refit over
/// the winning inlier set.
pub fn find_homography_ransac(
    src: &[Point],
    dst: &[Point],
    threshold: f32,
    iterations: usize,
) -> Option<RansacFit> {
    let n = src.len();
    if n < 4 || n != dst.len() {
        return None;
    }

    let count_inliers = |h: &Homography| -> Vec<bool> {
        src.iter()
            .zip(dst)
            .map(|(s, d)| h.reprojection_error(s, d) < threshold)
            .collect()
    };

    let mut rng = ChaCha8Rng::seed_from_u64(RANSAC_SEED);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;

    for _ in 0..iterations {
        let picks = sample(&mut rng, n, 4);
        let s = [0, 1, 2, 3].map(|i| src[picks.index(i)]);
        let d = [0, 1, 2, 3].map(|i| dst[picks.index(i)]);
        let Some(h) = Homography::from_points(&s, &d) else {
            continue;
        };
        let inliers = count_inliers(&h);
        let count = inliers.iter().filter(|&&i| i).count();
        if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
            let done = count == n;
            best = Some((h, inliers, count));
            if done {
                break;
            }
        }
    }

    let (mut homography, mut inliers, count) = best?;
    if count < 4 {
        return None;
    }

    let (in_src, in_dst): (Vec<Point>, Vec<Point>) = src
        .iter()
        .zip(dst)
        .zip(&inliers)
        .filter(|(_, keep)| **keep)
        .map(|((s, d), _)| (*s, *d))
        .unzip();
    if let Some(refit) = Homography::fit(&in_src, &in_dst) {
        let refit_inliers = count_inliers(&refit);
        if refit_inliers.iter().filter(|&&i| i).count() >= count {
            homography = refit;
            inliers = refit_inliers;
        }
    }

    Some(RansacFit {
        homography,
        inliers,
    })
}

/// Solve 8x8 linear system using Gaussian elimination
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    // Forward elimination
    for i in 0..n {
        // Find pivot
        let mut max_val = a[i][i].abs();
        let mut max_row = i;

        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        // Check for singular matrix
        if max_val < 1e-10 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];

            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}
