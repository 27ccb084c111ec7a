//! Reconstruction operator: the pixel-level combine shared by every
//! alignment strategy.
//!
//! Both inputs are thresholded at mid-gray; pixels where the shares agree
//! become white, pixels where they disagree become black (`NOT(XOR)`), and the
//! result is reduced 2× back to module resolution. A share block stacked on the
//! same block gives all-white, on its complement all-black, so a correctly
//! aligned pair reproduces the secret bitmap exactly.

use image::{GrayImage, Luma};

use crate::models::{BLACK, WHITE};
use crate::utils::binarization::{MID_GRAY, threshold_binarize};
use crate::utils::imaging::downsample_2x;

/// Output of [`combine`]
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Recovered secret bitmap (module resolution)
    pub stacked: GrayImage,
    /// The share A region that was combined, binarized
    pub aligned_share_a: GrayImage,
}

/// Combine two equally sized share regions.
///
/// Returns `None` when the shapes differ. The 2× reduction is skipped when
/// either dimension is odd, since the block grid is then already broken.
pub fn combine(share_a: &GrayImage, share_b: &GrayImage) -> Option<Reconstruction> {
    let (width, height) = share_a.dimensions();
    if share_b.dimensions() != (width, height) || width == 0 || height == 0 {
        return None;
    }

    let a = threshold_binarize(share_a, MID_GRAY);
    let b = threshold_binarize(share_b, MID_GRAY);
    let agree = GrayImage::from_fn(a.width(), a.height(), |x, y| {
        if a.get_pixel(x, y)[0] == b.get_pixel(x, y)[0] {
            Luma([WHITE])
        } else {
            Luma([BLACK])
        }
    });

    let stacked = if agree.width() % 2 == 0 && agree.height() % 2 == 0 {
        downsample_2x(&agree)
    } else {
        agree
    };
    Some(Reconstruction {
        stacked,
        aligned_share_a: a,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinaryImage, Block};

    #[test]
    fn test_same_block_is_white_complement_is_black() {
        let mut a = BinaryImage::new(4, 2);
        let mut b = BinaryImage::new(4, 2);
        Block::P0.write(&mut a, 0, 0);
        Block::P0.write(&mut b, 0, 0);
        Block::P1.write(&mut a, 1, 0);
        Block::P0.write(&mut b, 1, 0);

        let r = combine(&a.to_gray(), &b.to_gray()).unwrap();
        assert_eq!(r.stacked.dimensions(), (2, 1));
        assert_eq!(r.stacked.get_pixel(0, 0)[0], WHITE);
        assert_eq!(r.stacked.get_pixel(1, 0)[0], BLACK);
    }

    #[test]
    fn test_threshold_is_mid_gray() {
        let a = GrayImage::from_pixel(2, 2, Luma([128]));
        let b = GrayImage::from_pixel(2, 2, Luma([129]));
        let r = combine(&a, &b).unwrap();
        // 128 counts as black, 129 as white
        assert_eq!(r.stacked.get_pixel(0, 0)[0], BLACK);
        assert_eq!(r.aligned_share_a.get_pixel(0, 0)[0], BLACK);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(4, 6);
        assert!(combine(&a, &b).is_none());
    }

    #[test]
    fn test_odd_dimensions_skip_downsample() {
        let a = GrayImage::from_pixel(3, 5, Luma([0]));
        let r = combine(&a, &a).unwrap();
        assert_eq!(r.stacked.dimensions(), (3, 5));
    }
}
