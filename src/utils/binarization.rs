/// Global thresholding for grayscale share and reconstruction images
use image::{GrayImage, Luma};

use crate::models::{BLACK, WHITE};

/// Mid-gray cut used by the reconstruction operator
pub const MID_GRAY: u8 = 128;

/// Hard threshold: values at or below `threshold` become black (0), the rest white (255)
pub fn threshold_binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] <= threshold {
            Luma([BLACK])
        } else {
            Luma([WHITE])
        }
    })
}

/// Binarize with Otsu's automatically chosen threshold
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let threshold = calculate_otsu_threshold(gray.as_raw());
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] < threshold {
            Luma([BLACK])
        } else {
            Luma([WHITE])
        }
    })
}

/// Swap black and white
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    image::imageops::invert(&mut out);
    out
}

/// Calculate Otsu's optimal threshold
pub fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total_pixels = gray.len() as f64;
    let total_sum: u64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as u64 * count)
        .sum();

    let mut max_variance = 0.0;
    let mut optimal_threshold = MID_GRAY;
    let mut class1_pixels = 0u64;
    let mut class1_sum = 0u64;

    // class1 = intensities strictly below the candidate threshold
    for threshold in 1..=255usize {
        class1_pixels += histogram[threshold - 1];
        class1_sum += (threshold as u64 - 1) * histogram[threshold - 1];
        let class2_pixels = gray.len() as u64 - class1_pixels;

        if class1_pixels == 0 || class2_pixels == 0 {
            continue;
        }

        let class1_mean = class1_sum as f64 / class1_pixels as f64;
        let class2_mean = (total_sum - class1_sum) as f64 / class2_pixels as f64;

        let weight1 = class1_pixels as f64 / total_pixels;
        let weight2 = class2_pixels as f64 / total_pixels;

        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = GrayImage::from_raw(2, 2, vec![100, 150, 128, 50]).unwrap();
        let binary = threshold_binarize(&gray, MID_GRAY);

        assert_eq!(binary.get_pixel(0, 0)[0], BLACK); // 100 <= 128
        assert_eq!(binary.get_pixel(1, 0)[0], WHITE); // 150 > 128
        assert_eq!(binary.get_pixel(0, 1)[0], BLACK); // 128 <= 128
        assert_eq!(binary.get_pixel(1, 1)[0], BLACK);
    }

    #[test]
    fn test_otsu_binarize() {
        // Two-class image: dark top half, light bottom half
        let mut raw = vec![50u8; 50];
        raw.extend(vec![200u8; 50]);
        let gray = GrayImage::from_raw(10, 10, raw).unwrap();

        let binary = otsu_binarize(&gray);
        assert_eq!(binary.get_pixel(0, 0)[0], BLACK);
        assert_eq!(binary.get_pixel(0, 7)[0], WHITE);
    }

    #[test]
    fn test_invert() {
        let gray = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        assert_eq!(invert(&gray).as_raw(), &vec![255, 0]);
    }
}
