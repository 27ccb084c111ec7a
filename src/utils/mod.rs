//! Utility functions for image processing
//!
//! - Binarization (fixed mid-gray threshold and Otsu's method)
//! - Geometry (homography estimation, RANSAC)
//! - Imaging (PNG/base64 I/O, crops, resampling, rotations)

pub mod binarization;
pub mod geometry;
pub mod imaging;
