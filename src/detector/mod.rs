//! Detection in share images
//!
//! - Connected black regions (marker candidates)
//! - Fiducial marker identification
//! - Oriented keypoint features and descriptor matching

/// Connected component labeling
pub mod connected_components;
/// Keypoint detection, description and matching
pub mod features;
/// Fiducial marker detection
pub mod markers;
