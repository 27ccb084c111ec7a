//! Share alignment engine.
//!
//! An ordered cascade of strategies, each producing a candidate reconstruction
//! that the QR decoder judges. The first decodable candidate wins; if none
//! decodes, the last candidate produced is returned undecoded so the caller
//! still gets debug images.

pub mod direct;
pub mod fiducial;
pub mod homography;

use image::GrayImage;
use tracing::debug;

pub use direct::DirectStrategy;
pub use fiducial::FiducialStrategy;
pub use homography::HomographyStrategy;

use crate::error::{Error, Result};
use crate::qr::QrDecoder;
use crate::reconstruct::Reconstruction;
use crate::share::markers::MarkerBorder;
use crate::utils::imaging::load_gray;

/// One way of registering share A onto share B
pub trait AlignmentStrategy: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Combine the shares, or `None` if this strategy cannot register them
    fn attempt(&self, share_a: &GrayImage, share_b: &GrayImage) -> Option<Reconstruction>;
}

/// Result of [`AlignmentEngine::align`]
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Recovered secret bitmap
    pub stacked: GrayImage,
    /// Share A as it was combined
    pub aligned_share_a: GrayImage,
    /// Strategy that produced `stacked`
    pub strategy: &'static str,
    /// Decoded QR payload, if any strategy produced a readable one
    pub decoded: Option<String>,
}

impl Alignment {
    pub fn is_decoded(&self) -> bool {
        self.decoded.is_some()
    }
}

pub struct AlignmentEngine {
    strategies: Vec<Box<dyn AlignmentStrategy>>,
    decoder: QrDecoder,
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self::new(Some(MarkerBorder::default()))
    }
}

impl AlignmentEngine {
    /// Fiducial derotation (only with a border), direct overlay, then homography
    pub fn new(border: Option<MarkerBorder>) -> Self {
        let mut strategies: Vec<Box<dyn AlignmentStrategy>> = Vec::new();
        if let Some(border) = border {
            strategies.push(Box::new(FiducialStrategy::new(border)));
        }
        strategies.push(Box::new(DirectStrategy));
        strategies.push(Box::new(HomographyStrategy::default()));
        Self::with_strategies(strategies, QrDecoder::new())
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn AlignmentStrategy>>,
        decoder: QrDecoder,
    ) -> Self {
        Self { strategies, decoder }
    }

    /// Names of the strategies, in cascade order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Align two encoded share images. Fails only on unreadable input or when
    /// no strategy could produce any reconstruction.
    pub fn align(&self, share_a: &[u8], share_b: &[u8]) -> Result<Alignment> {
        let a = load_gray(share_a)?;
        let b = load_gray(share_b)?;
        self.align_images(&a, &b)
    }

    pub fn align_images(&self, share_a: &GrayImage, share_b: &GrayImage) -> Result<Alignment> {
        let mut fallback: Option<(&'static str, Reconstruction)> = None;
        for strategy in &self.strategies {
            let Some(candidate) = strategy.attempt(share_a, share_b) else {
                debug!(strategy = strategy.name(), "alignment: no candidate");
                continue;
            };
            if let Some(text) = self.decoder.decode(&candidate.stacked) {
                debug!(strategy = strategy.name(), "alignment: decoded");
                return Ok(Alignment {
                    stacked: candidate.stacked,
                    aligned_share_a: candidate.aligned_share_a,
                    strategy: strategy.name(),
                    decoded: Some(text),
                });
            }
            debug!(strategy = strategy.name(), "alignment: candidate not decodable");
            fallback = Some((strategy.name(), candidate));
        }

        let (strategy, candidate) = fallback.ok_or(Error::AlignmentExhausted)?;
        Ok(Alignment {
            stacked: candidate.stacked,
            aligned_share_a: candidate.aligned_share_a,
            strategy,
            decoded: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::combine;
    use image::Luma;

    struct Fixed(&'static str, Option<GrayImage>);

    impl AlignmentStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn attempt(&self, _: &GrayImage, _: &GrayImage) -> Option<Reconstruction> {
            self.1.as_ref().and_then(|img| combine(img, img))
        }
    }

    fn engine(strategies: Vec<Box<dyn AlignmentStrategy>>) -> AlignmentEngine {
        AlignmentEngine::with_strategies(strategies, QrDecoder::new())
    }

    #[test]
    fn test_default_cascade_order() {
        assert_eq!(
            AlignmentEngine::default().strategy_names(),
            vec!["fiducial", "direct", "homography"]
        );
        assert_eq!(AlignmentEngine::new(None).strategy_names(), vec!["direct", "homography"]);
    }

    #[test]
    fn test_last_candidate_is_returned_undecoded() {
        let blank = GrayImage::from_pixel(8, 8, Luma([255]));
        let engine = engine(vec![
            Box::new(Fixed("first", Some(blank.clone()))),
            Box::new(Fixed("second", Some(blank))),
            Box::new(Fixed("third", None)),
        ]);
        let img = GrayImage::new(8, 8);
        let result = engine.align_images(&img, &img).unwrap();
        assert_eq!(result.strategy, "second");
        assert!(!result.is_decoded());
    }

    #[test]
    fn test_no_candidate_is_exhausted() {
        let engine = engine(vec![Box::new(Fixed("none", None))]);
        let img = GrayImage::new(8, 8);
        assert!(matches!(engine.align_images(&img, &img), Err(Error::AlignmentExhausted)));
    }

    #[test]
    fn test_bad_bytes_are_invalid_image() {
        let err = AlignmentEngine::default().align(b"junk", b"junk").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }
}
