use image::GrayImage;

use super::AlignmentStrategy;
use crate::reconstruct::{Reconstruction, combine};
use crate::utils::imaging::{crop, resize_nearest};

/// Overlay share A on share B as-is.
///
/// A is cropped from its top-left corner to B's size (dropping a label footer)
/// and resized only if it is still a different shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectStrategy;

impl AlignmentStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn attempt(&self, share_a: &GrayImage, share_b: &GrayImage) -> Option<Reconstruction> {
        let (width, height) = share_b.dimensions();
        let cropped = crop(share_a, 0, 0, width, height);
        let fitted = resize_nearest(&cropped, width, height);
        combine(&fitted, share_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BinaryImage;
    use crate::share::expand;
    use crate::utils::imaging::pad_white;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn pair() -> (BinaryImage, GrayImage, GrayImage) {
        let mut secret = BinaryImage::new(16, 16);
        for i in 0..16 {
            secret.set(i, i, true);
            secret.set(15 - i, i, true);
        }
        let (a, b) = expand(&secret, &mut ChaCha20Rng::seed_from_u64(5));
        (secret, a.to_gray(), b.to_gray())
    }

    #[test]
    fn test_footer_is_cropped_away() {
        let (secret, a, b) = pair();
        let mut footed = pad_white(&a, 10);
        footed = crop(&footed, 10, 10, a.width(), a.height() + 10);
        let r = DirectStrategy.attempt(&footed, &b).unwrap();
        assert_eq!(BinaryImage::from_gray(&r.stacked, 128), secret);
    }

    #[test]
    fn test_smaller_share_is_resized() {
        let (_, a, b) = pair();
        let small = crop(&a, 0, 0, 20, 20);
        let r = DirectStrategy.attempt(&small, &b).unwrap();
        assert_eq!(r.aligned_share_a.dimensions(), b.dimensions());
    }
}
