//! 2-of-2 share generation with 2×2 pixel expansion.
//!
//! Each module of the secret QR bitmap becomes one 2×2 block in each share.
//! Share A gets a uniformly random canonical block; share B gets the same
//! block for a white module and its complement for a black one. Either share
//! alone is therefore a field of independent coin flips.

pub mod font;
pub mod label;
pub mod markers;

use image::GrayImage;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::error::Result;
use crate::models::{BinaryImage, Block};
use crate::qr::{ECLevel, encode};
use markers::MarkerBorder;

/// The two halves of a secret, as grayscale images (black = 0, white = 255)
#[derive(Debug, Clone, PartialEq)]
pub struct SharePair {
    pub share_a: GrayImage,
    pub share_b: GrayImage,
}

/// Share generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareGenerator {
    pub ec_level: ECLevel,
    /// Pixels per QR module before the resolution upscale
    pub module_scale: usize,
    /// Quiet zone, in modules
    pub border_modules: usize,
    /// The secret bitmap is upscaled until its larger side reaches this
    pub min_resolution: usize,
    /// Fiducial border stamped on both shares
    pub border: Option<MarkerBorder>,
}

impl Default for ShareGenerator {
    fn default() -> Self {
        Self {
            ec_level: ECLevel::H,
            module_scale: 4,
            border_modules: 4,
            min_resolution: 300,
            border: Some(MarkerBorder::default()),
        }
    }
}

impl ShareGenerator {
    pub fn with_border(mut self, border: Option<MarkerBorder>) -> Self {
        self.border = border;
        self
    }

    /// Split `payload` into two shares using the OS CSPRNG
    pub fn generate(&self, payload: &str) -> Result<SharePair> {
        self.generate_with_rng(payload, &mut OsRng)
    }

    /// Split `payload` into two shares using `rng` for the block coins
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        &self,
        payload: &str,
        rng: &mut R,
    ) -> Result<SharePair> {
        let secret = self.secret_bitmap(payload)?;
        let (a, b) = expand(&secret, rng);
        debug!(
            secret_width = secret.width(),
            secret_height = secret.height(),
            bordered = self.border.is_some(),
            "generated share pair"
        );

        let (share_a, share_b) = match &self.border {
            Some(border) => (border.apply(&a.to_gray()), border.apply(&b.to_gray())),
            None => (a.to_gray(), b.to_gray()),
        };
        Ok(SharePair { share_a, share_b })
    }

    /// The QR bitmap that gets split: encoded, upscaled to working resolution,
    /// padded to even dimensions
    pub fn secret_bitmap(&self, payload: &str) -> Result<BinaryImage> {
        let qr = encode(payload, self.ec_level, self.module_scale, self.border_modules)?;
        let longest = qr.width().max(qr.height()).max(1);
        let scale = self.min_resolution.div_ceil(longest).max(1);
        Ok(qr.upscale(scale).pad_to_even())
    }
}

/// Pixel-expand `secret` into two shares, one block per secret pixel
pub fn expand<R: RngCore + CryptoRng>(
    secret: &BinaryImage,
    rng: &mut R,
) -> (BinaryImage, BinaryImage) {
    let (w, h) = (secret.width(), secret.height());
    let mut share_a = BinaryImage::new(w * 2, h * 2);
    let mut share_b = BinaryImage::new(w * 2, h * 2);

    let mut coins = [0u8; 64];
    let mut used = coins.len() * 8;
    for y in 0..h {
        for x in 0..w {
            if used == coins.len() * 8 {
                rng.fill_bytes(&mut coins);
                used = 0;
            }
            let bit = (coins[used / 8] >> (used % 8)) & 1 == 1;
            used += 1;

            let block = Block::from_bit(bit);
            block.write(&mut share_a, x, y);
            if secret.get(x, y) {
                block.complement().write(&mut share_b, x, y);
            } else {
                block.write(&mut share_b, x, y);
            }
        }
    }
    (share_a, share_b)
}
