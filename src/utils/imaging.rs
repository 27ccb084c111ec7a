//! Image I/O and exact pixel operations shared by the codec and alignment engine.
//!
//! Everything here is nearest-neighbor or copy-only: share images carry their
//! secret in 2×2 pixel blocks, so interpolation would destroy it.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, GrayImage, ImageEncoder, Luma};

use crate::error::{Error, Result};
use crate::models::WHITE;

/// Decode any supported image format into 8-bit grayscale
pub fn load_gray(bytes: &[u8]) -> Result<GrayImage> {
    let img = image::load_from_memory(bytes).map_err(|e| Error::InvalidImage(e.to_string()))?;
    Ok(img.to_luma8())
}

/// Encode a grayscale image as PNG
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    PngEncoder::new(&mut out).write_image(img.as_raw(), img.width(), img.height(), ColorType::L8)?;
    Ok(out.into_inner())
}

/// PNG-encode and base64 (standard alphabet) an image
pub fn png_base64(img: &GrayImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(img)?))
}

/// Decode a base64 string into raw bytes
pub fn base64_to_bytes(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidImage(format!("bad base64: {e}")))
}

/// Copy out a rectangle, clamped to the image bounds
pub fn crop(img: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    let x = x.min(img.width());
    let y = y.min(img.height());
    let width = width.min(img.width() - x);
    let height = height.min(img.height() - y);
    imageops::crop_imm(img, x, y, width, height).to_image()
}

/// Nearest-neighbor resize; a no-op copy when the size already matches
pub fn resize_nearest(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Nearest)
}

/// Keep the top-left pixel of every 2×2 block
pub fn downsample_2x(img: &GrayImage) -> GrayImage {
    GrayImage::from_fn(img.width() / 2, img.height() / 2, |x, y| {
        *img.get_pixel(x * 2, y * 2)
    })
}

/// Surround an image with a uniform white margin
pub fn pad_white(img: &GrayImage, margin: u32) -> GrayImage {
    let mut out = GrayImage::from_pixel(
        img.width() + margin * 2,
        img.height() + margin * 2,
        Luma([WHITE]),
    );
    imageops::replace(&mut out, img, i64::from(margin), i64::from(margin));
    out
}

/// Cardinal rotation, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation
    None,
    /// 90° clockwise
    Cw90,
    /// 180°
    Cw180,
    /// 270° clockwise (90° counter-clockwise)
    Cw270,
}

impl Rotation {
    /// Rotation that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Rotation::None => Rotation::None,
            Rotation::Cw90 => Rotation::Cw270,
            Rotation::Cw180 => Rotation::Cw180,
            Rotation::Cw270 => Rotation::Cw90,
        }
    }

    /// Exact pixel rotation (no resampling)
    pub fn apply(self, img: &GrayImage) -> GrayImage {
        match self {
            Rotation::None => img.clone(),
            Rotation::Cw90 => imageops::rotate90(img),
            Rotation::Cw180 => imageops::rotate180(img),
            Rotation::Cw270 => imageops::rotate270(img),
        }
    }

    /// Degrees clockwise
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([(x * 10 + y) as u8]))
    }

    #[test]
    fn test_png_roundtrip() {
        let img = gradient(7, 5);
        let bytes = encode_png(&img).unwrap();
        assert_eq!(load_gray(&bytes).unwrap(), img);

        let b64 = png_base64(&img).unwrap();
        assert_eq!(base64_to_bytes(&b64).unwrap(), bytes);
    }

    #[test]
    fn test_garbage_is_invalid_image() {
        assert!(matches!(load_gray(b"not an image"), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_crop_clamps() {
        let img = gradient(10, 10);
        let c = crop(&img, 8, 8, 5, 5);
        assert_eq!(c.dimensions(), (2, 2));
        assert_eq!(c.get_pixel(0, 0), img.get_pixel(8, 8));
    }

    #[test]
    fn test_rotation_inverse_is_exact() {
        let img = gradient(6, 4);
        for rotation in [Rotation::None, Rotation::Cw90, Rotation::Cw180, Rotation::Cw270] {
            let back = rotation.inverse().apply(&rotation.apply(&img));
            assert_eq!(back, img);
        }
        assert_eq!(Rotation::Cw90.apply(&img).dimensions(), (4, 6));
    }

    #[test]
    fn test_downsample_and_pad() {
        let img = gradient(4, 4);
        let small = downsample_2x(&img);
        assert_eq!(small.dimensions(), (2, 2));
        assert_eq!(small.get_pixel(1, 1), img.get_pixel(2, 2));

        let padded = pad_white(&img, 3);
        assert_eq!(padded.dimensions(), (10, 10));
        assert_eq!(padded.get_pixel(0, 0)[0], WHITE);
        assert_eq!(padded.get_pixel(3, 3), img.get_pixel(0, 0));
    }
}
