//! QR decoding cascade.
//!
//! Backends are tried in order, each first on the image as-is and then on a
//! polarity-inverted copy (stacked reconstructions can come out white-on-black).
//! The first non-empty string wins.

use image::GrayImage;
use rqrr::PreparedImage;
use tracing::trace;

use crate::utils::binarization::{invert, otsu_binarize};
use crate::utils::imaging::pad_white;

/// Quiet zone added by the single-symbol backend, in pixels
const FALLBACK_QUIET_ZONE: u32 = 16;

/// One QR detector/decoder
pub trait QrBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Every non-empty string decodable from `gray`
    fn decode_all(&self, gray: &GrayImage) -> Vec<String>;
}

/// Detect every symbol grid in the image and decode each of them
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiSymbol;

impl QrBackend for MultiSymbol {
    fn name(&self) -> &'static str {
        "multi"
    }

    fn decode_all(&self, gray: &GrayImage) -> Vec<String> {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let raw = gray.as_raw();
        let mut prepared = PreparedImage::prepare_from_greyscale(w, h, |x, y| raw[y * w + x]);
        prepared
            .detect_grids()
            .iter()
            .filter_map(|grid| grid.decode().ok())
            .map(|(_, content)| content)
            .filter(|content| !content.is_empty())
            .collect()
    }
}

/// Otsu-binarize, add a quiet zone, decode only the first grid found
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleSymbol;

impl QrBackend for SingleSymbol {
    fn name(&self) -> &'static str {
        "single"
    }

    fn decode_all(&self, gray: &GrayImage) -> Vec<String> {
        let padded = pad_white(&otsu_binarize(gray), FALLBACK_QUIET_ZONE);
        let (w, h) = (padded.width() as usize, padded.height() as usize);
        let raw = padded.as_raw();
        let mut prepared = PreparedImage::prepare_from_greyscale(w, h, |x, y| raw[y * w + x]);
        prepared
            .detect_grids()
            .first()
            .and_then(|grid| grid.decode().ok())
            .map(|(_, content)| content)
            .filter(|content| !content.is_empty())
            .into_iter()
            .collect()
    }
}

/// Ordered backend cascade
pub struct QrDecoder {
    backends: Vec<Box<dyn QrBackend>>,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    /// Multi-symbol first, then the single-symbol fallback
    pub fn new() -> Self {
        Self::with_backends(vec![Box::new(MultiSymbol), Box::new(SingleSymbol)])
    }

    pub fn with_backends(backends: Vec<Box<dyn QrBackend>>) -> Self {
        Self { backends }
    }

    /// First string any backend reads, in either polarity
    pub fn decode(&self, gray: &GrayImage) -> Option<String> {
        let inverted = invert(gray);
        for backend in &self.backends {
            for (polarity, img) in [("normal", gray), ("inverted", &inverted)] {
                if let Some(text) = backend.decode_all(img).into_iter().next() {
                    trace!(backend = backend.name(), polarity, "decoded QR");
                    return Some(text);
                }
            }
        }
        None
    }

    /// Every distinct string any backend reads, in either polarity, in cascade order
    pub fn decode_all(&self, gray: &GrayImage) -> Vec<String> {
        let inverted = invert(gray);
        let mut out: Vec<String> = Vec::new();
        for backend in &self.backends {
            for img in [gray, &inverted] {
                for text in backend.decode_all(img) {
                    if !out.contains(&text) {
                        out.push(text);
                    }
                }
            }
        }
        out
    }
}

/// Decode with the default cascade
pub fn decode(gray: &GrayImage) -> Option<String> {
    QrDecoder::new().decode(gray)
}
