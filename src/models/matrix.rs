use image::{GrayImage, Luma};

/// Gray value written for a black pixel.
pub const BLACK: u8 = 0;
/// Gray value written for a white pixel.
pub const WHITE: u8 = 255;

/// Compact black/white pixel grid (black = `true`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BinaryImage {
    /// Create an all-white image with the given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get pixel at (x, y); out-of-range reads are white
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Set pixel at (x, y); out-of-range writes are ignored
    pub fn set(&mut self, x: usize, y: usize, black: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if black {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Number of black pixels
    pub fn count_black(&self) -> usize {
        let mut count = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Nearest-neighbor upscale: every pixel becomes a `factor`×`factor` square
    pub fn upscale(&self, factor: usize) -> Self {
        let factor = factor.max(1);
        let mut out = Self::new(self.width * factor, self.height * factor);
        for y in 0..out.height {
            for x in 0..out.width {
                if self.get(x / factor, y / factor) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    /// Pad with one white column and/or row so both dimensions are even
    pub fn pad_to_even(&self) -> Self {
        let width = self.width + self.width % 2;
        let height = self.height + self.height % 2;
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = Self::new(width, height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    /// Render as 8-bit grayscale (black = 0, white = 255)
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                Luma([BLACK])
            } else {
                Luma([WHITE])
            }
        })
    }

    /// Threshold a grayscale image: values at or below `threshold` are black
    pub fn from_gray(gray: &GrayImage, threshold: u8) -> Self {
        let mut out = Self::new(gray.width() as usize, gray.height() as usize);
        for (x, y, pixel) in gray.enumerate_pixels() {
            if pixel[0] <= threshold {
                out.set(x as usize, y as usize, true);
            }
        }
        out
    }
}

impl Default for BinaryImage {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
