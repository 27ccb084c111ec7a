//! QR bitmap codec
//!
//! Encoding goes through the `qrcode` crate into a [`BinaryImage`] module grid;
//! decoding runs a cascade of `rqrr` backends over both polarities.
//!
//! [`BinaryImage`]: crate::models::BinaryImage

pub mod decode;
pub mod encode;

pub use decode::{QrBackend, QrDecoder, decode};
pub use encode::encode;

/// Error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    #[default]
    H,
}

impl From<ECLevel> for qrcode::EcLevel {
    fn from(level: ECLevel) -> Self {
        match level {
            ECLevel::L => qrcode::EcLevel::L,
            ECLevel::M => qrcode::EcLevel::M,
            ECLevel::Q => qrcode::EcLevel::Q,
            ECLevel::H => qrcode::EcLevel::H,
        }
    }
}
