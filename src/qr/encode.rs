use qrcode::{Color, QrCode};

use super::ECLevel;
use crate::error::{Error, Result};
use crate::models::BinaryImage;

/// Encode `text` as a QR symbol.
///
/// Every module becomes a `module_scale`×`module_scale` square and the symbol
/// is surrounded by `border_modules` white modules of quiet zone.
pub fn encode(
    text: &str,
    level: ECLevel,
    module_scale: usize,
    border_modules: usize,
) -> Result<BinaryImage> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), level.into())
        .map_err(|e| Error::QrEncode(e.to_string()))?;

    let n = code.width();
    let colors = code.to_colors();
    let size = n + border_modules * 2;
    let mut modules = BinaryImage::new(size, size);
    for (i, color) in colors.iter().enumerate() {
        if *color == Color::Dark {
            modules.set(i % n + border_modules, i / n + border_modules, true);
        }
    }
    Ok(modules.upscale(module_scale))
}
