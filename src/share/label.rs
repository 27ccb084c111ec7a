//! Human-readable footer on the issued share A.
//!
//! The footer sits below the share (and its marker margin), so it never
//! overlaps the secret region: a small QR of the check-in code on the left and
//! two lines of text naming the code and the ticket UUID.

use image::{GrayImage, Luma, imageops};

use super::font::{GLYPH_HEIGHT, draw_text};
use crate::error::Result;
use crate::models::WHITE;
use crate::qr::{ECLevel, QrDecoder, encode};
use crate::utils::imaging::{crop, load_gray};

/// Footer height in pixels
pub const LABEL_HEIGHT: u32 = 140;
/// Bottom band searched when reading the code back
pub const CODE_BAND_HEIGHT: u32 = 200;
const LABEL_PADDING: u32 = 12;
const CODE_QR_BORDER: usize = 2;
const CODE_QR_SCALE: usize = 6;

/// Standalone QR of the check-in code
pub fn code_qr(check_in_code: &str) -> Result<GrayImage> {
    Ok(encode(check_in_code, ECLevel::M, CODE_QR_SCALE, CODE_QR_BORDER)?.to_gray())
}

/// Append the label footer to `share_a`
pub fn compose_share_a(
    share_a: &GrayImage,
    check_in_code: &str,
    user_uuid: &str,
) -> Result<GrayImage> {
    let (width, height) = share_a.dimensions();
    let mut out = GrayImage::from_pixel(width, height + LABEL_HEIGHT, Luma([WHITE]));
    imageops::replace(&mut out, share_a, 0, 0);

    let modules = encode(check_in_code, ECLevel::M, 1, CODE_QR_BORDER)?;
    let fit = (LABEL_HEIGHT - 2 * LABEL_PADDING) as usize;
    let scale = (fit / modules.width().max(1)).max(1);
    let qr = modules.upscale(scale).to_gray();
    let qr_top = height + (LABEL_HEIGHT.saturating_sub(qr.height())) / 2;
    imageops::replace(&mut out, &qr, i64::from(LABEL_PADDING), i64::from(qr_top));

    let text_x = LABEL_PADDING * 2 + qr.width();
    let code_line = format!("CODE: {check_in_code}");
    let uuid_line = format!("UUID: {user_uuid}");
    let code_y = height + LABEL_HEIGHT / 2 - GLYPH_HEIGHT * 2 - 6;
    draw_text(&mut out, &code_line, text_x, code_y, 2);
    draw_text(&mut out, &uuid_line, text_x, height + LABEL_HEIGHT / 2 + 6, 1);
    Ok(out)
}

/// Read the check-in code from the footer of an encoded share A image.
/// Unreadable images yield `None`.
pub fn extract_check_in_code(share_a_bytes: &[u8]) -> Option<String> {
    load_gray(share_a_bytes).ok().and_then(|gray| find_check_in_code(&gray))
}

/// Read the check-in code from the bottom band of a share A image
pub fn find_check_in_code(share_a: &GrayImage) -> Option<String> {
    let (width, height) = share_a.dimensions();
    let band = CODE_BAND_HEIGHT.min(height);
    let bottom = crop(share_a, 0, height - band, width, band);
    QrDecoder::new()
        .decode_all(&bottom)
        .into_iter()
        .map(|text| text.trim().to_string())
        .find(|text| is_check_in_code(text))
}

fn is_check_in_code(text: &str) -> bool {
    (6..=12).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit())
}
