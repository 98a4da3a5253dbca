//! BGRA frame to base64 PNG.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{PlatformError, RawFrame};

/// Encodes a captured frame as a real PNG and returns it base64-encoded.
pub fn encode_png_base64(frame: &RawFrame) -> Result<String, PlatformError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.bgra.len() != expected {
        return Err(PlatformError::Encode(format!(
            "frame is {} bytes, expected {} for {}x{} BGRA",
            frame.bgra.len(),
            expected,
            frame.width,
            frame.height
        )));
    }

    // Capture hands us BGRA; the encoder wants RGBA.
    let mut rgba = frame.bgra.clone();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let mut png = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut png));
    encoder
        .write_image(&rgba, frame.width, frame.height, ExtendedColorType::Rgba8)
        .map_err(|err| PlatformError::Encode(err.to_string()))?;

    Ok(general_purpose::STANDARD.encode(&png))
}
