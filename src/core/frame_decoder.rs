// Frame decoder - turns a data-URL style base64 frame into an RGB raster

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbImage;
use thiserror::Error;

/// Separator between the data-URL metadata prefix and the payload
pub const BASE64_MARKER: &str = "base64,";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed base64 payload: {0}")]
    MalformedBase64(#[from] base64::DecodeError),

    #[error("Invalid image data: {0}")]
    InvalidImage(#[from] image::ImageError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Payload part of a data URL, or `None` when the marker is absent
pub fn split_data_url(frame: &str) -> Option<&str> {
    frame.split_once(BASE64_MARKER).map(|(_, payload)| payload)
}

/// Decode one frame.
///
/// Returns `Ok(None)` for frames without the `base64,` marker; those are
/// skipped by the caller and never vote. Bad base64 or undecodable image
/// bytes are hard errors that abort the whole batch.
pub fn decode_frame(frame: &str) -> DecodeResult<Option<RgbImage>> {
    let Some(payload) = split_data_url(frame) else {
        return Ok(None);
    };

    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64.decode(cleaned.as_bytes())?;

    // Grayscale, RGBA and palette images are all normalized to 8-bit RGB
    let image = image::load_from_memory(&bytes)?.to_rgb8();

    Ok(Some(image))
}
