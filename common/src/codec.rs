use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use std::io::Cursor;
use tracing::debug;

/// Prefix of every processed image returned to clients.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("image data is empty")]
    Empty,
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode JPEG: {0}")]
    Encode(String),
}

/// Decode an image from raw file bytes, sniffing the format from its magic bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Dimensions after scaling `(width, height)` so the longer side is at most
/// `max_dimension`. Sizes already within bounds are returned unchanged.
pub fn fitted_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let scale = max_dimension as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

/// Downscale with bilinear filtering when either side exceeds `max_dimension`.
pub fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let (new_width, new_height) = fitted_dimensions(width, height, max_dimension);
    if (new_width, new_height) == (width, height) {
        return image;
    }
    debug!(width, height, new_width, new_height, "downscaling oversized image");
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Luma with BT.601 weights (0.299, 0.587, 0.114) in 14-bit fixed point,
/// rounded to nearest. Alpha is dropped.
pub fn to_gray_bt601(image: &DynamicImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let v = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([v as u8])
    })
}

pub fn encode_jpeg(image: &GrayImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Wrap JPEG bytes in a `data:` URL with standard base64.
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("{JPEG_DATA_URL_PREFIX}{}", STANDARD.encode(jpeg))
}
