use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::QrCode;
use thiserror::Error;

const MIN_SIZE_PX: u32 = 240;

#[derive(Debug, Error)]
pub enum QrEncodeError {
    #[error("cannot encode data as a QR code: {0}")]
    Encode(QrError),

    #[error("cannot write PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders `data` as a PNG QR code.
pub fn encode_png(data: &str) -> Result<Vec<u8>, QrEncodeError> {
    let code = QrCode::new(data.as_bytes()).map_err(QrEncodeError::Encode)?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE_PX, MIN_SIZE_PX)
        .build();

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_png() {
        let png = encode_png("42").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rejects_oversized_data() {
        let data = "x".repeat(8000);
        assert!(matches!(encode_png(&data), Err(QrEncodeError::Encode(_))));
    }
}
