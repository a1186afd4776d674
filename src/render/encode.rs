use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::ExtendedColorType;

use crate::capture::Frame;

/// Encode an RGB24 frame as baseline JPEG.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Bytes, ImageError> {
    let expected = frame.width() as usize * frame.height() as usize * 3;
    if frame.data.len() != expected || expected == 0 {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )));
    }

    let mut buf = Vec::with_capacity(expected / 8);
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        &frame.data,
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(Bytes::from(buf))
}

/// Decode an uploaded JPEG/PNG into a frame.
pub fn decode_image(bytes: &[u8]) -> Result<Frame, ImageError> {
    let image = image::load_from_memory(bytes)?.to_rgb8();
    Ok(Frame::from_rgb_image(image, 0))
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_has_soi_marker_and_decodes_back() {
        let jpeg = encode_jpeg(&Frame::blank(32, 24), 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let frame = decode_image(&jpeg).unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let mut frame = Frame::blank(4, 4);
        frame.data = frame.data.slice(..10);
        assert!(encode_jpeg(&frame, 80).is_err());
    }

    #[test]
    fn garbage_upload_is_rejected() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn base64_uses_standard_alphabet() {
        assert_eq!(to_base64(&[0xFF, 0xD8, 0xFF]), "/9j/");
    }
}
