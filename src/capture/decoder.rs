use jpeg_decoder::{Decoder, PixelFormat as JpegPixelFormat};

use super::frame::PixelFormat;
use crate::error::CaptureError;

/// Decode one device buffer into tightly packed RGB24.
pub fn decode_frame(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, CaptureError> {
    let pixels = width as usize * height as usize;

    match format {
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let decoded = decoder
                .decode()
                .map_err(|e| CaptureError::Decode(e.to_string()))?;
            let info = decoder
                .info()
                .ok_or_else(|| CaptureError::Decode("missing JPEG header".into()))?;

            match info.pixel_format {
                JpegPixelFormat::RGB24 => Ok(decoded),
                JpegPixelFormat::L8 => Ok(decoded.iter().flat_map(|&l| [l, l, l]).collect()),
                other => Err(CaptureError::Decode(format!(
                    "unsupported JPEG pixel format {other:?}"
                ))),
            }
        }
        PixelFormat::Rgb24 => {
            // Already in RGB format
            let expected = pixels * 3;
            check_len(data, expected)?;
            Ok(data[..expected].to_vec())
        }
        PixelFormat::Bgr24 => {
            let expected = pixels * 3;
            check_len(data, expected)?;
            Ok(data[..expected]
                .chunks_exact(3)
                .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
                .collect())
        }
        PixelFormat::Yuyv4 => {
            // Two pixels per 4-byte macropixel: Y0 U Y1 V
            let expected = pixels * 2;
            check_len(data, expected)?;
            let mut rgb = Vec::with_capacity(pixels * 3);
            for chunk in data[..expected].chunks_exact(4) {
                let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
                rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
                rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
            }
            Ok(rgb)
        }
    }
}

fn check_len(data: &[u8], expected: usize) -> Result<(), CaptureError> {
    if data.len() < expected {
        return Err(CaptureError::Decode(format!(
            "buffer holds {} bytes, expected {expected}",
            data.len()
        )));
    }
    Ok(())
}

// BT.601 limited range, integer approximation
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let clamp = |x: i32| x.clamp(0, 255) as u8;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
    ]
}
