//! Detection and text overlays

use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{error, warn};

use crate::capture::Frame;
use crate::vision::{Detection, TextRegion};
use crate::AnnotateConfig;

pub const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const BOX_THICKNESS: i32 = 2;
const OVERLAY_ORIGIN: (i32, i32) = (10, 30);

/// DejaVu Sans Mono, bundled so labels render without any configuration
const BUILTIN_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Draws provider results onto a copy of a frame.
pub struct FrameAnnotator {
    /// `None` only if no font could be parsed; labels degrade to tabs
    font: Option<FontArc>,
    label_scale: f32,
    overlay_scale: f32,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::from_config(&AnnotateConfig::default())
    }
}

impl FrameAnnotator {
    pub fn new(font: Option<FontArc>, label_scale: f32, overlay_scale: f32) -> Self {
        Self {
            font,
            label_scale,
            overlay_scale,
        }
    }

    /// Uses `font_path` when it loads, the bundled font otherwise.
    pub fn from_config(config: &AnnotateConfig) -> Self {
        let custom = config.font_path.as_deref().and_then(|path| {
            let bytes = std::fs::read(path)
                .map_err(|e| warn!("Cannot read overlay font {}: {}", path.display(), e))
                .ok()?;
            FontArc::try_from_vec(bytes)
                .map_err(|e| warn!("Invalid overlay font {}: {}", path.display(), e))
                .ok()
        });

        let font = custom.or_else(|| {
            FontArc::try_from_slice(BUILTIN_FONT)
                .map_err(|e| error!("Bundled overlay font is unreadable: {}", e))
                .ok()
        });

        Self::new(font, config.label_scale, config.overlay_scale)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Return an annotated copy of `frame`; the input is left untouched.
    /// Boxes partially outside the frame are clipped.
    pub fn annotate(
        &self,
        frame: &Frame,
        detections: &[Detection],
        texts: &[TextRegion],
        frame_no: u64,
    ) -> Frame {
        let Some(mut canvas) = frame.to_rgb_image() else {
            warn!(
                "Frame {} has {} bytes for {}x{}, skipping overlay",
                frame.meta.sequence,
                frame.data.len(),
                frame.width(),
                frame.height()
            );
            return frame.clone();
        };

        for det in detections {
            let b = det.bbox;
            draw_box(&mut canvas, b.x, b.y, b.width, b.height, DETECTION_COLOR);
            let label = format!("{}: {:.2}", det.label, det.confidence);
            self.draw_label(&mut canvas, &label, b.x, b.y, DETECTION_COLOR);
        }

        for region in texts {
            let [x, y, w, h] = region.bbox;
            draw_box(&mut canvas, x, y, w, h, TEXT_COLOR);
            self.draw_label(&mut canvas, &region.text, x, y, TEXT_COLOR);
        }

        if let Some(font) = &self.font {
            let info = format!(
                "Frame: {} | Objects: {} | Texts: {}",
                frame_no,
                detections.len(),
                texts.len()
            );
            let (x, baseline) = OVERLAY_ORIGIN;
            draw_text_mut(
                &mut canvas,
                OVERLAY_COLOR,
                x,
                baseline - self.overlay_scale as i32,
                self.overlay_scale,
                font,
                &info,
            );
        }

        frame.with_pixels(canvas)
    }

    // Label sits just above the box's top edge
    fn draw_label(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) {
        match &self.font {
            Some(font) => {
                let top = y - self.label_scale as i32 - 2;
                draw_text_mut(canvas, color, x, top, self.label_scale, font, text);
            }
            None => {
                let width = (text.chars().count() as u32 * 6).max(6);
                draw_filled_rect_mut(canvas, Rect::at(x, y - 8).of_size(width, 6), color);
            }
        }
    }
}

fn draw_box(canvas: &mut RgbImage, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let (w, h) = (w - 2 * inset, h - 2 * inset);
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x + inset, y + inset).of_size(w as u32, h as u32),
            color,
        );
    }
}
