use std::io::Cursor;

use ab_glyph::{FontArc, PxScale};
use base64::{prelude::BASE64_STANDARD, Engine};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::app::config::RenderConfig;
use crate::error::{PipelineError, Result, StartupError};
use crate::pipeline::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([255, 56, 56]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // rough average glyph width

/// PNG bytes of an annotated image.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub png: Vec<u8>,
}

impl RenderedImage {
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.png)
    }
}

/// Produces the annotated copy that goes out on the image topic.
pub trait ImageRenderer: Send + Sync {
    fn render(&self, image: &RgbImage, detections: &[Detection]) -> Result<RenderedImage>;
}

#[derive(Clone, Default)]
pub struct Renderer {
    font: Option<FontArc>,
}

impl Renderer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn from_config(config: &RenderConfig) -> std::result::Result<Self, StartupError> {
        let Some(path) = &config.font_filename else {
            tracing::info!("no font configured, labels will not be drawn");
            return Ok(Self::new(None));
        };
        let data = std::fs::read(path)?;
        let font = FontArc::try_from_vec(data).map_err(|e| StartupError::Font {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Some(font)))
    }

    fn draw_detection(&self, image: &mut RgbImage, det: &Detection) {
        let (w, h) = (image.width() as f32, image.height() as f32);
        if w < 1.0 || h < 1.0 {
            return;
        }
        let x_min = det.bbox.x1.floor().clamp(0.0, w - 1.0) as i32;
        let y_min = det.bbox.y1.floor().clamp(0.0, h - 1.0) as i32;
        let x_max = det.bbox.x2.ceil().clamp(0.0, w - 1.0) as i32;
        let y_max = det.bbox.y2.ceil().clamp(0.0, h - 1.0) as i32;
        if x_min >= x_max || y_min >= y_max {
            return;
        }

        let width = (x_max - x_min + 1) as u32;
        let height = (y_max - y_min + 1) as u32;
        draw_hollow_rect_mut(image, Rect::at(x_min, y_min).of_size(width, height), BOX_COLOR);
        if width > 2 && height > 2 {
            let inner = Rect::at(x_min + 1, y_min + 1).of_size(width - 2, height - 2);
            draw_hollow_rect_mut(image, inner, BOX_COLOR);
        }

        let Some(font) = &self.font else {
            return;
        };
        let label = format!("{} {:.2}", det.label, det.confidence);
        let text_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;
        let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
        let label_width = text_width.min(w as i32 - x_min).max(0) as u32;
        if label_width == 0 {
            return;
        }
        let tag = Rect::at(x_min, label_y).of_size(label_width, LABEL_TEXT_HEIGHT as u32);
        draw_filled_rect_mut(image, tag, BOX_COLOR);
        draw_text_mut(
            image,
            TEXT_COLOR,
            x_min,
            label_y + 2,
            PxScale::from(LABEL_FONT_SIZE),
            font,
            &label,
        );
    }
}

impl ImageRenderer for Renderer {
    /// Draws onto a copy; `image` is left untouched.
    fn render(&self, image: &RgbImage, detections: &[Detection]) -> Result<RenderedImage> {
        let mut canvas = image.clone();
        for det in detections {
            self.draw_detection(&mut canvas, det);
        }

        let mut png = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
        Ok(RenderedImage { png })
    }
}
