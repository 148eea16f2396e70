use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::comparator;
use crate::models::DetectedRectangle;

const CARD_LIKE: Rgba<u8> = Rgba([0, 200, 0, 255]);
const OTHER: Rgba<u8> = Rgba([255, 160, 0, 255]);
const SELECTED: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Draw the candidate rectangles over the raster.
///
/// Card-like rectangles are green, the rest orange; the selection is drawn
/// last in magenta with a thicker outline.
pub fn render_overlay(
    raster: &DynamicImage,
    rectangles: &[DetectedRectangle],
    selection: Option<&DetectedRectangle>,
) -> RgbaImage {
    let mut canvas = raster.to_rgba8();

    for rect in rectangles {
        let color = if comparator::compare(rect).good_match {
            CARD_LIKE
        } else {
            OTHER
        };
        outline(&mut canvas, rect, color, 1);
    }

    if let Some(rect) = selection {
        outline(&mut canvas, rect, SELECTED, 3);
    }

    canvas
}

fn outline(canvas: &mut RgbaImage, rect: &DetectedRectangle, color: Rgba<u8>, thickness: u32) {
    for inset in 0..thickness {
        let width = rect.width.saturating_sub(2 * inset);
        let height = rect.height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let x = i64::from(rect.x) + i64::from(inset);
        let y = i64::from(rect.y) + i64::from(inset);
        match clip(canvas.dimensions(), x, y, width, height) {
            Some(r) => draw_hollow_rect_mut(canvas, r, color),
            None => break,
        }
    }
}

/// Clip to one pixel beyond the canvas on every side, so clipped edges stay
/// invisible and the coordinates always fit in `i32`. `None` when nothing of
/// the rectangle lands on the canvas.
fn clip(
    (canvas_w, canvas_h): (u32, u32),
    x: i64,
    y: i64,
    width: u32,
    height: u32,
) -> Option<Rect> {
    let (canvas_w, canvas_h) = (i64::from(canvas_w), i64::from(canvas_h));
    let left = x.max(-1);
    let top = y.max(-1);
    let right = (x + i64::from(width)).min(canvas_w + 1);
    let bottom = (y + i64::from(height)).min(canvas_h + 1);
    if right <= 0 || bottom <= 0 || left >= canvas_w || top >= canvas_h {
        return None;
    }
    let at_x = i32::try_from(left).ok()?;
    let at_y = i32::try_from(top).ok()?;
    let w = u32::try_from(right - left).ok()?;
    let h = u32::try_from(bottom - top).ok()?;
    Some(Rect::at(at_x, at_y).of_size(w, h))
}
