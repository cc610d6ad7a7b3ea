//! Frame annotation: bounding rectangles and identity labels.
//!
//! Detection runs on the downscaled frame, so boxes are mapped back to
//! full-resolution coordinates here with the inverse downscale factor.
//! Labels use a built-in 5x7 block font rendered directly into the frame,
//! OSD-style; no font file is shipped or loaded.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rollcall_core::BoundingBox;

/// Overlay color for boxes and labels.
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Rectangle stroke width in pixels.
const STROKE: u32 = 2;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Integer upscale applied to each glyph pixel.
const GLYPH_SCALE: u32 = 2;
/// Column gap between glyphs, in font pixels.
const GLYPH_GAP: u32 = 1;
/// Vertical gap between the label baseline and the box top edge.
const LABEL_MARGIN: u32 = GLYPH_HEIGHT * GLYPH_SCALE + 4;

/// One detection carried between frames: where it is (detection-space
/// coordinates) and what to call it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDetection {
    pub location: BoundingBox,
    pub label: String,
}

/// Draw every detection onto the full-resolution frame.
///
/// Boxes are scaled up by `upscale` and clamped to the frame; degenerate
/// boxes are skipped. An empty detection list leaves the frame untouched.
pub fn annotate_frame(image: &mut RgbImage, detections: &[LabeledDetection], upscale: u32) {
    for detection in detections {
        let b = detection
            .location
            .scaled(upscale)
            .clamped(image.width(), image.height());
        if b.width() == 0 || b.height() == 0 {
            continue;
        }

        draw_box(image, &b);

        let label_y = b.top.saturating_sub(LABEL_MARGIN);
        draw_label(image, &detection.label, b.left, label_y);
    }
}

fn draw_box(image: &mut RgbImage, b: &BoundingBox) {
    for inset in 0..STROKE {
        let width = b.width().saturating_sub(inset * 2);
        let height = b.height().saturating_sub(inset * 2);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((b.left + inset) as i32, (b.top + inset) as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(image, rect, OVERLAY_COLOR);
    }
}

/// Render `text` at (x, y) in the block font. Lowercase maps to uppercase;
/// characters without a glyph render as '?'.
fn draw_label(image: &mut RgbImage, text: &str, x: u32, y: u32) {
    let advance = (GLYPH_WIDTH + GLYPH_GAP) * GLYPH_SCALE;
    for (i, c) in text.chars().enumerate() {
        let gx = x + i as u32 * advance;
        if gx + GLYPH_WIDTH * GLYPH_SCALE >= image.width() {
            break;
        }
        draw_glyph(image, c, gx, y);
    }
}

fn draw_glyph(image: &mut RgbImage, c: char, x: u32, y: u32) {
    let columns = glyph(c.to_ascii_uppercase()).unwrap_or(GLYPH_FALLBACK);
    for (col, bits) in columns.iter().enumerate() {
        for row in 0..GLYPH_HEIGHT {
            if bits & (1 << row) == 0 {
                continue;
            }
            for dx in 0..GLYPH_SCALE {
                for dy in 0..GLYPH_SCALE {
                    let px = x + col as u32 * GLYPH_SCALE + dx;
                    let py = y + row * GLYPH_SCALE + dy;
                    if px < image.width() && py < image.height() {
                        image.put_pixel(px, py, OVERLAY_COLOR);
                    }
                }
            }
        }
    }
}

/// Hollow box drawn for characters outside the font.
const GLYPH_FALLBACK: [u8; 5] = [0x7F, 0x41, 0x41, 0x41, 0x7F];

/// Classic 5x7 font, column-major, bit 0 = top row.
fn glyph(c: char) -> Option<[u8; 5]> {
    let g = match c {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00],
        '-' => [0x08, 0x08, 0x08, 0x08, 0x08],
        '.' => [0x00, 0x60, 0x60, 0x00, 0x00],
        '_' => [0x40, 0x40, 0x40, 0x40, 0x40],
        '?' => [0x02, 0x01, 0x51, 0x09, 0x06],
        '0' => [0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => [0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => [0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => [0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => [0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => [0x06, 0x49, 0x49, 0x29, 0x1E],
        'A' => [0x7E, 0x11, 0x11, 0x11, 0x7E],
        'B' => [0x7F, 0x49, 0x49, 0x49, 0x36],
        'C' => [0x3E, 0x41, 0x41, 0x41, 0x22],
        'D' => [0x7F, 0x41, 0x41, 0x22, 0x1C],
        'E' => [0x7F, 0x49, 0x49, 0x49, 0x41],
        'F' => [0x7F, 0x09, 0x09, 0x09, 0x01],
        'G' => [0x3E, 0x41, 0x49, 0x49, 0x7A],
        'H' => [0x7F, 0x08, 0x08, 0x08, 0x7F],
        'I' => [0x00, 0x41, 0x7F, 0x41, 0x00],
        'J' => [0x20, 0x40, 0x41, 0x3F, 0x01],
        'K' => [0x7F, 0x08, 0x14, 0x22, 0x41],
        'L' => [0x7F, 0x40, 0x40, 0x40, 0x40],
        'M' => [0x7F, 0x02, 0x0C, 0x02, 0x7F],
        'N' => [0x7F, 0x04, 0x08, 0x10, 0x7F],
        'O' => [0x3E, 0x41, 0x41, 0x41, 0x3E],
        'P' => [0x7F, 0x09, 0x09, 0x09, 0x06],
        'Q' => [0x3E, 0x41, 0x51, 0x21, 0x5E],
        'R' => [0x7F, 0x09, 0x19, 0x29, 0x46],
        'S' => [0x46, 0x49, 0x49, 0x49, 0x31],
        'T' => [0x01, 0x01, 0x7F, 0x01, 0x01],
        'U' => [0x3F, 0x40, 0x40, 0x40, 0x3F],
        'V' => [0x1F, 0x20, 0x40, 0x20, 0x1F],
        'W' => [0x3F, 0x40, 0x38, 0x40, 0x3F],
        'X' => [0x63, 0x14, 0x08, 0x14, 0x63],
        'Y' => [0x07, 0x08, 0x70, 0x08, 0x07],
        'Z' => [0x61, 0x51, 0x49, 0x45, 0x43],
        _ => return None,
    };
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height)
    }

    fn overlay_pixel_count(image: &RgbImage) -> usize {
        image.pixels().filter(|p| p.0 == [0, 255, 0]).count()
    }

    #[test]
    fn no_detections_leaves_frame_unmodified() {
        let mut image = blank(64, 48);
        let before = image.clone();
        annotate_frame(&mut image, &[], 4);
        assert_eq!(image.as_raw(), before.as_raw());
    }

    #[test]
    fn box_is_scaled_to_full_resolution() {
        let mut image = blank(256, 192);
        let detections = vec![LabeledDetection {
            location: BoundingBox { top: 10, right: 30, bottom: 30, left: 10 },
            label: String::new(),
        }];
        annotate_frame(&mut image, &detections, 4);

        // Upscaled corners: (40..120) x (40..120).
        assert_eq!(image.get_pixel(40, 40).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(119, 40).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(40, 119).0, [0, 255, 0]);
        // Interior stays untouched.
        assert_eq!(image.get_pixel(80, 80).0, [0, 0, 0]);
    }

    #[test]
    fn out_of_frame_box_is_clamped_not_panicking() {
        let mut image = blank(64, 48);
        let detections = vec![LabeledDetection {
            location: BoundingBox { top: 5, right: 500, bottom: 400, left: 2 },
            label: "X".to_string(),
        }];
        annotate_frame(&mut image, &detections, 4);
        assert!(overlay_pixel_count(&image) > 0);
    }

    #[test]
    fn label_renders_above_the_box() {
        let mut image = blank(256, 192);
        let detections = vec![LabeledDetection {
            location: BoundingBox { top: 20, right: 40, bottom: 40, left: 10 },
            label: "Alice".to_string(),
        }];
        annotate_frame(&mut image, &detections, 4);

        // Box top edge at y=80; the label band sits in the rows above it.
        let band: usize = (0..image.width())
            .flat_map(|x| (80 - LABEL_MARGIN..80).map(move |y| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y).0 == [0, 255, 0])
            .count();
        assert!(band > 0, "expected label pixels above the box");
    }

    #[test]
    fn degenerate_box_is_skipped() {
        let mut image = blank(64, 48);
        let detections = vec![LabeledDetection {
            location: BoundingBox { top: 10, right: 5, bottom: 10, left: 5 },
            label: "Z".to_string(),
        }];
        annotate_frame(&mut image, &detections, 1);
        assert_eq!(overlay_pixel_count(&image), 0);
    }

    #[test]
    fn unknown_characters_fall_back_to_a_glyph() {
        let mut with_fallback = blank(64, 48);
        draw_label(&mut with_fallback, "~", 2, 2);
        assert!(overlay_pixel_count(&with_fallback) > 0);
    }

    #[test]
    fn every_letter_and_digit_has_a_glyph() {
        for c in ('A'..='Z').chain('0'..='9') {
            assert!(glyph(c).is_some(), "missing glyph for {c}");
        }
    }
}
