//! Frame type and pixel format conversion.

use image::{Rgb, RgbImage};

/// A captured color camera frame.
#[derive(Clone)]
pub struct RgbFrame {
    pub image: RgbImage,
    pub sequence: u32,
    pub timestamp: std::time::Instant,
}

impl RgbFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Average luma brightness (0.0–255.0), BT.601 weights.
    pub fn avg_brightness(&self) -> f32 {
        let pixels = self.image.pixels().len();
        if pixels == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .image
            .pixels()
            .map(|p| 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32)
            .sum();
        sum / pixels as f32
    }
}

/// Pull boundary for the capture side of a session.
///
/// `None` signals end of stream: the device is exhausted or a read failed.
/// Either way the session terminates cleanly; callers never see a read
/// error as such.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbFrame>;
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("buffer too short for {width}x{height} {format}: expected {expected}, got {actual}")]
    BufferTooShort {
        width: u32,
        height: u32,
        format: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share the
/// U/V pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::BufferTooShort {
            width,
            height,
            format: "YUYV",
            expected,
            actual: yuyv.len(),
        });
    }

    let mut image = RgbImage::new(width, height);
    let mut pixels = image.pixels_mut();
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        if let Some(p) = pixels.next() {
            *p = Rgb(ycbcr_to_rgb(y0, u, v));
        }
        if let Some(p) = pixels.next() {
            *p = Rgb(ycbcr_to_rgb(y1, u, v));
        }
    }
    Ok(image)
}

/// Convert 8-bit grayscale to RGB by channel replication.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::BufferTooShort {
            width,
            height,
            format: "GREY",
            expected,
            actual: grey.len(),
        });
    }

    let mut image = RgbImage::new(width, height);
    for (p, &g) in image.pixels_mut().zip(grey[..expected].iter()) {
        *p = Rgb([g, g, g]);
    }
    Ok(image)
}

/// BT.601 limited-range YCbCr → RGB.
fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
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
