// src/detection/segmenter.rs
//
// HSV color segmentation of ball-colored pixels.
//
// Red leather sits on both ends of the hue circle, so two red ranges are
// unioned; the white (limited-overs) ball is a low-saturation, high-value
// range. The result is ANDed with a central ROI that drops crowd, boards and
// scoreboard, then cleaned with a 3×3 close (fill seams) and open (kill
// speckle).
//
// HSV uses the 8-bit convention: H ∈ [0, 180), S and V ∈ [0, 255].

use crate::error::Result;
use crate::types::Frame;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: (u8, u8, u8)) -> bool {
        let (h, s, v) = hsv;
        h >= self.lower[0]
            && h <= self.upper[0]
            && s >= self.lower[1]
            && s <= self.upper[1]
            && v >= self.lower[2]
            && v <= self.upper[2]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Red, low end of the hue circle
    pub red_low: HsvRange,
    /// Red, wrapped high end of the hue circle
    pub red_high: HsvRange,
    pub white: HsvRange,
    /// Central fraction of width and height kept by the ROI, (0, 1]
    pub roi_percentage: f64,
    /// Structuring element radius for close/open (1 → 3×3)
    pub morph_radius: u8,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            red_low: HsvRange::new([0, 120, 70], [10, 255, 255]),
            red_high: HsvRange::new([170, 120, 70], [180, 255, 255]),
            white: HsvRange::new([0, 0, 200], [180, 30, 255]),
            roi_percentage: 0.7,
            morph_radius: 1,
        }
    }
}

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// BGR → HSV with H in [0, 180), S and V in [0, 255].
#[inline]
pub fn bgr_to_hsv(b: u8, g: u8, r: u8) -> (u8, u8, u8) {
    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let h_deg = if delta <= 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        60.0 * (bf - rf) / delta + 120.0
    } else {
        60.0 * (rf - gf) / delta + 240.0
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    let h = (h_deg / 2.0).round() as u32 % 180;
    (h as u8, s.round().min(255.0) as u8, v as u8)
}

// ============================================================================
// SEGMENTER
// ============================================================================

/// Axis-aligned ROI in pixel coordinates, half-open: [x0, x1) × [y0, y1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl RoiRect {
    /// Centered rectangle covering `fraction` of each dimension.
    pub fn central(width: u32, height: u32, fraction: f64) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        let margin_x = ((width as f64 * (1.0 - fraction)) / 2.0).round() as u32;
        let margin_y = ((height as f64 * (1.0 - fraction)) / 2.0).round() as u32;
        Self {
            x0: margin_x,
            y0: margin_y,
            x1: width.saturating_sub(margin_x),
            y1: height.saturating_sub(margin_y),
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn to_mask(&self, width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if self.contains(x, y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ColorSegmenter {
    config: SegmentationConfig,
}

impl ColorSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn roi_mask(&self, width: u32, height: u32) -> GrayImage {
        RoiRect::central(width, height, self.config.roi_percentage).to_mask(width, height)
    }

    /// Binary mask (0 / 255) of candidate ball pixels inside the default ROI.
    pub fn segment(&self, frame: &Frame) -> Result<GrayImage> {
        let roi = self.roi_mask(frame.width, frame.height);
        self.segment_masked(frame, &roi)
    }

    /// Same as [`segment`](Self::segment) with a caller-supplied ROI mask;
    /// any non-zero ROI pixel is considered inside.
    pub fn segment_masked(&self, frame: &Frame, roi: &GrayImage) -> Result<GrayImage> {
        frame.validate()?;
        let cfg = &self.config;
        let mut hits = 0usize;

        let raw = GrayImage::from_fn(frame.width, frame.height, |x, y| {
            let inside = roi
                .get_pixel_checked(x, y)
                .map(|p| p[0] > 0)
                .unwrap_or(false);
            if !inside {
                return Luma([0]);
            }
            let [b, g, r] = frame.pixel(x, y);
            let hsv = bgr_to_hsv(b, g, r);
            if cfg.red_low.contains(hsv) || cfg.red_high.contains(hsv) || cfg.white.contains(hsv) {
                hits += 1;
                Luma([255])
            } else {
                Luma([0])
            }
        });

        debug!(
            "Segmentation frame {}: {} raw ball-colored px",
            frame.index, hits
        );

        if cfg.morph_radius == 0 {
            return Ok(raw);
        }
        let closed = close(&raw, Norm::LInf, cfg.morph_radius);
        Ok(open(&closed, Norm::LInf, cfg.morph_radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LbwError;

    fn frame_with_square(
        width: u32,
        height: u32,
        bg: [u8; 3],
        fg: [u8; 3],
        at: (u32, u32),
        size: u32,
    ) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = x >= at.0 && x < at.0 + size && y >= at.1 && y < at.1 + size;
                data.extend_from_slice(if inside { &fg } else { &bg });
            }
        }
        Frame::new(0, width, height, data, 30.0)
    }

    #[test]
    fn test_hsv_primaries() {
        // BGR order
        assert_eq!(bgr_to_hsv(0, 0, 255), (0, 255, 255));
        assert_eq!(bgr_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(bgr_to_hsv(255, 0, 0), (120, 255, 255));
        assert_eq!(bgr_to_hsv(255, 255, 255), (0, 0, 255));
        assert_eq!(bgr_to_hsv(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn test_wrapped_red_hue_lands_high() {
        // Crimson: red with a touch of blue → hue just below 180
        let (h, s, _) = bgr_to_hsv(40, 0, 220);
        assert!(h >= 170, "hue {}", h);
        assert!(s > 200);
    }

    #[test]
    fn test_red_ball_segmented_inside_roi() {
        let frame = frame_with_square(100, 100, [30, 90, 30], [20, 20, 200], (45, 45), 10);
        let mask = ColorSegmenter::new(SegmentationConfig::default()).segment(&frame).unwrap();
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(10, 10)[0], 0);
    }

    #[test]
    fn test_ball_outside_roi_is_dropped() {
        // 70% ROI on 100 px keeps [15, 85)
        let frame = frame_with_square(100, 100, [0, 0, 0], [255, 255, 255], (2, 2), 10);
        let mask = ColorSegmenter::new(SegmentationConfig::default()).segment(&frame).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_open_removes_single_pixel_speckle() {
        let frame = frame_with_square(60, 60, [0, 0, 0], [255, 255, 255], (30, 30), 1);
        let mask = ColorSegmenter::new(SegmentationConfig::default()).segment(&frame).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = Frame::new(0, 20, 20, vec![255u8; 20 * 3], 30.0);
        let segmenter = ColorSegmenter::new(SegmentationConfig::default());
        assert!(matches!(
            segmenter.segment(&frame),
            Err(LbwError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_central_roi_rect() {
        let roi = RoiRect::central(640, 480, 0.7);
        assert_eq!(roi, RoiRect { x0: 96, y0: 72, x1: 544, y1: 408 });
        assert!(roi.contains(320, 240));
        assert!(!roi.contains(50, 240));
    }
}
