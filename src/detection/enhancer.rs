// src/detection/enhancer.rs
//
// Per-frame contrast normalization ahead of color segmentation.
//
//   BGR → YCrCb → CLAHE on Y only → BGR → median smoothing
//
// Equalizing luminance alone keeps the ball's hue intact while lifting it out
// of shadowed or washed-out regions. The median pass removes sensor speckle
// but keeps the ball's silhouette sharp, which the circularity test relies on.

use crate::error::Result;
use crate::types::Frame;
use image::{ImageBuffer, Rgb};
use imageproc::filter::median_filter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub enabled: bool,
    /// CLAHE clip limit, in multiples of the uniform bin height
    pub clip_limit: f64,
    /// Tiles per axis
    pub tile_grid: u32,
    /// Median window radius (1 → 3×3)
    pub smoothing_radius: u32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clip_limit: 2.0,
            tile_grid: 8,
            smoothing_radius: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameEnhancer {
    config: EnhancerConfig,
}

impl FrameEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    /// Returns a new frame of identical dimensions. The input is never mutated.
    /// A frame whose buffer does not match its dimensions is rejected.
    pub fn enhance(&self, frame: &Frame) -> Result<Frame> {
        frame.validate()?;
        let w = frame.width as usize;
        let h = frame.height as usize;
        let n = w * h;

        let mut luma = vec![0u8; n];
        let mut cr = vec![0f32; n];
        let mut cb = vec![0f32; n];

        for i in 0..n {
            let b = frame.data[i * 3] as f32;
            let g = frame.data[i * 3 + 1] as f32;
            let r = frame.data[i * 3 + 2] as f32;
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            luma[i] = y.round().clamp(0.0, 255.0) as u8;
            cr[i] = (r - y) * 0.713 + 128.0;
            cb[i] = (b - y) * 0.564 + 128.0;
        }

        let luma = clahe(
            &luma,
            w,
            h,
            self.config.clip_limit,
            self.config.tile_grid.max(1) as usize,
        );

        let mut data = vec![0u8; n * 3];
        for i in 0..n {
            let y = luma[i] as f32;
            let dcr = cr[i] - 128.0;
            let dcb = cb[i] - 128.0;
            data[i * 3] = to_u8(y + 1.773 * dcb);
            data[i * 3 + 1] = to_u8(y - 0.714 * dcr - 0.344 * dcb);
            data[i * 3 + 2] = to_u8(y + 1.403 * dcr);
        }

        let data = if self.config.smoothing_radius > 0 {
            // Channel order is irrelevant to a per-channel median
            match ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(frame.width, frame.height, data) {
                Some(img) => {
                    let r = self.config.smoothing_radius;
                    median_filter(&img, r, r).into_raw()
                }
                None => frame.data.clone(),
            }
        } else {
            data
        };

        Ok(Frame {
            index: frame.index,
            width: frame.width,
            height: frame.height,
            data,
            timestamp: frame.timestamp,
            fps: frame.fps,
        })
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// CLAHE
// ============================================================================

/// Contrast-limited adaptive histogram equalization of a single channel.
///
/// Each tile gets its own clipped-and-redistributed histogram LUT; pixels
/// blend the LUTs of the four nearest tile centers bilinearly so tile seams
/// do not show.
pub fn clahe(src: &[u8], width: usize, height: usize, clip_limit: f64, grid: usize) -> Vec<u8> {
    let gx = grid.min(width).max(1);
    let gy = grid.min(height).max(1);

    let x_bounds: Vec<usize> = (0..=gx).map(|i| i * width / gx).collect();
    let y_bounds: Vec<usize> = (0..=gy).map(|i| i * height / gy).collect();

    let mut luts = vec![[0u8; 256]; gx * gy];
    for ty in 0..gy {
        for tx in 0..gx {
            let mut hist = [0u32; 256];
            for y in y_bounds[ty]..y_bounds[ty + 1] {
                for x in x_bounds[tx]..x_bounds[tx + 1] {
                    hist[src[y * width + x] as usize] += 1;
                }
            }
            let area =
                ((x_bounds[tx + 1] - x_bounds[tx]) * (y_bounds[ty + 1] - y_bounds[ty])) as u32;
            luts[ty * gx + tx] = tile_lut(&mut hist, area, clip_limit);
        }
    }

    let tile_w = width as f32 / gx as f32;
    let tile_h = height as f32 / gy as f32;

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let fy = (y as f32 + 0.5) / tile_h - 0.5;
        let ty0 = (fy.floor().max(0.0) as usize).min(gy - 1);
        let ty1 = (ty0 + 1).min(gy - 1);
        let ay = (fy - ty0 as f32).clamp(0.0, 1.0);

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w - 0.5;
            let tx0 = (fx.floor().max(0.0) as usize).min(gx - 1);
            let tx1 = (tx0 + 1).min(gx - 1);
            let ax = (fx - tx0 as f32).clamp(0.0, 1.0);

            let v = src[y * width + x] as usize;
            let top =
                (1.0 - ax) * luts[ty0 * gx + tx0][v] as f32 + ax * luts[ty0 * gx + tx1][v] as f32;
            let bottom =
                (1.0 - ax) * luts[ty1 * gx + tx0][v] as f32 + ax * luts[ty1 * gx + tx1][v] as f32;
            out[y * width + x] = to_u8((1.0 - ay) * top + ay * bottom);
        }
    }
    out
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = v as u8;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f64 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let batch = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area as f64;
    let mut cdf = 0u32;
    for (v, slot) in lut.iter_mut().enumerate() {
        cdf += hist[v];
        *slot = (cdf as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
