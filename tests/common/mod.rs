// tests/common/mod.rs
//
// Synthetic footage: a white ball on a black background.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use lbw_vision::Frame;

pub const BALL_RADIUS: i32 = 8;

/// One frame with the ball centered at (x, y) pixels.
pub fn ball_frame(index: u64, width: u32, height: u32, x: i32, y: i32, fps: f64) -> Frame {
    let mut img = RgbImage::new(width, height);
    draw_filled_circle_mut(&mut img, (x, y), BALL_RADIUS, Rgb([255, 255, 255]));
    // White is the same in RGB and BGR order
    Frame::new(index, width, height, img.into_raw(), fps)
}

pub fn blank_frame(index: u64, width: u32, height: u32, fps: f64) -> Frame {
    Frame::new(index, width, height, vec![0u8; (width * height * 3) as usize], fps)
}

/// `count` frames moving linearly from `from` to `to`.
pub fn linear_delivery(
    count: u64,
    width: u32,
    height: u32,
    from: (i32, i32),
    to: (i32, i32),
    fps: f64,
) -> Vec<Frame> {
    let steps = (count - 1).max(1) as i32;
    (0..count)
        .map(|i| {
            let i32_i = i as i32;
            let x = from.0 + (to.0 - from.0) * i32_i / steps;
            let y = from.1 + (to.1 - from.1) * i32_i / steps;
            ball_frame(i, width, height, x, y, fps)
        })
        .collect()
}
