// src/frame_source.rs
//
// Frames from a directory of still images, in file-name order.
//
// Extracted video frames (frame_0001.png, frame_0002.png, ...) are the
// interchange format: decoding video itself stays outside this crate.

use crate::error::Result;
use crate::types::Frame;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ImageDirectorySource {
    paths: Vec<PathBuf>,
    fps: f64,
    next: usize,
}

impl ImageDirectorySource {
    /// Collect image files directly under `dir`.
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();

        for entry in WalkDir::new(dir)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_file() && is_image(path) {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        info!("Found {} frame image(s) in {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            fps,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Iterator for ImageDirectorySource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.get(self.next)?;
        let index = self.next as u64;
        self.next += 1;
        Some(load_frame(path, index, self.fps))
    }
}

/// Sub-directories of `root` that contain at least one image, one per stream.
pub fn stream_directories(root: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root.as_ref())
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .filter(|dir| {
            WalkDir::new(dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().is_file() && is_image(e.path()))
        })
        .collect();
    dirs.sort();
    dirs
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode an image file into a packed BGR frame.
pub fn load_frame(path: &Path, index: u64, fps: f64) -> Result<Frame> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(Frame::new(index, width, height, data, fps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lbw-vision-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_frames_in_name_order_as_bgr() {
        let dir = scratch_dir("source");
        RgbImage::from_pixel(4, 3, Rgb([255, 0, 0]))
            .save(dir.join("frame_002.png"))
            .unwrap();
        RgbImage::from_pixel(4, 3, Rgb([0, 0, 255]))
            .save(dir.join("frame_001.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let source = ImageDirectorySource::open(&dir, 25.0).unwrap();
        assert_eq!(source.len(), 2);
        let frames: Vec<Frame> = source.map(|f| f.unwrap()).collect();

        assert_eq!(frames[0].index, 0);
        assert_eq!((frames[0].width, frames[0].height), (4, 3));
        // frame_001 is blue: BGR puts it first
        assert_eq!(frames[0].pixel(0, 0), [255, 0, 0]);
        assert_eq!(frames[1].pixel(0, 0), [0, 0, 255]);
        assert!((frames[1].timestamp - 0.04).abs() < 1e-12);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_stream_directories_skip_empty() {
        let root = scratch_dir("streams");
        std::fs::create_dir_all(root.join("cam_b")).unwrap();
        std::fs::create_dir_all(root.join("cam_a")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        for cam in ["cam_a", "cam_b"] {
            RgbImage::new(2, 2).save(root.join(cam).join("0001.png")).unwrap();
        }

        let dirs = stream_directories(&root);
        let names: Vec<_> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cam_a", "cam_b"]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
