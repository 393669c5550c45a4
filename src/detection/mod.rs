// src/detection/mod.rs
//
// Per-frame candidate extraction. Stateless: nothing here remembers earlier
// frames.

pub mod enhancer;
pub mod segmenter;
pub mod shape_filter;
pub mod strategy;

pub use enhancer::{EnhancerConfig, FrameEnhancer};
pub use segmenter::{ColorSegmenter, HsvRange, RoiRect, SegmentationConfig};
pub use shape_filter::{ShapeFilter, ShapeFilterConfig};
pub use strategy::{
    CandidateDetector, DetectionOutcome, DetectorChain, EnhancedColorDetector,
    ExternalCandidates, TraditionalColorDetector,
};
