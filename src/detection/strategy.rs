// src/detection/strategy.rs
//
// One abstraction over the ways a frame can be turned into candidates.
//
// Fallback order is fixed by the chain: the enhanced color pipeline runs
// first; the plain color pipeline on the raw frame only runs when the
// enhanced one found nothing (heavy glare or a saturated frame can leave the
// equalized image with no ball-colored pixels).

use super::enhancer::FrameEnhancer;
use super::segmenter::ColorSegmenter;
use super::shape_filter::ShapeFilter;
use crate::config::Config;
use crate::error::Result;
use crate::types::{Candidate, Frame};
use std::collections::HashMap;
use tracing::debug;

pub trait CandidateDetector: Send {
    fn name(&self) -> &'static str;
    fn detect(&self, frame: &Frame) -> Result<Vec<Candidate>>;
}

/// Enhancer → segmenter → shape filter.
pub struct EnhancedColorDetector {
    enhancer: FrameEnhancer,
    segmenter: ColorSegmenter,
    shape_filter: ShapeFilter,
}

impl EnhancedColorDetector {
    pub fn new(
        enhancer: FrameEnhancer,
        segmenter: ColorSegmenter,
        shape_filter: ShapeFilter,
    ) -> Self {
        Self {
            enhancer,
            segmenter,
            shape_filter,
        }
    }
}

impl CandidateDetector for EnhancedColorDetector {
    fn name(&self) -> &'static str {
        "enhanced"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Candidate>> {
        let enhanced = self.enhancer.enhance(frame)?;
        let mask = self.segmenter.segment(&enhanced)?;
        Ok(self.shape_filter.filter(&mask))
    }
}

/// Segmenter → shape filter on the raw frame.
pub struct TraditionalColorDetector {
    segmenter: ColorSegmenter,
    shape_filter: ShapeFilter,
}

impl TraditionalColorDetector {
    pub fn new(segmenter: ColorSegmenter, shape_filter: ShapeFilter) -> Self {
        Self {
            segmenter,
            shape_filter,
        }
    }
}

impl CandidateDetector for TraditionalColorDetector {
    fn name(&self) -> &'static str {
        "traditional"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Candidate>> {
        let mask = self.segmenter.segment(frame)?;
        Ok(self.shape_filter.filter(&mask))
    }
}

/// Candidates produced upstream (e.g. a learned detector), keyed by frame
/// index. Frames with no entry yield nothing.
#[derive(Debug, Clone, Default)]
pub struct ExternalCandidates {
    by_frame: HashMap<u64, Vec<Candidate>>,
}

impl ExternalCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame_index: u64, candidates: Vec<Candidate>) {
        self.by_frame.insert(frame_index, candidates);
    }

    pub fn len(&self) -> usize {
        self.by_frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_frame.is_empty()
    }
}

impl FromIterator<(u64, Vec<Candidate>)> for ExternalCandidates {
    fn from_iter<I: IntoIterator<Item = (u64, Vec<Candidate>)>>(iter: I) -> Self {
        Self {
            by_frame: iter.into_iter().collect(),
        }
    }
}

impl CandidateDetector for ExternalCandidates {
    fn name(&self) -> &'static str {
        "external"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Candidate>> {
        Ok(self.by_frame.get(&frame.index).cloned().unwrap_or_default())
    }
}

/// Result of running the chain on one frame.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub candidates: Vec<Candidate>,
    /// Strategy that produced the candidates, `None` if every one came up empty
    pub strategy: Option<&'static str>,
}

pub struct DetectorChain {
    detectors: Vec<Box<dyn CandidateDetector>>,
}

impl DetectorChain {
    pub fn new(detectors: Vec<Box<dyn CandidateDetector>>) -> Self {
        Self { detectors }
    }

    /// Enhanced first (if enabled), traditional as the fallback.
    pub fn from_config(config: &Config) -> Self {
        let segmenter = ColorSegmenter::new(config.segmentation.clone());
        let shape_filter = ShapeFilter::new(config.shape.clone());

        let mut detectors: Vec<Box<dyn CandidateDetector>> = Vec::with_capacity(2);
        if config.enhancer.enabled {
            detectors.push(Box::new(EnhancedColorDetector::new(
                FrameEnhancer::new(config.enhancer.clone()),
                segmenter.clone(),
                shape_filter.clone(),
            )));
        }
        detectors.push(Box::new(TraditionalColorDetector::new(segmenter, shape_filter)));
        Self::new(detectors)
    }

    pub fn strategies(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn detect(&self, frame: &Frame) -> Result<DetectionOutcome> {
        for detector in &self.detectors {
            let candidates = detector.detect(frame)?;
            if !candidates.is_empty() {
                return Ok(DetectionOutcome {
                    candidates,
                    strategy: Some(detector.name()),
                });
            }
            debug!(
                "Frame {}: '{}' found nothing, falling back",
                frame.index,
                detector.name()
            );
        }
        Ok(DetectionOutcome::default())
    }
}
