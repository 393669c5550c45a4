// src/detection/shape_filter.rs
//
// Turns a binary ball mask into scored, roughly spherical candidates.
//
// Per external contour:
//   1. area ≥ min_area                    (drops residual speckle)
//   2. circularity = 4π·A / P² ∈ [min, max]
//   3. minimum enclosing circle, fill ratio A / (π r²) > min_fill_ratio
//      (rejects crescents and partially occluded blobs that are round-ish
//       along their outline but hollow inside the circle)
//   4. radius within [min_radius, max_radius]
//
// An empty mask is a normal, empty result.

use crate::types::Candidate;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::arc_length;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeFilterConfig {
    pub min_area: f64,
    pub circularity_min: f64,
    pub circularity_max: f64,
    pub min_fill_ratio: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Weight of radius closeness to the mid-range radius in the confidence
    pub size_weight: f64,
    /// Weight of circularity closeness to 1.0 in the confidence
    pub circularity_weight: f64,
}

impl Default for ShapeFilterConfig {
    fn default() -> Self {
        Self {
            min_area: 50.0,
            circularity_min: 0.7,
            circularity_max: 1.3,
            min_fill_ratio: 0.6,
            min_radius: 3.0,
            max_radius: 30.0,
            size_weight: 0.5,
            circularity_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShapeFilter {
    config: ShapeFilterConfig,
}

impl ShapeFilter {
    pub fn new(config: ShapeFilterConfig) -> Self {
        Self { config }
    }

    /// Candidates sorted by descending confidence.
    pub fn filter(&self, mask: &GrayImage) -> Vec<Candidate> {
        let cfg = &self.config;
        let contours = find_contours::<i32>(mask);
        let mut candidates = Vec::new();

        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        {
            let points = &contour.points;
            if points.len() < 3 {
                continue;
            }

            // Anything wider than the largest allowed ball cannot pass the
            // radius test; skip it before the enclosing-circle search.
            let (min_x, max_x, min_y, max_y) = bounds(points);
            let max_extent = (2.0 * cfg.max_radius + 2.0) as i32;
            if max_x - min_x > max_extent || max_y - min_y > max_extent {
                continue;
            }

            let area = polygon_area(points);
            if area < cfg.min_area {
                continue;
            }

            let perimeter = arc_length(points, true);
            if perimeter <= 0.0 {
                continue;
            }

            let circularity = 4.0 * PI * area / (perimeter * perimeter);
            if circularity < cfg.circularity_min || circularity > cfg.circularity_max {
                continue;
            }

            let pts: Vec<(f64, f64)> = points.iter().map(|p| (p.x as f64, p.y as f64)).collect();
            let (center, radius) = min_enclosing_circle(&pts);
            if radius <= 0.0 {
                continue;
            }

            let fill_ratio = area / (PI * radius * radius);
            if fill_ratio <= cfg.min_fill_ratio {
                continue;
            }
            if radius < cfg.min_radius || radius > cfg.max_radius {
                continue;
            }

            candidates.push(Candidate {
                position: center,
                radius,
                circularity,
                area,
                confidence: self.score(radius, circularity),
            });
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "Shape filter: {} contours → {} candidates",
            contours.len(),
            candidates.len()
        );
        candidates
    }

    fn score(&self, radius: f64, circularity: f64) -> f64 {
        let cfg = &self.config;
        let target = (cfg.min_radius + cfg.max_radius) / 2.0;
        let size = if target > 0.0 {
            (1.0 - (radius - target).abs() / target).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let roundness = (1.0 - (1.0 - circularity).abs()).clamp(0.0, 1.0);

        let total = cfg.size_weight + cfg.circularity_weight;
        if total <= 0.0 {
            return roundness;
        }
        (cfg.size_weight * size + cfg.circularity_weight * roundness) / total
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

fn bounds(points: &[Point<i32>]) -> (i32, i32, i32, i32) {
    points.iter().fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    )
}

/// Shoelace area of the closed polygon through the contour points.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    let mut twice = 0i64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (twice as f64 / 2.0).abs()
}

const CIRCLE_EPS: f64 = 1e-7;

/// Smallest circle containing every point (incremental Welzl).
pub fn min_enclosing_circle(points: &[(f64, f64)]) -> ((f64, f64), f64) {
    let Some(&first) = points.first() else {
        return ((0.0, 0.0), 0.0);
    };

    let inside = |c: (f64, f64), r: f64, p: (f64, f64)| dist(c, p) <= r + CIRCLE_EPS;

    let mut c = first;
    let mut r = 0.0;
    for i in 1..points.len() {
        let pi = points[i];
        if inside(c, r, pi) {
            continue;
        }
        c = pi;
        r = 0.0;
        for j in 0..i {
            let pj = points[j];
            if inside(c, r, pj) {
                continue;
            }
            c = midpoint(pi, pj);
            r = dist(pi, pj) / 2.0;
            for k in 0..j {
                let pk = points[k];
                if inside(c, r, pk) {
                    continue;
                }
                (c, r) = circle_through(pi, pj, pk);
            }
        }
    }
    (c, r)
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Circumcircle of three points; for collinear points, the circle on the
/// farthest pair.
fn circle_through(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> ((f64, f64), f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        let pairs = [(a, b), (a, c), (b, c)];
        let (p, q) = pairs
            .into_iter()
            .max_by(|x, y| {
                dist(x.0, x.1)
                    .partial_cmp(&dist(y.0, y.1))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or((a, b));
        return (midpoint(p, q), dist(p, q) / 2.0);
    }

    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let center = (ux, uy);
    (center, dist(center, a))
}
