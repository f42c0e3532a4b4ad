// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric helpers shared by the classifier and the decomposer.

use peniko::kurbo::{CubicBez, Point, QuadBez, Vec2};
use smallvec::SmallVec;

/// Distance in pixels under which a control point is considered to lie on its chord.
pub const FLATNESS_THRESHOLD: f64 = 1.0 / 16.0;

/// Parameter distance under which two split parameters are always considered the same.
///
/// This also keeps splits from landing directly on a curve's end points, which would emit
/// zero-length pieces.
pub const PARAM_EPSILON: f64 = 1e-6;

/// Extent below which a segment is treated as zero-length.
const EPSILON: f64 = 1e-12;

/// A short, sorted list of curve parameters in `(0, 1)`.
pub type SplitParams = SmallVec<[f64; 8]>;

/// Converts a point to the `f32` representation used by GPU instance records.
pub fn point_to_f32(point: Point) -> [f32; 2] {
    [point.x as f32, point.y as f32]
}

/// Splits a cubic at `t` with De Casteljau's algorithm.
pub fn split_cubic(c: CubicBez, t: f64) -> (CubicBez, CubicBez) {
    let p01 = c.p0.lerp(c.p1, t);
    let p12 = c.p1.lerp(c.p2, t);
    let p23 = c.p2.lerp(c.p3, t);
    let p012 = p01.lerp(p12, t);
    let p123 = p12.lerp(p23, t);
    let p0123 = p012.lerp(p123, t);
    (
        CubicBez::new(c.p0, p01, p012, p0123),
        CubicBez::new(p0123, p123, p23, c.p3),
    )
}

/// Splits a quadratic at `t` with De Casteljau's algorithm.
pub fn split_quad(q: QuadBez, t: f64) -> (QuadBez, QuadBez) {
    let p01 = q.p0.lerp(q.p1, t);
    let p12 = q.p1.lerp(q.p2, t);
    let p012 = p01.lerp(p12, t);
    (QuadBez::new(q.p0, p01, p012), QuadBez::new(p012, p12, q.p2))
}

/// Chops a cubic at each of the sorted parameters in `ts`.
///
/// Returns `ts.len() + 1` pieces. The parameters refer to the original curve; they are
/// remapped onto the remainder after every cut.
pub fn chop_cubic_at(c: CubicBez, ts: &[f64]) -> SmallVec<[CubicBez; 8]> {
    let mut pieces = SmallVec::new();
    let mut rest = c;
    let mut prev = 0.0;
    for &t in ts {
        let (head, tail) = split_cubic(rest, (t - prev) / (1.0 - prev));
        pieces.push(head);
        rest = tail;
        prev = t;
    }
    pieces.push(rest);
    pieces
}

/// Chops a quadratic at each of the sorted parameters in `ts`.
pub fn chop_quad_at(q: QuadBez, ts: &[f64]) -> SmallVec<[QuadBez; 4]> {
    let mut pieces = SmallVec::new();
    let mut rest = q;
    let mut prev = 0.0;
    for &t in ts {
        let (head, tail) = split_quad(rest, (t - prev) / (1.0 - prev));
        pieces.push(head);
        rest = tail;
        prev = t;
    }
    pieces.push(rest);
    pieces
}

/// Returns `true` if every point in `controls` lies within `tolerance` of the line through
/// `start` and `end`.
///
/// The test checks whether a box with radius `tolerance` centered on each control point
/// touches the line, which only needs the Manhattan width of the chord rather than a square
/// root. If the chord has no length the control points must lie within the box around `start`.
pub fn is_flat(start: Point, controls: &[Point], end: Point, tolerance: f64) -> bool {
    let chord = end - start;
    let width = chord.x.abs() + chord.y.abs();
    if width <= EPSILON {
        return controls.iter().all(|c| {
            let d = *c - start;
            d.x.abs() <= tolerance && d.y.abs() <= tolerance
        });
    }
    controls
        .iter()
        .all(|c| (*c - start).cross(chord).abs() <= width * tolerance)
}

/// Returns `true` if the bounding box of `start` and `rest` has no extent.
pub fn is_zero_length(start: Point, rest: &[Point]) -> bool {
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (start.x, start.x, start.y, start.y);
    for p in rest {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }
    !(x_max - x_min > EPSILON || y_max - y_min > EPSILON)
}

/// Converts a pixel-space tolerance into a distance in the cubic's parameter space.
///
/// The derivative of a cubic is a quadratic whose control points are three times the
/// differences of the cubic's control points, so `|x'(t)| <= 3 * max|ΔPx|` and likewise
/// for `y`. Any sub-curve spanning less than the returned parameter distance therefore moves
/// less than `tolerance.x` horizontally and less than `tolerance.y` vertically. An axis on
/// which the curve does not move imposes no bound.
pub fn parameter_tolerance(c: &CubicBez, tolerance: Vec2) -> f64 {
    let d1 = c.p1 - c.p0;
    let d2 = c.p2 - c.p1;
    let d3 = c.p3 - c.p2;
    let max_dx = d1.x.abs().max(d2.x.abs()).max(d3.x.abs());
    let max_dy = d1.y.abs().max(d2.y.abs()).max(d3.y.abs());
    let axis = |tol: f64, max_delta: f64| {
        if max_delta > 0.0 {
            tol.max(0.0) / (3.0 * max_delta)
        } else {
            f64::INFINITY
        }
    };
    axis(tolerance.x, max_dx).min(axis(tolerance.y, max_dy))
}

/// Merges split parameters that lie closer together than `tolerance`.
///
/// `params` must be sorted. The parameters are clustered together with the curve's end
/// points `0` and `1`: neighbours closer than `tolerance` (or [`PARAM_EPSILON`]) share a
/// cluster. Clusters that reach an end point are dropped, since the piece they would cut off
/// is negligible. Every other cluster collapses to a single split at its mean.
///
/// Growing `tolerance` can only join clusters, so the number of returned splits never
/// increases with it.
pub fn merge_split_params(params: &[f64], tolerance: f64) -> SplitParams {
    let threshold = tolerance.max(PARAM_EPSILON);
    let mut merged = SplitParams::new();
    // The first cluster is anchored at 0.
    let mut anchored = true;
    let mut sum = 0.0;
    let mut count = 0_u32;
    let mut last = 0.0;
    for &t in params {
        if !(t > 0.0 && t < 1.0) {
            continue;
        }
        if t - last >= threshold {
            if !anchored && count > 0 {
                merged.push(sum / f64::from(count));
            }
            anchored = false;
            sum = 0.0;
            count = 0;
        }
        if !anchored {
            sum += t;
            count += 1;
        }
        last = t;
    }
    // The last cluster is dropped if it reaches 1.
    if !anchored && count > 0 && 1.0 - last >= threshold {
        merged.push(sum / f64::from(count));
    }
    merged
}
