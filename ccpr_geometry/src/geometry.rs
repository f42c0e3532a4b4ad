// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decomposition of contours into monotonic primitives.
//!
//! [`Geometry`] records contours as a stream of [`Verb`]s over a flat point buffer. Every curve
//! it emits is monotonic in both x and y, which is what a coverage counting rasterizer needs to
//! integrate an edge without sign ambiguity.

use log::{debug, trace, warn};
use peniko::kurbo::{CubicBez, ParamCurveExtrema, PathEl, Point, QuadBez, Vec2};

use crate::classify::{classify_cubic, CubicType};
use crate::math::{
    chop_cubic_at, chop_quad_at, is_flat, is_zero_length, merge_split_params,
    parameter_tolerance, SplitParams, FLATNESS_THRESHOLD,
};
use crate::{Error, Result};

/// A geometry command, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    BeginContour,
    LineTo,
    MonotonicQuadraticTo,
    MonotonicCubicTo,
    EndOpenContour,
    EndClosedContour,
}

impl Verb {
    /// The number of points this verb appends to the point buffer.
    pub const fn point_count(self) -> usize {
        match self {
            Self::BeginContour | Self::LineTo => 1,
            Self::MonotonicQuadraticTo => 2,
            Self::MonotonicCubicTo => 3,
            Self::EndOpenContour | Self::EndClosedContour => 0,
        }
    }

    /// Returns `true` for the verbs that draw an edge.
    pub const fn is_segment(self) -> bool {
        matches!(
            self,
            Self::LineTo | Self::MonotonicQuadraticTo | Self::MonotonicCubicTo
        )
    }
}

/// Counts of the primitives a contour needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveTallies {
    /// Triangles of the contour's fan, between its start point and every segment end.
    pub triangles: u32,
    pub quadratics: u32,
    pub cubics: u32,
}

impl core::ops::AddAssign for PrimitiveTallies {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.quadratics += rhs.quadratics;
        self.cubics += rhs.cubics;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ContourState {
    NotStarted,
    InContour {
        /// Index of the contour's `BeginContour` verb.
        first_verb: usize,
        start: Point,
    },
}

/// A verb together with its control polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<'a> {
    pub verb: Verb,
    /// For `BeginContour` the start point, for drawing verbs the pen point followed by the
    /// verb's own points, and empty for the contour ends.
    pub points: &'a [Point],
}

impl Segment<'_> {
    /// The point the pen is left at.
    pub fn end_point(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// Iterator over the [`Segment`]s of a [`Geometry`].
#[derive(Clone, Debug)]
pub struct Segments<'a> {
    verbs: core::slice::Iter<'a, Verb>,
    points: &'a [Point],
    offset: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let verb = *self.verbs.next()?;
        let count = verb.point_count();
        let points = if verb.is_segment() {
            // The pen point is the last point of the previous verb's slice.
            self.points.get(self.offset.checked_sub(1)?..self.offset + count)?
        } else {
            self.points.get(self.offset..self.offset + count)?
        };
        self.offset += count;
        Some(Segment { verb, points })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.verbs.size_hint()
    }
}

/// Contours decomposed into monotonic lines, quadratics and cubics.
///
/// The verb stream and the point buffer are kept in two vectors. Each verb owns the next
/// [`Verb::point_count`] points of the buffer, so slices are derived from the verbs alone.
#[derive(Clone, Debug)]
pub struct Geometry {
    verbs: Vec<Verb>,
    points: Vec<Point>,
    state: ContourState,
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            verbs: Vec::new(),
            points: Vec::new(),
            state: ContourState::NotStarted,
        }
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Iterates over every verb with its control polygon.
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            verbs: self.verbs.iter(),
            points: &self.points,
            offset: 0,
        }
    }

    /// Returns `true` between `begin_contour` and the end of that contour.
    pub fn is_in_contour(&self) -> bool {
        matches!(self.state, ContourState::InContour { .. })
    }

    /// Discards all verbs and points, abandoning any open contour.
    pub fn clear(&mut self) {
        self.verbs.clear();
        self.points.clear();
        self.state = ContourState::NotStarted;
    }

    /// Starts a new contour at `start`.
    ///
    /// A non-finite start point is dropped with a warning and no contour is opened.
    pub fn begin_contour(&mut self, start: Point) -> Result<()> {
        if self.is_in_contour() {
            return Err(Error::ContourAlreadyOpen);
        }
        if !start.is_finite() {
            warn!("Dropping contour with non-finite start point {start:?}");
            return Ok(());
        }
        self.state = ContourState::InContour {
            first_verb: self.verbs.len(),
            start,
        };
        self.verbs.push(Verb::BeginContour);
        self.points.push(start);
        Ok(())
    }

    pub fn line_to(&mut self, end: Point) -> Result<()> {
        let pen = self.pen("line_to")?;
        if !end.is_finite() {
            warn!("Dropping line with non-finite end point {end:?}");
            return Ok(());
        }
        if !is_zero_length(pen, &[end]) {
            self.push_line(end);
        }
        Ok(())
    }

    /// Appends a quadratic, split at its x and y extrema.
    ///
    /// A quadratic whose control point lies on its chord is emitted as a line.
    pub fn quadratic_to(&mut self, control: Point, end: Point) -> Result<()> {
        let pen = self.pen("quadratic_to")?;
        if !(control.is_finite() && end.is_finite()) {
            warn!("Dropping quadratic with non-finite control points");
            return Ok(());
        }
        self.push_quadratic(QuadBez::new(pen, control, end));
        Ok(())
    }

    /// Appends a cubic, split into monotonic pieces.
    ///
    /// The curve is split at its inflections, its loop intersection or its cusp, and at its
    /// x and y extrema. Split points that would leave a piece spanning less than `tolerance`
    /// pixels on both axes are merged. Degenerate cubics are reduced to quadratics or lines.
    pub fn cubic_to(
        &mut self,
        control1: Point,
        control2: Point,
        end: Point,
        tolerance: Vec2,
    ) -> Result<()> {
        let pen = self.pen("cubic_to")?;
        if !(control1.is_finite() && control2.is_finite() && end.is_finite()) {
            warn!("Dropping cubic with non-finite control points");
            return Ok(());
        }
        if is_zero_length(pen, &[control1, control2, end]) {
            return Ok(());
        }
        if is_flat(pen, &[control1, control2], end, FLATNESS_THRESHOLD) {
            self.push_line(end);
            return Ok(());
        }

        let classification = classify_cubic(&[pen, control1, control2, end]);
        match classification.cubic_type {
            CubicType::LineDegenerate => self.push_line(end),
            CubicType::QuadraticDegenerate => {
                let control = Point::new(
                    (3.0 * (control1.x + control2.x) - pen.x - end.x) * 0.25,
                    (3.0 * (control1.y + control2.y) - pen.y - end.y) * 0.25,
                );
                self.push_quadratic(QuadBez::new(pen, control, end));
            }
            cubic_type => {
                let cubic = CubicBez::new(pen, control1, control2, end);
                let mut params: SplitParams = classification.interior_roots().collect();
                params.extend(cubic.extrema());
                params.sort_by(f64::total_cmp);
                let dt = parameter_tolerance(&cubic, tolerance);
                let splits = merge_split_params(&params, dt);
                trace!("{cubic_type} split candidates {params:?}, kept {splits:?} (dt {dt})");
                for piece in chop_cubic_at(cubic, &splits) {
                    self.verbs.push(Verb::MonotonicCubicTo);
                    self.points.extend([piece.p1, piece.p2, piece.p3]);
                }
            }
        }
        Ok(())
    }

    /// Ends the current contour.
    ///
    /// The contour counts as closed if the pen is back at its start point.
    pub fn end_contour(&mut self) -> Result<PrimitiveTallies> {
        let (first_verb, start) = self.open_contour("end_contour")?;
        let has_segments = self.verbs[first_verb..].iter().any(|v| v.is_segment());
        let closed = has_segments && self.points.last() == Some(&start);
        Ok(self.finish_contour(first_verb, closed))
    }

    /// Draws a line back to the contour's start point if needed, then ends it as closed.
    pub fn close_contour(&mut self) -> Result<PrimitiveTallies> {
        let (first_verb, start) = self.open_contour("close_contour")?;
        if self.points.last() != Some(&start) {
            self.line_to(start)?;
        }
        Ok(self.finish_contour(first_verb, true))
    }

    /// Replays a path, decomposing each of its subpaths into a contour.
    ///
    /// A `MoveTo` ends any open contour. Segments open a contour at the last `MoveTo` point
    /// when none is open, and a segment with nowhere to start from is treated as a move to its
    /// end point. `ClosePath` closes the contour. A contour still open at the end of the path
    /// is ended without closing it.
    ///
    /// Returns the tallies of every contour the path ended.
    pub fn replay(
        &mut self,
        path: impl IntoIterator<Item = PathEl>,
        tolerance: Vec2,
    ) -> Result<PrimitiveTallies> {
        let mut tallies = PrimitiveTallies::default();
        let mut subpath_start = match self.state {
            ContourState::InContour { start, .. } => Some(start),
            ContourState::NotStarted => None,
        };
        for el in path {
            match el {
                PathEl::MoveTo(p) => {
                    if self.is_in_contour() {
                        tallies += self.end_contour()?;
                    }
                    subpath_start = Some(p);
                }
                PathEl::LineTo(p) => {
                    if self.open_for_segment(&mut subpath_start, p)? {
                        self.line_to(p)?;
                    }
                }
                PathEl::QuadTo(c, p) => {
                    if self.open_for_segment(&mut subpath_start, p)? {
                        self.quadratic_to(c, p)?;
                    }
                }
                PathEl::CurveTo(c1, c2, p) => {
                    if self.open_for_segment(&mut subpath_start, p)? {
                        self.cubic_to(c1, c2, p, tolerance)?;
                    }
                }
                PathEl::ClosePath => {
                    if self.is_in_contour() {
                        tallies += self.close_contour()?;
                    }
                }
            }
        }
        if self.is_in_contour() {
            tallies += self.end_contour()?;
        }
        Ok(tallies)
    }

    /// Makes sure a contour is open before replaying a segment ending at `end`.
    ///
    /// Returns `false` if the segment has to be skipped.
    fn open_for_segment(&mut self, subpath_start: &mut Option<Point>, end: Point) -> Result<bool> {
        if self.is_in_contour() {
            return Ok(true);
        }
        let Some(start) = *subpath_start else {
            *subpath_start = Some(end);
            return Ok(false);
        };
        self.begin_contour(start)?;
        // A non-finite start point leaves the contour unopened.
        Ok(self.is_in_contour())
    }

    fn pen(&self, op: &'static str) -> Result<Point> {
        self.open_contour(op)?;
        self.points.last().copied().ok_or(Error::NoOpenContour(op))
    }

    fn open_contour(&self, op: &'static str) -> Result<(usize, Point)> {
        match self.state {
            ContourState::InContour { first_verb, start } => Ok((first_verb, start)),
            ContourState::NotStarted => Err(Error::NoOpenContour(op)),
        }
    }

    fn push_line(&mut self, end: Point) {
        self.verbs.push(Verb::LineTo);
        self.points.push(end);
    }

    fn push_quadratic(&mut self, quad: QuadBez) {
        if is_zero_length(quad.p0, &[quad.p1, quad.p2]) {
            return;
        }
        if is_flat(quad.p0, &[quad.p1], quad.p2, FLATNESS_THRESHOLD) {
            self.push_line(quad.p2);
            return;
        }
        let params: SplitParams = quad.extrema().into_iter().collect();
        let splits = merge_split_params(&params, 0.0);
        for piece in chop_quad_at(quad, &splits) {
            self.verbs.push(Verb::MonotonicQuadraticTo);
            self.points.extend([piece.p1, piece.p2]);
        }
    }

    fn finish_contour(&mut self, first_verb: usize, closed: bool) -> PrimitiveTallies {
        let mut tallies = PrimitiveTallies::default();
        let mut fan_points = 1_u32;
        for verb in &self.verbs[first_verb..] {
            match verb {
                Verb::LineTo => fan_points += 1,
                Verb::MonotonicQuadraticTo => {
                    fan_points += 1;
                    tallies.quadratics += 1;
                }
                Verb::MonotonicCubicTo => {
                    fan_points += 1;
                    tallies.cubics += 1;
                }
                _ => {}
            }
        }
        if closed {
            // The closing point duplicates the start point.
            fan_points -= 1;
        }
        tallies.triangles = fan_points.saturating_sub(2);
        self.verbs.push(if closed {
            Verb::EndClosedContour
        } else {
            Verb::EndOpenContour
        });
        self.state = ContourState::NotStarted;
        debug!("Ended {} contour: {tallies:?}", if closed { "closed" } else { "open" });
        tallies
    }
}
