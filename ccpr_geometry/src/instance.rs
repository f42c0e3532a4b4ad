// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance records consumed by the coverage processor.

use bytemuck::{Pod, Zeroable};
use peniko::kurbo::{Point, Vec2};
use smallvec::SmallVec;

use crate::geometry::{Geometry, Verb};
use crate::math::point_to_f32;
use crate::pass::{InstanceLayout, PrimitiveKind};
use crate::{Config, RenderPass};

/// Three points, as drawn by the triangle and quadratic passes.
///
/// This corresponds to `TriangleInstance` in the coverage processor's vertex input.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TriangleInstance {
    pub x: [f32; 3],
    pub y: [f32; 3],
}

/// The four control points of a monotonic cubic.
///
/// This corresponds to `CubicInstance` in the coverage processor's vertex input.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CubicInstance {
    pub x: [f32; 4],
    pub y: [f32; 4],
}

static_assertions::const_assert_eq!(size_of::<TriangleInstance>(), 24);
static_assertions::const_assert_eq!(size_of::<CubicInstance>(), 32);

impl TriangleInstance {
    /// Packs `points`, offset by `bias`.
    pub fn new(points: [Point; 3], bias: Vec2) -> Self {
        let mut instance = Self::default();
        for (i, p) in points.into_iter().enumerate() {
            [instance.x[i], instance.y[i]] = point_to_f32(p + bias);
        }
        instance
    }

    pub fn points(&self) -> [Point; 3] {
        core::array::from_fn(|i| Point::new(self.x[i].into(), self.y[i].into()))
    }
}

impl CubicInstance {
    /// Packs `points`, offset by `dx` and `dy`.
    pub fn new(points: [Point; 4], dx: f64, dy: f64) -> Self {
        let mut instance = Self::default();
        let offset = Vec2::new(dx, dy);
        for (i, p) in points.into_iter().enumerate() {
            [instance.x[i], instance.y[i]] = point_to_f32(p + offset);
        }
        instance
    }

    pub fn points(&self) -> [Point; 4] {
        core::array::from_fn(|i| Point::new(self.x[i].into(), self.y[i].into()))
    }
}

/// Instance records, in the order their primitives were emitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instances {
    pub triangles: Vec<TriangleInstance>,
    pub cubics: Vec<CubicInstance>,
}

impl Instances {
    pub fn clear(&mut self) {
        self.triangles.clear();
        self.cubics.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.cubics.is_empty()
    }

    /// The number of records `pass` draws.
    pub fn count(&self, pass: RenderPass) -> usize {
        match pass.layout() {
            InstanceLayout::Triangle => self.triangles.len(),
            InstanceLayout::Cubic => self.cubics.len(),
        }
    }

    /// The raw bytes of the records `pass` draws, ready for upload.
    pub fn bytes(&self, pass: RenderPass) -> &[u8] {
        match pass.layout() {
            InstanceLayout::Triangle => bytemuck::cast_slice(&self.triangles),
            InstanceLayout::Cubic => bytemuck::cast_slice(&self.cubics),
        }
    }

    /// Appends the records `pass` needs for `geometry`.
    ///
    /// Triangle passes get the fan of each contour, between its start point and the end of
    /// every segment. Quadratic passes get the control triangle of every monotonic quadratic
    /// and cubic passes the control points of every monotonic cubic. Lines only contribute to
    /// the fans.
    pub fn extend_from(&mut self, pass: RenderPass, geometry: &Geometry, config: &Config) {
        let bias = config.bias;
        match pass.primitive() {
            PrimitiveKind::Triangles => {
                let mut fan = SmallVec::<[Point; 16]>::new();
                for segment in geometry.segments() {
                    match segment.verb {
                        Verb::BeginContour => {
                            self.push_fan(&fan, bias);
                            fan.clear();
                            fan.extend(segment.end_point());
                        }
                        Verb::EndOpenContour | Verb::EndClosedContour => {
                            if segment.verb == Verb::EndClosedContour && fan.len() > 1 {
                                // The closing point is the start point again.
                                fan.pop();
                            }
                            self.push_fan(&fan, bias);
                            fan.clear();
                        }
                        _ => fan.extend(segment.end_point()),
                    }
                }
                // A contour that is still open.
                self.push_fan(&fan, bias);
            }
            PrimitiveKind::Quadratics => {
                self.triangles.extend(geometry.segments().filter_map(|segment| {
                    match (segment.verb, segment.points) {
                        (Verb::MonotonicQuadraticTo, &[p0, p1, p2]) => {
                            Some(TriangleInstance::new([p0, p1, p2], bias))
                        }
                        _ => None,
                    }
                }));
            }
            PrimitiveKind::Cubics => {
                self.cubics.extend(geometry.segments().filter_map(|segment| {
                    match (segment.verb, segment.points) {
                        (Verb::MonotonicCubicTo, &[p0, p1, p2, p3]) => {
                            Some(CubicInstance::new([p0, p1, p2, p3], bias.x, bias.y))
                        }
                        _ => None,
                    }
                }));
            }
        }
    }

    fn push_fan(&mut self, fan: &[Point], bias: Vec2) {
        let Some((&apex, rest)) = fan.split_first() else {
            return;
        };
        self.triangles.extend(
            rest.windows(2)
                .map(|pair| TriangleInstance::new([apex, pair[0], pair[1]], bias)),
        );
    }
}

/// Packs the records `pass` needs for `geometry` into a fresh [`Instances`].
pub fn pack_instances(pass: RenderPass, geometry: &Geometry, config: &Config) -> Instances {
    let mut instances = Instances::default();
    instances.extend_from(pass, geometry, config);
    instances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_contour() -> Geometry {
        let mut g = Geometry::new();
        g.begin_contour(Point::new(0., 0.)).unwrap();
        g.quadratic_to(Point::new(50., 100.), Point::new(100., 0.))
            .unwrap();
        g.end_contour().unwrap();
        g
    }

    #[test]
    fn triangle_fan() {
        let mut g = Geometry::new();
        g.begin_contour(Point::new(0., 0.)).unwrap();
        g.line_to(Point::new(10., 0.)).unwrap();
        g.line_to(Point::new(10., 10.)).unwrap();
        g.line_to(Point::new(0., 10.)).unwrap();
        let tallies = g.close_contour().unwrap();
        let instances = pack_instances(RenderPass::TriangleHulls, &g, &Config::default());
        assert_eq!(instances.triangles.len(), 2);
        assert_eq!(instances.triangles.len(), tallies.triangles as usize);
        assert!(instances.cubics.is_empty());
        assert_eq!(
            instances.triangles[1].points(),
            [Point::new(0., 0.), Point::new(10., 10.), Point::new(0., 10.)]
        );
    }

    #[test]
    fn fan_restarts_per_contour() {
        let mut g = Geometry::new();
        for offset in [0., 100.] {
            g.begin_contour(Point::new(offset, 0.)).unwrap();
            g.line_to(Point::new(offset + 10., 0.)).unwrap();
            g.line_to(Point::new(offset + 10., 10.)).unwrap();
            g.end_contour().unwrap();
        }
        let instances = pack_instances(RenderPass::TriangleEdges, &g, &Config::default());
        assert_eq!(instances.triangles.len(), 2);
        assert_eq!(instances.triangles[1].x, [100., 110., 110.]);
    }

    #[test]
    fn quadratic_instances() {
        let g = quad_contour();
        let instances = pack_instances(RenderPass::QuadraticCorners, &g, &Config::default());
        assert_eq!(instances.triangles.len(), 2);
        assert_eq!(
            instances.triangles[0].points(),
            [Point::new(0., 0.), Point::new(25., 50.), Point::new(50., 50.)]
        );
        // Nothing to draw for cubic passes.
        let instances = pack_instances(RenderPass::CubicHulls, &g, &Config::default());
        assert!(instances.is_empty());
    }

    #[test]
    fn cubic_instances_carry_the_pen_point() {
        let mut g = Geometry::new();
        g.begin_contour(Point::new(100., 100.)).unwrap();
        g.cubic_to(
            Point::new(400., 100.),
            Point::new(400., 300.),
            Point::new(100., 300.),
            Vec2::ZERO,
        )
        .unwrap();
        g.end_contour().unwrap();
        let config = Config::default().with_bias(Vec2::new(0.5, -1.));
        let instances = pack_instances(RenderPass::CubicCorners, &g, &config);
        assert_eq!(instances.cubics.len(), 2);
        assert_eq!(instances.cubics[0].x, [100.5, 250.5, 325.5, 325.5]);
        assert_eq!(instances.cubics[0].y, [99., 99., 149., 199.]);
        assert_eq!(instances.cubics[1].x[0], instances.cubics[0].x[3]);
        assert_eq!(instances.count(RenderPass::CubicCorners), 2);
        assert_eq!(instances.bytes(RenderPass::CubicCorners).len(), 64);
        assert_eq!(instances.bytes(RenderPass::TriangleHulls).len(), 0);
    }

    #[test]
    fn hulls_and_corners_share_records() {
        let g = quad_contour();
        let config = Config::default();
        assert_eq!(
            pack_instances(RenderPass::QuadraticHulls, &g, &config),
            pack_instances(RenderPass::QuadraticCorners, &g, &config)
        );
    }

    #[test]
    fn extend_appends() {
        let g = quad_contour();
        let mut instances = pack_instances(RenderPass::TriangleHulls, &g, &Config::default());
        // One triangle between the start, the apex and the end.
        assert_eq!(instances.triangles.len(), 1);
        instances.extend_from(RenderPass::QuadraticHulls, &g, &Config::default());
        assert_eq!(instances.triangles.len(), 3);
        instances.clear();
        assert!(instances.is_empty());
    }
}
