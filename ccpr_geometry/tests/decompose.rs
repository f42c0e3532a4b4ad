// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End to end properties of classification, decomposition and packing.

use ccpr_geometry::backend::{DrawOutcome, Recording};
use ccpr_geometry::kurbo::{CubicBez, ParamCurve, Point, Vec2};
use ccpr_geometry::view::GeometryView;
use ccpr_geometry::{
    classify_cubic, pack_instances, Config, CubicKlm, CubicType, Error, Geometry, RenderPass,
    Verb,
};

/// Deterministic points for property checks.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1_u64 << 53) as f64
    }

    fn point(&mut self) -> Point {
        Point::new(self.next_f64() * 500., self.next_f64() * 500.)
    }

    fn cubic(&mut self) -> [Point; 4] {
        [self.point(), self.point(), self.point(), self.point()]
    }
}

fn decompose(points: [Point; 4], tolerance: Vec2) -> Geometry {
    let mut geometry = Geometry::new();
    geometry.begin_contour(points[0]).unwrap();
    geometry
        .cubic_to(points[1], points[2], points[3], tolerance)
        .unwrap();
    geometry.end_contour().unwrap();
    geometry
}

fn count(geometry: &Geometry, verb: Verb) -> usize {
    geometry.verbs().iter().filter(|v| **v == verb).count()
}

fn assert_monotonic(cubic: CubicBez) {
    let scale = [cubic.p0, cubic.p1, cubic.p2, cubic.p3]
        .iter()
        .fold(1.0_f64, |acc, p| acc.max(p.x.abs()).max(p.y.abs()));
    let eps = 1e-9 * scale;
    let samples: Vec<Point> = (0..=64).map(|i| cubic.eval(f64::from(i) / 64.)).collect();
    let mut dx = (false, false);
    let mut dy = (false, false);
    for pair in samples.windows(2) {
        let d = pair[1] - pair[0];
        dx.0 |= d.x > eps;
        dx.1 |= d.x < -eps;
        dy.0 |= d.y > eps;
        dy.1 |= d.y < -eps;
    }
    assert!(!(dx.0 && dx.1), "not monotonic in x: {cubic:?}");
    assert!(!(dy.0 && dy.1), "not monotonic in y: {cubic:?}");
}

fn cubic_pieces(geometry: &Geometry) -> Vec<CubicBez> {
    geometry
        .segments()
        .filter(|s| s.verb == Verb::MonotonicCubicTo)
        .map(|s| CubicBez::new(s.points[0], s.points[1], s.points[2], s.points[3]))
        .collect()
}

#[test]
fn collinear_points_decompose_to_one_line() {
    let mut rng = Lcg(1);
    for _ in 0..50 {
        let a = rng.point();
        let dir = rng.point() - Point::new(250., 250.);
        let points = [0.0, 0.3, 0.7, 1.0].map(|t| a + dir * t);
        assert_eq!(
            classify_cubic(&points).cubic_type,
            CubicType::LineDegenerate
        );
        let geometry = decompose(points, Config::default().cubic_tolerance());
        assert_eq!(count(&geometry, Verb::LineTo), 1);
        assert_eq!(geometry.verbs().len(), 3);
    }

    let p = Point::new(12., 34.);
    let geometry = decompose([p; 4], Vec2::ZERO);
    assert_eq!(
        geometry.verbs(),
        &[Verb::BeginContour, Verb::EndOpenContour]
    );
}

#[test]
fn serpentine_splits_at_inflections() {
    let both_inside = [
        Point::new(0., 0.),
        Point::new(85., 99.),
        Point::new(8., 20.),
        Point::new(100., 100.),
    ];
    assert_eq!(
        classify_cubic(&both_inside).cubic_type,
        CubicType::Serpentine
    );
    let geometry = decompose(both_inside, Vec2::ZERO);
    assert_eq!(count(&geometry, Verb::MonotonicCubicTo), 3);

    let one_inside = [
        Point::new(0., 0.),
        Point::new(30., 75.),
        Point::new(69., 16.),
        Point::new(100., 100.),
    ];
    assert_eq!(
        classify_cubic(&one_inside).cubic_type,
        CubicType::Serpentine
    );
    let geometry = decompose(one_inside, Vec2::ZERO);
    assert_eq!(count(&geometry, Verb::MonotonicCubicTo), 2);
}

#[test]
fn small_curves_far_from_the_origin_keep_their_shape() {
    let shape = [
        Point::new(0., 0.),
        Point::new(10., 8.),
        Point::new(0., 8.),
        Point::new(10., 0.),
    ];
    let tolerance = Vec2::new(0.25, 0.25);
    let expected = decompose(shape, tolerance);
    assert_eq!(count(&expected, Verb::MonotonicCubicTo), 2);
    for offset in [1e4, 1e5, 1e6, 1e7] {
        let moved = shape.map(|p| p + Vec2::new(offset, offset));
        assert_eq!(
            classify_cubic(&moved).cubic_type,
            CubicType::LocalCusp,
            "offset {offset}"
        );
        let geometry = decompose(moved, tolerance);
        assert_eq!(geometry.verbs(), expected.verbs(), "offset {offset}");
    }
}

#[test]
fn verbs_consume_every_point() {
    let mut rng = Lcg(2);
    let mut geometry = Geometry::new();
    for i in 0..200 {
        let [p0, p1, p2, p3] = rng.cubic();
        geometry.begin_contour(p0).unwrap();
        geometry.line_to(p1).unwrap();
        geometry.quadratic_to(p2, p3).unwrap();
        geometry
            .cubic_to(p1, p2, p0, Vec2::new(f64::from(i % 7), f64::from(i % 7)))
            .unwrap();
        if i % 2 == 0 {
            geometry.close_contour().unwrap();
        } else {
            geometry.end_contour().unwrap();
        }
        let consumed: usize = geometry.verbs().iter().map(|v| v.point_count()).sum();
        assert_eq!(consumed, geometry.points().len());
    }
}

#[test]
fn decomposition_is_deterministic() {
    let mut rng = Lcg(3);
    for _ in 0..50 {
        let points = rng.cubic();
        let a = decompose(points, Vec2::new(2., 3.));
        let b = decompose(points, Vec2::new(2., 3.));
        assert_eq!(a.verbs(), b.verbs());
        assert_eq!(a.points(), b.points());
    }
}

#[test]
fn quadratic_with_control_on_chord_is_a_line() {
    let mut geometry = Geometry::new();
    geometry.begin_contour(Point::new(10., 20.)).unwrap();
    geometry
        .quadratic_to(Point::new(40., 35.), Point::new(70., 50.))
        .unwrap();
    geometry.end_contour().unwrap();
    assert_eq!(
        geometry.verbs(),
        &[Verb::BeginContour, Verb::LineTo, Verb::EndOpenContour]
    );
}

#[test]
fn loop_decomposes_into_monotonic_pieces() {
    let points = [
        Point::new(100., 100.),
        Point::new(400., 100.),
        Point::new(400., 300.),
        Point::new(100., 300.),
    ];
    let geometry = decompose(points, Vec2::new(0.25, 0.25));
    let pieces = cubic_pieces(&geometry);
    assert!(pieces.len() >= 2);
    for piece in pieces {
        assert_monotonic(piece);
    }
}

#[test]
fn random_cubics_decompose_into_monotonic_pieces() {
    let mut rng = Lcg(4);
    for _ in 0..300 {
        let geometry = decompose(rng.cubic(), Vec2::ZERO);
        for piece in cubic_pieces(&geometry) {
            assert_monotonic(piece);
        }
    }
}

#[test]
fn piece_count_shrinks_as_tolerance_grows() {
    let points = [
        Point::new(0., 0.),
        Point::new(85., 99.),
        Point::new(8., 20.),
        Point::new(100., 100.),
    ];
    let counts: Vec<usize> = (0..=30)
        .map(|i| {
            let tolerance = Vec2::new(f64::from(i) * 5., f64::from(i) * 5.);
            count(&decompose(points, tolerance), Verb::MonotonicCubicTo)
        })
        .collect();
    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{counts:?}");
    assert_eq!(counts.first(), Some(&3));
    // The inflections are 0.264 apart in parameter space: tolerances from about 79px merge
    // them into one split.
    assert!(counts.contains(&2), "{counts:?}");
    assert_eq!(counts.last(), Some(&1));
}

#[test]
fn random_tolerance_sweeps_are_monotonic() {
    let mut rng = Lcg(5);
    for _ in 0..100 {
        let points = rng.cubic();
        let mut previous = usize::MAX;
        for i in 0..40 {
            let tolerance = Vec2::new(f64::from(i) * 2., f64::from(i) * 3.);
            let n = count(&decompose(points, tolerance), Verb::MonotonicCubicTo);
            assert!(n <= previous, "{points:?} at {tolerance:?}");
            previous = n;
        }
    }
}

#[test]
fn klm_implicit_vanishes_on_random_curves() {
    let mut rng = Lcg(6);
    let mut checked = 0;
    for _ in 0..500 {
        let points = rng.cubic();
        let klm = CubicKlm::new(&points);
        if !klm.cubic_type().is_cubic() {
            continue;
        }
        let cubic = CubicBez::new(points[0], points[1], points[2], points[3]);
        let values: Vec<[f64; 3]> = (0..=16)
            .map(|i| klm.klm.eval(cubic.eval(f64::from(i) / 16.)))
            .collect();
        let scale = values
            .iter()
            .map(|[k, l, m]| (k * k * k).abs() + (l * m).abs())
            .fold(0.0_f64, f64::max);
        for [k, l, m] in values {
            assert!((k * k * k - l * m).abs() <= 1e-8 * scale, "{points:?}");
        }
        checked += 1;
    }
    assert!(checked > 400);
}

#[test]
fn contour_misuse_is_an_error() {
    let mut geometry = Geometry::new();
    assert_eq!(
        geometry.cubic_to(
            Point::new(1., 1.),
            Point::new(2., 2.),
            Point::new(3., 0.),
            Vec2::ZERO
        ),
        Err(Error::NoOpenContour("cubic_to"))
    );
    assert_eq!(
        geometry.close_contour(),
        Err(Error::NoOpenContour("close_contour"))
    );
    geometry.begin_contour(Point::ZERO).unwrap();
    assert_eq!(
        geometry.begin_contour(Point::ZERO),
        Err(Error::ContourAlreadyOpen)
    );
    assert!(geometry.end_contour().is_ok());
    assert!(geometry.end_contour().is_err());
}

#[test]
fn failed_allocation_skips_the_draw() {
    let mut view = GeometryView::default();
    view.set_render_pass(RenderPass::CubicHulls);
    let mut backend = Recording::new().with_budget(0);
    assert_eq!(view.draw(&mut backend), DrawOutcome::AllocationFailed);
    assert!(backend.commands.is_empty());

    let geometry = Geometry::new();
    let instances = pack_instances(RenderPass::TriangleHulls, &geometry, &Config::default());
    let mut backend = Recording::new();
    assert_eq!(
        ccpr_geometry::backend::draw_instances(
            &mut backend,
            RenderPass::TriangleHulls,
            &instances,
            &Config::default()
        ),
        DrawOutcome::Empty
    );
    assert!(backend.commands.is_empty());
}

#[test]
fn every_pass_packs_its_layout() {
    let mut view = GeometryView::default();
    for pass in RenderPass::ALL {
        view.set_render_pass(pass);
        let instances = view.instances();
        assert!(instances.count(pass) > 0, "{pass}");
        if pass.is_cubic() {
            assert!(instances.triangles.is_empty());
        } else {
            assert!(instances.cubics.is_empty());
        }
    }
}

static_assertions::assert_impl_all!(Geometry: Send, Sync);
static_assertions::assert_impl_all!(GeometryView: Send, Sync);
static_assertions::assert_impl_all!(CubicKlm: Send, Sync);
