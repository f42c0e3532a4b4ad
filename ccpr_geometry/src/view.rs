// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State of an interactive visualizer for the coverage processor's geometry.
//!
//! A [`GeometryView`] holds four control points and a [`RenderPass`]. Depending on the pass,
//! the points describe a triangle (points 0, 1 and 3), a quadratic (control point 1) or a
//! cubic. Every change re-runs the classifier and the decomposer and repacks the instances.

use log::{info, warn};
use peniko::kurbo::{BezPath, Line, Point, Vec2};

use crate::backend::{draw_instances, Backend, DrawOutcome};
use crate::classify::{CubicKlm, CubicType};
use crate::geometry::{Geometry, PrimitiveTallies};
use crate::instance::Instances;
use crate::{Config, RenderPass};

/// The points a fresh view starts with.
pub const DEFAULT_POINTS: [Point; 4] = [
    Point::new(100.05, 100.05),
    Point::new(400.75, 100.05),
    Point::new(400.75, 300.95),
    Point::new(100.05, 300.95),
];

/// How close, on each axis, a click has to be to grab a point.
pub const HIT_RADIUS: f64 = 20.0;

/// What a drag moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragTarget {
    /// One control point, by index.
    Point(usize),
    All,
}

#[derive(Clone, Debug)]
pub struct GeometryView {
    points: [Point; 4],
    pass: RenderPass,
    config: Config,
    klm: Option<CubicKlm>,
    geometry: Geometry,
    tallies: PrimitiveTallies,
    instances: Instances,
}

impl Default for GeometryView {
    fn default() -> Self {
        Self::new(Config::debug())
    }
}

impl GeometryView {
    pub fn new(config: Config) -> Self {
        let mut view = Self {
            points: DEFAULT_POINTS,
            pass: RenderPass::default(),
            config,
            klm: None,
            geometry: Geometry::new(),
            tallies: PrimitiveTallies::default(),
            instances: Instances::default(),
        };
        view.update();
        view
    }

    pub fn points(&self) -> [Point; 4] {
        self.points
    }

    pub fn render_pass(&self) -> RenderPass {
        self.pass
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The classified cubic, in cubic passes.
    pub fn cubic_klm(&self) -> Option<&CubicKlm> {
        self.klm.as_ref()
    }

    pub fn cubic_type(&self) -> Option<CubicType> {
        self.klm.as_ref().map(CubicKlm::cubic_type)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn tallies(&self) -> PrimitiveTallies {
        self.tallies
    }

    pub fn instances(&self) -> &Instances {
        &self.instances
    }

    pub fn set_points(&mut self, points: [Point; 4]) {
        self.points = points;
        self.update();
    }

    pub fn set_render_pass(&mut self, pass: RenderPass) {
        self.pass = pass;
        self.update();
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
        self.update();
    }

    /// The points the current pass uses, with their indices.
    ///
    /// Point 2 only matters to cubic passes.
    pub fn active_points(&self) -> impl Iterator<Item = (usize, Point)> + '_ {
        let cubic = self.pass.is_cubic();
        self.points
            .iter()
            .copied()
            .enumerate()
            .filter(move |(i, _)| cubic || *i != 2)
    }

    /// Finds the point under `(x, y)`, or drags everything if there is none.
    pub fn find_drag_target(&self, x: f64, y: f64) -> DragTarget {
        self.active_points()
            .find(|(_, p)| (x - p.x).abs() < HIT_RADIUS && (y - p.y).abs() < HIT_RADIUS)
            .map_or(DragTarget::All, |(i, _)| DragTarget::Point(i))
    }

    pub fn drag(&mut self, target: DragTarget, delta: Vec2) {
        match target {
            DragTarget::Point(i) => {
                let Some(point) = self.points.get_mut(i) else {
                    warn!("No control point {i} to drag");
                    return;
                };
                *point += delta;
            }
            DragTarget::All => {
                for point in &mut self.points {
                    *point += delta;
                }
            }
        }
        self.update();
    }

    /// Handles a key press: `'1'` to `'7'` select a pass and `'D'` logs the points.
    ///
    /// Returns `false` for keys the view does not use.
    pub fn handle_key(&mut self, key: char) -> bool {
        if let Some(pass) = RenderPass::from_key(key) {
            self.set_render_pass(pass);
            return true;
        }
        if key == 'D' {
            info!("\n{}", self.dump_points());
            return true;
        }
        false
    }

    /// The outline the current pass draws.
    pub fn outline(&self) -> BezPath {
        let [p0, p1, p2, p3] = self.points;
        let mut outline = BezPath::new();
        outline.move_to(p0);
        if self.pass.is_cubic() {
            outline.curve_to(p1, p2, p3);
        } else if self.pass.is_quadratic() {
            outline.quad_to(p1, p3);
        } else {
            outline.line_to(p1);
            outline.line_to(p3);
            outline.close_path();
        }
        outline
    }

    /// A one-line description of what is shown.
    ///
    /// Without a GPU backend there is nothing to visualize, which the caption says instead.
    pub fn caption(&self, gpu_available: bool) -> String {
        if !gpu_available {
            return "Use GPU backend to visualize geometry.".to_owned();
        }
        match self.cubic_type() {
            Some(cubic_type) => format!("RenderPass_{} ({cubic_type})", self.pass),
            None => format!("RenderPass_{}", self.pass),
        }
    }

    /// The control points as a Rust array, for reproducing the scene.
    pub fn dump_points(&self) -> String {
        let mut dump = String::from("let points = [\n");
        for p in self.points {
            dump.push_str(&format!("    Point::new({:?}, {:?}),\n", p.x, p.y));
        }
        dump.push_str("];");
        dump
    }

    /// The zero lines of the K, L and M functionals across a `width` by `height` view.
    ///
    /// Only cubic passes have functionals.
    pub fn klm_lines(&self, width: f64, height: f64) -> [Option<Line>; 3] {
        match &self.klm {
            Some(klm) => klm.klm.0.map(|line| klm_line_segment(line, width, height)),
            None => [None; 3],
        }
    }

    /// Uploads and draws the instances of the current pass.
    pub fn draw<B: Backend + ?Sized>(&self, backend: &mut B) -> DrawOutcome {
        draw_instances(backend, self.pass, &self.instances, &self.config)
    }

    fn update(&mut self) {
        self.klm = self.pass.is_cubic().then(|| CubicKlm::new(&self.points));
        self.geometry.clear();
        self.instances.clear();
        let outline = self.outline();
        let tolerance = self.pass.split_tolerance(&self.config);
        match self.geometry.replay(outline, tolerance) {
            Ok(tallies) => self.tallies = tallies,
            Err(err) => {
                warn!("Failed to decompose outline: {err}");
                self.tallies = PrimitiveTallies::default();
            }
        }
        self.instances
            .extend_from(self.pass, &self.geometry, &self.config);
        log::trace!(
            "{} instances for {}",
            self.instances.count(self.pass),
            self.pass
        );
    }
}

/// Clips the line `a·x + b·y + c = 0` to a `width` by `height` view.
///
/// Lines closer to horizontal run between the left and right edges, the others between the
/// top and bottom edges. Returns `None` if the line is degenerate.
pub fn klm_line_segment(line: [f64; 3], width: f64, height: f64) -> Option<Line> {
    let [a, b, c] = line;
    if b.abs() > a.abs() {
        Some(Line::new((0.0, -c / b), (width, (-c - width * a) / b)))
    } else if a != 0.0 {
        Some(Line::new((-c / a, 0.0), ((-c - height * b) / a, height)))
    } else {
        None
    }
}
