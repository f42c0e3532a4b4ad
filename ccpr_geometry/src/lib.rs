// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU-side geometry for coverage counted path rendering (CCPR).
//!
//! A coverage counting rasterizer integrates signed coverage along the edges of a path. That
//! integration is only unambiguous when every curved edge is monotonic, so this crate turns
//! path contours into monotonic primitives and packs them into fixed-size GPU instance records.
//!
//! # Contents
//!
//! - [`classify`]: classification of cubic Béziers (serpentine, loop, cusp, ...) and the KLM
//!   functionals that let a fragment stage evaluate a cubic's implicit function.
//! - [`geometry`]: the contour decomposer, which emits a verb stream over a flat point buffer,
//!   splitting curves at their inflections, loop intersections and extrema.
//! - [`instance`]: packing of decomposed contours into triangle and cubic instance records.
//! - [`pass`]: the render passes a coverage processor knows how to draw.
//! - [`backend`]: the narrow contract with the rendering backend that uploads and draws
//!   instances, plus a command [`Recording`](backend::Recording).
//! - [`view`]: the interactive state of a geometry visualizer (four control points and a pass).
//!
//! # Example
//!
//! ```
//! use ccpr_geometry::geometry::{Geometry, Verb};
//! use ccpr_geometry::kurbo::{Point, Vec2};
//!
//! let mut geometry = Geometry::new();
//! geometry.begin_contour(Point::new(100., 100.))?;
//! geometry.cubic_to(
//!     Point::new(400., 100.),
//!     Point::new(400., 300.),
//!     Point::new(100., 300.),
//!     Vec2::new(0.25, 0.25),
//! )?;
//! geometry.end_contour()?;
//!
//! let cubics = geometry
//!     .verbs()
//!     .iter()
//!     .filter(|verb| **verb == Verb::MonotonicCubicTo)
//!     .count();
//! assert_eq!(cubics, 2);
//! # Ok::<(), ccpr_geometry::Error>(())
//! ```

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]

pub mod backend;
pub mod classify;
pub mod config;
pub mod geometry;
pub mod instance;
pub mod math;
pub mod pass;
pub mod view;

/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;

pub use classify::{classify_cubic, Classification, CubicKlm, CubicType, KlmMatrix, RootPair};
pub use config::Config;
pub use geometry::{Geometry, PrimitiveTallies, Segment, Verb};
pub use instance::{pack_instances, CubicInstance, Instances, TriangleInstance};
pub use pass::RenderPass;

use thiserror::Error;

/// Errors that can occur while building contour geometry.
///
/// Degenerate input never produces an error; only calls that violate the contour state machine
/// do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A segment or the end of a contour was requested while no contour was open.
    #[error("`{0}` requires an open contour, call `begin_contour` first")]
    NoOpenContour(&'static str),
    /// `begin_contour` was called while a contour was already open.
    #[error("a contour is already open, call `end_contour` before beginning another")]
    ContourAlreadyOpen,
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
