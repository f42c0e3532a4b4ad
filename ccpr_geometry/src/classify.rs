// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classification of cubic Béziers and their implicit (KLM) form.
//!
//! The classifier follows Loop and Blinn's "Resolution Independent Curve Rendering using
//! Programmable Graphics Hardware": the inflection function of a cubic in homogeneous
//! parameter space `(t, s)` is `I(t, s) = t³·D1 - 3t²s·D2 + 3ts²·D3`, up to sign conventions,
//! and the discriminant of its quadratic part decides the shape of the curve. The roots of
//! the same function are the parameters at which a coverage counting rasterizer has to split
//! the curve.

use core::fmt;

use peniko::kurbo::Point;

/// Components of the inflection function below this fraction of the squared extent of the
/// control polygon are treated as zero.
const DEGENERACY_EPSILON: f64 = 1e-9;

/// The topological type of a cubic Bézier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubicType {
    /// Two distinct real inflection points.
    Serpentine,
    /// A self-intersection (double point).
    Loop,
    /// A cusp at a finite parameter, where both inflection roots coincide.
    LocalCusp,
    /// A cusp at infinity: a single finite inflection point, with the repeated root at `s = 0`.
    Cusp,
    /// The cubic is a degree elevated quadratic.
    QuadraticDegenerate,
    /// The control points are collinear (or coincident).
    LineDegenerate,
}

impl CubicType {
    /// The name of the type, as shown in captions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Serpentine => "Serpentine",
            Self::Loop => "Loop",
            Self::LocalCusp => "LocalCusp",
            Self::Cusp => "Cusp",
            Self::QuadraticDegenerate => "Quadratic",
            Self::LineDegenerate => "Line",
        }
    }

    /// Returns `true` if the curve really needs cubic evaluation.
    pub const fn is_cubic(self) -> bool {
        !matches!(self, Self::QuadraticDegenerate | Self::LineDegenerate)
    }
}

impl fmt::Display for CubicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A root of the inflection function in homogeneous parameter space.
///
/// The root sits at the parameter `t / s`. A pair with `s == 0` is a root at infinity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RootPair {
    pub t: f64,
    pub s: f64,
}

impl RootPair {
    /// The curve parameter of this root, or `None` if the root is at infinity.
    pub fn param(self) -> Option<f64> {
        (self.s != 0.0).then(|| self.t / self.s)
    }

    /// The linear factor `s·T - t·S` of the inflection function that vanishes at this root,
    /// as coefficients of `[T, S]`.
    fn factor(self) -> [f64; 2] {
        [self.s, -self.t]
    }
}

/// The result of [`classify_cubic`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub cubic_type: CubicType,
    /// The roots, ordered so that `t0/s0 <= t1/s1`.
    ///
    /// The signs of the second pair are chosen so that the implicit function is positive on
    /// the left side of the curve.
    pub roots: [RootPair; 2],
    /// The inflection function coefficients `[D1, D2, D3]`, rescaled so the largest
    /// magnitude lies in `[1, 2)`.
    pub d: [f64; 3],
}

impl Classification {
    /// The finite root parameters that lie strictly inside `(0, 1)`, in ascending order.
    ///
    /// These are the inflections of a serpentine, the double point parameters of a loop or
    /// the cusp of a cusped curve.
    pub fn interior_roots(&self) -> impl Iterator<Item = f64> + '_ {
        let count = match self.cubic_type {
            CubicType::LocalCusp | CubicType::Cusp => 1,
            CubicType::Serpentine | CubicType::Loop => 2,
            _ => 0,
        };
        self.roots[..count]
            .iter()
            .filter_map(|root| root.param())
            .filter(|t| *t > 0.0 && *t < 1.0)
    }
}

/// Classifies a cubic Bézier by the shape of its inflection function.
///
/// This never fails; degenerate input is reported as [`CubicType::QuadraticDegenerate`] or
/// [`CubicType::LineDegenerate`].
pub fn classify_cubic(points: &[Point; 4]) -> Classification {
    // The inflection function only depends on the shape of the curve, so work relative to
    // the first point.
    let origin = points[0].to_vec2();
    let [p0, p1, p2, p3] = points.map(|p| p - origin);
    let a1 = dot_cross(p0, p3, p2);
    let a2 = dot_cross(p1, p0, p3);
    let a3 = dot_cross(p2, p1, p0);

    let d3 = 3.0 * a3;
    let d2 = d3 - a2;
    let d1 = d2 - a2 + a1;

    let scale = [p1, p2, p3]
        .iter()
        .fold(0.0_f64, |acc, p| acc.max(p.x.abs()).max(p.y.abs()));
    let tolerance = DEGENERACY_EPSILON * scale * scale;
    let mut d = [d1, d2, d3].map(|v| if v.abs() <= tolerance { 0.0 } else { v });
    let max = d.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max > 0.0 && max.is_finite() {
        let norm = previous_inverse_pow2(max);
        d = d.map(|v| v * norm);
    }
    let [d1, d2, d3] = d;

    let (cubic_type, roots) = if d1 != 0.0 {
        let discr = 3.0 * d2 * d2 - 4.0 * d1 * d3;
        if discr > 0.0 {
            let q = 3.0 * d2 + (3.0 * discr).sqrt().copysign(d2);
            (CubicType::Serpentine, oriented_roots(q, 6.0 * d1, 2.0 * d3, q))
        } else if discr < 0.0 {
            let q = d2 + (-discr).sqrt().copysign(d2);
            (
                CubicType::Loop,
                oriented_roots(q, 2.0 * d1, 2.0 * (d2 * d2 - d3 * d1), d1 * q),
            )
        } else {
            (CubicType::LocalCusp, oriented_roots(d2, 2.0 * d1, d2, 2.0 * d1))
        }
    } else if d2 != 0.0 {
        (CubicType::Cusp, oriented_roots(d3, 3.0 * d2, 1.0, 0.0))
    } else if d3 != 0.0 {
        (CubicType::QuadraticDegenerate, oriented_roots(1.0, 0.0, 1.0, 0.0))
    } else {
        (CubicType::LineDegenerate, oriented_roots(1.0, 0.0, 1.0, 0.0))
    };

    Classification {
        cubic_type,
        roots,
        d,
    }
}

/// The determinant of the homogeneous points `[p0, 1]`, `[p1, 1]` and `[p2, 1]`.
fn dot_cross(p0: Point, p1: Point, p2: Point) -> f64 {
    let x = p0.x * (p1.y - p2.y);
    let y = p0.y * (p2.x - p1.x);
    let w = p1.x * p2.y - p1.y * p2.x;
    x + y + w
}

/// Returns the power of two that, multiplied with `n`, lands in `[1, 2)`.
///
/// Only the exponent bits are touched, so the scaling is exact.
fn previous_inverse_pow2(n: f64) -> f64 {
    let bits = 0x7FEF_FFFF_FFFF_FFFF_u64.wrapping_sub(n.to_bits());
    f64::from_bits(bits & (0x7FF << 52))
}

/// Orients the second root so the implicit function is positive on the left of the curve,
/// then orders both roots by parameter.
fn oriented_roots(t0: f64, s0: f64, t1: f64, s1: f64) -> [RootPair; 2] {
    let first = RootPair { t: t0, s: s0 };
    let second = RootPair {
        t: -t1.copysign(t1 * s1),
        s: -s1.abs(),
    };
    if second.s.copysign(first.s) * first.t > -first.s.abs() * second.t {
        [second, first]
    } else {
        [first, second]
    }
}

/// Three linear functionals over the homogeneous screen point `[x, y, 1]`.
///
/// For a point on the curve the functionals satisfy `k³ - l·m = 0`; the sign of that
/// expression tells a fragment stage which side of the curve it is on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KlmMatrix(pub [[f64; 3]; 3]);

impl KlmMatrix {
    pub fn k(&self) -> [f64; 3] {
        self.0[0]
    }

    pub fn l(&self) -> [f64; 3] {
        self.0[1]
    }

    pub fn m(&self) -> [f64; 3] {
        self.0[2]
    }

    /// Evaluates the three functionals at `p`.
    pub fn eval(&self, p: Point) -> [f64; 3] {
        self.0.map(|[a, b, c]| a * p.x + b * p.y + c)
    }

    /// Evaluates the implicit function `k³ - l·m` at `p`.
    pub fn implicit(&self, p: Point) -> f64 {
        let [k, l, m] = self.eval(p);
        k * k * k - l * m
    }

    /// The matrix narrowed to `f32`, the precision a fragment stage evaluates it in.
    pub fn to_f32(&self) -> [[f32; 3]; 3] {
        self.0.map(|row| row.map(|v| v as f32))
    }
}

/// A classified cubic together with its KLM functionals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicKlm {
    pub classification: Classification,
    pub klm: KlmMatrix,
}

impl CubicKlm {
    /// Classifies the cubic and computes its KLM functionals in screen space.
    ///
    /// A cubic whose hull cannot be inverted is reported as [`CubicType::LineDegenerate`],
    /// with `K = L = 0` and `M = -1`, so its implicit function is zero everywhere.
    pub fn new(points: &[Point; 4]) -> Self {
        let classification = classify_cubic(points);
        let cubic_type = classification.cubic_type;
        if cubic_type == CubicType::LineDegenerate {
            return Self::line(classification);
        }

        // Parameter-space functionals as coefficients of [t³, t²s, ts², s³].
        const S: [f64; 2] = [0.0, 1.0];
        const T: [f64; 2] = [1.0, 0.0];
        let [l, m] = classification.roots.map(RootPair::factor);
        let functionals = match cubic_type {
            CubicType::Serpentine | CubicType::LocalCusp => {
                [product(l, m, S), product(l, l, l), product(m, m, m)]
            }
            CubicType::Loop => [product(l, m, S), product(l, l, m), product(l, m, m)],
            CubicType::Cusp => [product(l, S, S), product(l, l, l), product(S, S, S)],
            CubicType::QuadraticDegenerate | CubicType::LineDegenerate => {
                [product(T, S, S), product(T, T, S), product(T, S, S)]
            }
        };

        let (x, y) = power_basis(points);
        let rows = if cubic_type == CubicType::QuadraticDegenerate {
            // The cubic term vanishes, so the t³ row carries no information.
            [1, 2, 3]
        } else {
            let det1 = x[0] * y[1] - y[0] * x[1];
            let det2 = x[0] * y[2] - y[0] * x[2];
            if det2.abs() > det1.abs() {
                [0, 2, 3]
            } else {
                [0, 1, 3]
            }
        };
        let hull = rows.map(|r| [x[r], y[r], if r == 3 { 1.0 } else { 0.0 }]);
        let Some(inverse) = invert(hull) else {
            return Self::line(classification);
        };

        let mut klm = [[0.0; 3]; 3];
        for (c, row) in klm.iter_mut().enumerate() {
            for (i, out) in row.iter_mut().enumerate() {
                *out = (0..3)
                    .map(|j| inverse[i][j] * functionals[c][rows[j]])
                    .sum();
            }
        }
        if klm.iter().flatten().any(|v| !v.is_finite()) {
            return Self::line(classification);
        }
        Self {
            classification,
            klm: KlmMatrix(klm),
        }
    }

    fn line(classification: Classification) -> Self {
        Self {
            classification: Classification {
                cubic_type: CubicType::LineDegenerate,
                ..classification
            },
            klm: KlmMatrix([[0.0; 3], [0.0; 3], [0.0, 0.0, -1.0]]),
        }
    }

    pub fn cubic_type(&self) -> CubicType {
        self.classification.cubic_type
    }
}

/// Multiplies three linear forms in `(t, s)`.
///
/// The result holds the coefficients of `[t³, t²s, ts², s³]`.
fn product(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> [f64; 4] {
    let ab = [a[0] * b[0], a[0] * b[1] + a[1] * b[0], a[1] * b[1]];
    [
        ab[0] * c[0],
        ab[0] * c[1] + ab[1] * c[0],
        ab[1] * c[1] + ab[2] * c[0],
        ab[2] * c[1],
    ]
}

/// The power basis coefficients of the cubic for rows `[t³, t²s, ts², s³]`.
fn power_basis(points: &[Point; 4]) -> ([f64; 4], [f64; 4]) {
    let [p0, p1, p2, p3] = *points;
    let basis = |a: f64, b: f64, c: f64, d: f64| {
        [
            -a + 3.0 * b - 3.0 * c + d,
            3.0 * a - 6.0 * b + 3.0 * c,
            -3.0 * a + 3.0 * b,
            a,
        ]
    };
    (
        basis(p0.x, p1.x, p2.x, p3.x),
        basis(p0.y, p1.y, p2.y, p3.y),
    )
}

fn invert(m: [[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let [[a, b, c], [d, e, f], [g, h, i]] = m;
    let co_a = e * i - f * h;
    let co_b = -(d * i - f * g);
    let co_c = d * h - e * g;
    let det = a * co_a + b * co_b + c * co_c;
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let adjugate = [
        [co_a, -(b * i - c * h), b * f - c * e],
        [co_b, a * i - c * g, -(a * f - c * d)],
        [co_c, -(a * h - b * g), a * e - b * d],
    ];
    Some(adjugate.map(|row| row.map(|v| v / det)))
}
