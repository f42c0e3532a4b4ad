// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parameters shared by decomposition, packing and drawing.

use peniko::kurbo::Vec2;

/// The anti-aliasing radius of coverage counted rendering, in pixels.
pub const AA_BLOAT: f64 = 0.5;

/// The exaggerated radius used to visualize hulls and corners.
pub const DEBUG_BLOAT: f64 = 40.0;

/// Options for turning geometry into instances and drawing them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// How far, in pixels, hull and corner primitives are expanded by the coverage processor.
    ///
    /// Cubic passes also use half of this as the split tolerance, since pieces smaller than
    /// the bloat radius are swallowed by their neighbours' bloat.
    pub bloat: f64,

    /// Offset added to every point when instances are packed.
    pub bias: Vec2,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bloat: AA_BLOAT,
            bias: Vec2::ZERO,
        }
    }
}

impl Config {
    /// The configuration used to visualize the geometry, with [`DEBUG_BLOAT`].
    pub fn debug() -> Self {
        Self {
            bloat: DEBUG_BLOAT,
            ..Self::default()
        }
    }

    pub fn with_bloat(mut self, bloat: f64) -> Self {
        self.bloat = bloat;
        self
    }

    pub fn with_bias(mut self, bias: Vec2) -> Self {
        self.bias = bias;
        self
    }

    /// The pixel tolerance passed to [`Geometry::cubic_to`](crate::Geometry::cubic_to).
    pub fn cubic_tolerance(&self) -> Vec2 {
        let half = self.bloat.max(0.0) * 0.5;
        Vec2::new(half, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_tolerance_is_half_the_bloat() {
        assert_eq!(Config::default().cubic_tolerance(), Vec2::new(0.25, 0.25));
        assert_eq!(Config::debug().cubic_tolerance(), Vec2::new(20., 20.));
        assert_eq!(Config::default().with_bloat(-3.).cubic_tolerance(), Vec2::ZERO);
    }

    #[test]
    fn builders() {
        let config = Config::debug().with_bias(Vec2::new(0.5, -0.5));
        assert_eq!(config.bloat, DEBUG_BLOAT);
        assert_eq!(config.bias, Vec2::new(0.5, -0.5));
    }
}
