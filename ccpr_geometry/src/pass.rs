// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render passes of the coverage processor.

use core::fmt;
use core::str::FromStr;

use peniko::kurbo::Vec2;
use thiserror::Error;

use crate::Config;

/// The kind of primitive a pass draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Triangles,
    Quadratics,
    Cubics,
}

/// The instance record a pass consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstanceLayout {
    /// [`TriangleInstance`](crate::TriangleInstance).
    Triangle,
    /// [`CubicInstance`](crate::CubicInstance).
    Cubic,
}

/// Which part of a primitive's bloated geometry a pass rasterizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The conservative hull around the whole primitive.
    Hulls,
    /// The bloated edges of a triangle.
    Edges,
    /// The regions around the corner vertices.
    Corners,
}

/// A pass of the coverage processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderPass {
    #[default]
    TriangleHulls,
    TriangleEdges,
    TriangleCorners,
    QuadraticHulls,
    QuadraticCorners,
    CubicHulls,
    CubicCorners,
}

impl RenderPass {
    /// Every pass, in key order.
    pub const ALL: [Self; 7] = [
        Self::TriangleHulls,
        Self::TriangleEdges,
        Self::TriangleCorners,
        Self::QuadraticHulls,
        Self::QuadraticCorners,
        Self::CubicHulls,
        Self::CubicCorners,
    ];

    /// Selects a pass with the keys `'1'` to `'7'`.
    pub fn from_key(key: char) -> Option<Self> {
        let index = key.to_digit(10)?.checked_sub(1)?;
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }

    /// The key that selects this pass.
    pub const fn key(self) -> char {
        match self {
            Self::TriangleHulls => '1',
            Self::TriangleEdges => '2',
            Self::TriangleCorners => '3',
            Self::QuadraticHulls => '4',
            Self::QuadraticCorners => '5',
            Self::CubicHulls => '6',
            Self::CubicCorners => '7',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::TriangleHulls => "TriangleHulls",
            Self::TriangleEdges => "TriangleEdges",
            Self::TriangleCorners => "TriangleCorners",
            Self::QuadraticHulls => "QuadraticHulls",
            Self::QuadraticCorners => "QuadraticCorners",
            Self::CubicHulls => "CubicHulls",
            Self::CubicCorners => "CubicCorners",
        }
    }

    pub const fn primitive(self) -> PrimitiveKind {
        match self {
            Self::TriangleHulls | Self::TriangleEdges | Self::TriangleCorners => {
                PrimitiveKind::Triangles
            }
            Self::QuadraticHulls | Self::QuadraticCorners => PrimitiveKind::Quadratics,
            Self::CubicHulls | Self::CubicCorners => PrimitiveKind::Cubics,
        }
    }

    /// Quadratics are drawn from their control triangle, so only cubic passes use cubic
    /// records.
    pub const fn layout(self) -> InstanceLayout {
        match self.primitive() {
            PrimitiveKind::Cubics => InstanceLayout::Cubic,
            PrimitiveKind::Triangles | PrimitiveKind::Quadratics => InstanceLayout::Triangle,
        }
    }

    pub const fn stage(self) -> Stage {
        match self {
            Self::TriangleHulls | Self::QuadraticHulls | Self::CubicHulls => Stage::Hulls,
            Self::TriangleEdges => Stage::Edges,
            Self::TriangleCorners | Self::QuadraticCorners | Self::CubicCorners => Stage::Corners,
        }
    }

    pub const fn is_triangles(self) -> bool {
        matches!(self.primitive(), PrimitiveKind::Triangles)
    }

    pub const fn is_quadratic(self) -> bool {
        matches!(self.primitive(), PrimitiveKind::Quadratics)
    }

    pub const fn is_cubic(self) -> bool {
        matches!(self.primitive(), PrimitiveKind::Cubics)
    }

    /// The pixel tolerance for splitting cubics drawn by this pass.
    ///
    /// Only cubic passes split cubics; the other passes never see one.
    pub fn split_tolerance(self, config: &Config) -> Vec2 {
        if self.is_cubic() {
            config.cubic_tolerance()
        } else {
            Vec2::ZERO
        }
    }
}

impl fmt::Display for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The error returned when a string names no [`RenderPass`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown render pass `{0}`, expected a key from 1 to 7 or a pass name")]
pub struct ParseRenderPassError(String);

impl FromStr for RenderPass {
    type Err = ParseRenderPassError;

    /// Parses a key (`"1"` to `"7"`) or a pass name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(key), None) = (chars.next(), chars.next()) {
            if let Some(pass) = Self::from_key(key) {
                return Ok(pass);
            }
        }
        Self::ALL
            .into_iter()
            .find(|pass| pass.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseRenderPassError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for pass in RenderPass::ALL {
            assert_eq!(RenderPass::from_key(pass.key()), Some(pass));
        }
        assert_eq!(RenderPass::from_key('0'), None);
        assert_eq!(RenderPass::from_key('8'), None);
        assert_eq!(RenderPass::from_key('D'), None);
    }

    #[test]
    fn kinds() {
        assert!(RenderPass::TriangleEdges.is_triangles());
        assert_eq!(RenderPass::TriangleEdges.stage(), Stage::Edges);
        assert!(RenderPass::QuadraticCorners.is_quadratic());
        assert_eq!(
            RenderPass::QuadraticCorners.layout(),
            InstanceLayout::Triangle
        );
        assert!(RenderPass::CubicHulls.is_cubic());
        assert_eq!(RenderPass::CubicHulls.layout(), InstanceLayout::Cubic);
    }

    #[test]
    fn split_tolerance() {
        let config = Config::debug();
        assert_eq!(
            RenderPass::CubicCorners.split_tolerance(&config),
            Vec2::new(20., 20.)
        );
        assert_eq!(RenderPass::QuadraticHulls.split_tolerance(&config), Vec2::ZERO);
    }

    #[test]
    fn parse() {
        assert_eq!("6".parse::<RenderPass>(), Ok(RenderPass::CubicHulls));
        assert_eq!("triangleCorners".parse::<RenderPass>(), Ok(RenderPass::TriangleCorners));
        assert_eq!(
            "CubicCorners".parse::<RenderPass>().map(|p| p.to_string()),
            Ok("CubicCorners".to_owned())
        );
        assert!("9".parse::<RenderPass>().is_err());
        assert!("Hulls".parse::<RenderPass>().is_err());
    }
}
