// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path geometry: from two anchor rectangles to a drawable curve.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _; // for `abs`, `round`, `atan2`
use kurbo::{BezPath, CubicBez, ParamCurve, ParamCurveDeriv, Point, Rect, Vec2};

/// Below this squared length a tangent is treated as degenerate.
const TANGENT_EPSILON: f64 = 1e-12;

/// Inputs to a [`PathRenderer`] besides the two rectangles.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathParams {
    /// Length of the control arms relative to the distance along the main axis.
    pub curviness: f64,
    /// Round every emitted coordinate to an integer.
    pub only_integer_coords: bool,
}

/// Result of laying out one connector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathGeometry {
    /// The connector curve.
    pub curve: CubicBez,
    /// Where a label is anchored.
    pub midpoint: Point,
    /// Direction of travel at the end point, in radians. Arrowheads follow it.
    pub orientation: f64,
}

impl PathGeometry {
    /// Start point of the curve.
    #[must_use]
    pub fn start(&self) -> Point {
        self.curve.p0
    }

    /// End point of the curve.
    #[must_use]
    pub fn end(&self) -> Point {
        self.curve.p3
    }

    /// The curve as a path.
    #[must_use]
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.curve.p0);
        path.curve_to(self.curve.p1, self.curve.p2, self.curve.p3);
        path
    }
}

/// Computes connector geometry from two anchor rectangles.
///
/// Rectangles are in surface coordinates, already offset and scaled.
pub trait PathRenderer {
    /// Lays out a connector from `start` to `end`.
    fn render(&self, start: Rect, end: Rect, params: PathParams) -> PathGeometry;
}

/// Default renderer: a cubic Bezier between the facing edges of both rectangles.
///
/// The main axis is whichever of horizontal or vertical separates the centers
/// more. The curve leaves the start rectangle at the midpoint of the edge facing
/// the end rectangle and enters the end rectangle the same way, with both control
/// arms parallel to the main axis.
#[derive(Copy, Clone, Debug, Default)]
pub struct CurveRenderer;

impl PathRenderer for CurveRenderer {
    fn render(&self, start: Rect, end: Rect, params: PathParams) -> PathGeometry {
        let (a, b) = (start.center(), end.center());
        let delta = b - a;
        let horizontal = delta.x.abs() >= delta.y.abs();

        let (p0, p3) = if horizontal {
            if delta.x >= 0.0 {
                (Point::new(start.x1, a.y), Point::new(end.x0, b.y))
            } else {
                (Point::new(start.x0, a.y), Point::new(end.x1, b.y))
            }
        } else if delta.y >= 0.0 {
            (Point::new(a.x, start.y1), Point::new(b.x, end.y0))
        } else {
            (Point::new(a.x, start.y0), Point::new(b.x, end.y1))
        };

        let arm = if horizontal {
            Vec2::new((p3.x - p0.x) * params.curviness, 0.0)
        } else {
            Vec2::new(0.0, (p3.y - p0.y) * params.curviness)
        };

        let mut curve = CubicBez::new(p0, p0 + arm, p3 - arm, p3);
        if params.only_integer_coords {
            curve = CubicBez::new(
                curve.p0.round(),
                curve.p1.round(),
                curve.p2.round(),
                curve.p3.round(),
            );
        }

        let mut midpoint = curve.eval(0.5);
        if params.only_integer_coords {
            midpoint = midpoint.round();
        }

        PathGeometry {
            curve,
            midpoint,
            orientation: end_orientation(&curve),
        }
    }
}

/// Places an anchor rectangle on the surface.
///
/// `rect` and `container` are in document coordinates. The result is relative
/// to the container origin, translated by `offset` and divided by `scale`.
#[must_use]
pub fn place_rect(rect: Rect, container: Rect, offset: Vec2, scale: f64) -> Rect {
    let placed = rect - container.origin().to_vec2() + offset;
    if scale.is_finite() && scale != 0.0 && scale != 1.0 {
        placed.scale_from_origin(1.0 / scale)
    } else {
        placed
    }
}

fn end_orientation(curve: &CubicBez) -> f64 {
    let tangent = curve.deriv().eval(1.0).to_vec2();
    if tangent.hypot2() > TANGENT_EPSILON {
        tangent.atan2()
    } else {
        (curve.p3 - curve.p0).atan2()
    }
}
