use core::fmt;

use crate::{
    predicates::{approx_eq, squared_distance},
    utils::types::Point2,
};

/// The circumscribed circle of a triangle.
///
/// Aligned points have no circumcircle. They get the degenerate circle, with a `NaN` center and a zero radius,
/// which never contains any point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point2,
    pub squared_radius: f32,
}

impl Circle {
    pub const DEGENERATE: Circle = Circle {
        center: [f32::NAN, f32::NAN],
        squared_radius: 0.0,
    };

    /// Compute the circle through `a`, `b` and `c`.
    ///
    /// Intersects the perpendicular bisectors of `ab` and `bc` via their slopes.
    /// A (nearly) horizontal side has no finite bisector slope, so its bisector is the vertical line through the
    /// side's midpoint instead.
    pub fn circumscribe(a: &Point2, b: &Point2, c: &Point2) -> Self {
        let [x1, y1] = *a;
        let [x2, y2] = *b;
        let [x3, y3] = *c;

        let flat_ab = approx_eq(y1, y2);
        let flat_bc = approx_eq(y2, y3);

        if flat_ab && flat_bc {
            return Self::DEGENERATE;
        }

        let (xc, yc) = if flat_ab {
            let m2 = -(x3 - x2) / (y3 - y2);
            let mx2 = (x2 + x3) / 2.0;
            let my2 = (y2 + y3) / 2.0;
            let xc = (x2 + x1) / 2.0;
            (xc, m2 * (xc - mx2) + my2)
        } else if flat_bc {
            let m1 = -(x2 - x1) / (y2 - y1);
            let mx1 = (x1 + x2) / 2.0;
            let my1 = (y1 + y2) / 2.0;
            let xc = (x3 + x2) / 2.0;
            (xc, m1 * (xc - mx1) + my1)
        } else {
            let m1 = -(x2 - x1) / (y2 - y1);
            let m2 = -(x3 - x2) / (y3 - y2);

            // parallel bisectors, i.e. aligned points
            if approx_eq(m1, m2) {
                return Self::DEGENERATE;
            }

            let mx1 = (x1 + x2) / 2.0;
            let mx2 = (x2 + x3) / 2.0;
            let my1 = (y1 + y2) / 2.0;
            let my2 = (y2 + y3) / 2.0;
            let xc = (m1 * mx1 - m2 * mx2 + my2 - my1) / (m1 - m2);

            // evaluate on the bisector of the steeper side, it has the smaller slope
            let yc = if (y1 - y2).abs() > (y2 - y3).abs() {
                m1 * (xc - mx1) + my1
            } else {
                m2 * (xc - mx2) + my2
            };
            (xc, yc)
        };

        let center = [xc, yc];

        Self {
            center,
            squared_radius: squared_distance(b, &center),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.squared_radius <= 0.0 || self.center[0].is_nan() || self.center[1].is_nan()
    }

    /// Check if `p` lies inside or on the circle.
    pub fn contains(&self, p: &Point2) -> bool {
        if self.squared_radius <= 0.0 {
            return false;
        }
        squared_distance(p, &self.center) <= self.squared_radius
    }

    /// Check if `p` lies inside the circle, shrunk by a relative `tolerance` on the squared radius.
    ///
    /// Points on the circle up to rounding are not contained, e.g. the fourth corner of a square.
    pub fn contains_strictly(&self, p: &Point2, tolerance: f32) -> bool {
        if self.squared_radius <= 0.0 {
            return false;
        }
        squared_distance(p, &self.center) < self.squared_radius * (1.0 - tolerance)
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circle [{:.3}, {:.3}] r²={:.3}",
            self.center[0], self.center[1], self.squared_radius
        )
    }
}
