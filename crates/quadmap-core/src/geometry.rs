//! Quadrilaterals and the projective map from the unit square onto them.

use quadmap_engine::coords::Vec2;

/// One of the four control points, in the fixed order every quad uses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }

    /// Texture coordinate pinned to this corner.
    #[inline]
    pub const fn uv(self) -> [f32; 2] {
        match self {
            Corner::TopLeft => [0.0, 0.0],
            Corner::TopRight => [1.0, 0.0],
            Corner::BottomRight => [1.0, 1.0],
            Corner::BottomLeft => [0.0, 1.0],
        }
    }
}

/// Four control points in canvas space, ordered TL, TR, BR, BL.
///
/// Any arrangement is allowed, including concave and self-intersecting ones.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub points: [Vec2; 4],
}

impl Quad {
    #[inline]
    pub const fn new(points: [Vec2; 4]) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle of `size` centered on `center`.
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let h = size * 0.5;
        Self::new([
            Vec2::new(center.x - h.x, center.y - h.y),
            Vec2::new(center.x + h.x, center.y - h.y),
            Vec2::new(center.x + h.x, center.y + h.y),
            Vec2::new(center.x - h.x, center.y + h.y),
        ])
    }

    #[inline]
    pub fn corner(&self, c: Corner) -> Vec2 {
        self.points[c.index()]
    }

    #[inline]
    pub fn set_corner(&mut self, c: Corner, p: Vec2) {
        self.points[c.index()] = p;
    }

    /// Arithmetic mean of the four points.
    pub fn centroid(&self) -> Vec2 {
        let sum = self.points.iter().fold(Vec2::zero(), |acc, &p| acc + p);
        sum * 0.25
    }

    /// Scales every point about the centroid.
    pub fn scaled(&self, factor: f32) -> Quad {
        let c = self.centroid();
        Quad::new(self.points.map(|p| c + (p - c) * factor))
    }

    pub fn translated(&self, delta: Vec2) -> Quad {
        Quad::new(self.points.map(|p| p + delta))
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite())
    }

    /// Even-odd point-in-polygon test over the closed outline TL→TR→BR→BL.
    ///
    /// Well defined for concave and self-intersecting quads.
    pub fn contains(&self, p: Vec2) -> bool {
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Bilinear interpolation of the corners at `(u, v)` in the unit square.
    pub fn bilinear(&self, u: f32, v: f32) -> Vec2 {
        let [tl, tr, br, bl] = self.points;
        let top = tl.lerp(tr, u);
        let bottom = bl.lerp(br, u);
        top.lerp(bottom, v)
    }
}

/// Projective map from the unit square (u right, v down) onto a quad.
///
/// ```text
/// x = (a·u + b·v + c) / W
/// y = (d·u + e·v + f) / W      W = g·u + h·v + 1
/// ```
///
/// Computed in `f64`; only the results are narrowed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Homography {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
}

impl Homography {
    /// Closed-form square-to-quad solution. `None` when the quad is degenerate
    /// (e.g. three collinear corners), which has no projective preimage.
    pub fn square_to_quad(quad: &Quad) -> Option<Homography> {
        if !quad.is_finite() {
            return None;
        }

        let [p0, p1, p2, p3] = quad.points;
        let (x0, y0) = (p0.x as f64, p0.y as f64);
        let (x1, y1) = (p1.x as f64, p1.y as f64);
        let (x2, y2) = (p2.x as f64, p2.y as f64);
        let (x3, y3) = (p3.x as f64, p3.y as f64);

        let sx = x0 - x1 + x2 - x3;
        let sy = y0 - y1 + y2 - y3;

        let (g, h) = if sx.abs() < f64::EPSILON && sy.abs() < f64::EPSILON {
            // Parallelogram: affine.
            (0.0, 0.0)
        } else {
            let dx1 = x1 - x2;
            let dx2 = x3 - x2;
            let dy1 = y1 - y2;
            let dy2 = y3 - y2;
            let det = dx1 * dy2 - dx2 * dy1;
            if det.abs() < 1e-12 {
                return None;
            }
            ((sx * dy2 - dx2 * sy) / det, (dx1 * sy - sx * dy1) / det)
        };

        let hom = Homography {
            a: x1 - x0 + g * x1,
            b: x3 - x0 + h * x3,
            c: x0,
            d: y1 - y0 + g * y1,
            e: y3 - y0 + h * y3,
            f: y0,
            g,
            h,
        };

        // Zero-area quads map the whole square onto a line.
        let jac = hom.a * hom.e - hom.b * hom.d;
        if jac.abs() < 1e-9 {
            return None;
        }

        Some(hom)
    }

    /// Homogeneous denominator at `(u, v)`.
    #[inline]
    pub fn weight(&self, u: f32, v: f32) -> f32 {
        (self.g * u as f64 + self.h * v as f64 + 1.0) as f32
    }

    /// Maps `(u, v)` to its point on the quad and the projective weight.
    pub fn map(&self, u: f32, v: f32) -> (Vec2, f32) {
        let (u, v) = (u as f64, v as f64);
        let w = self.g * u + self.h * v + 1.0;
        let x = (self.a * u + self.b * v + self.c) / w;
        let y = (self.d * u + self.e * v + self.f) / w;
        (Vec2::new(x as f32, y as f32), w as f32)
    }

    /// True when the weight is positive over the whole unit square.
    ///
    /// The weight is affine in `(u, v)`, so checking the four corners is
    /// enough; this holds exactly for convex quads.
    pub fn is_orientation_preserving(&self) -> bool {
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .all(|(u, v)| self.weight(u, v) > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    fn trapezoid() -> Quad {
        Quad::new([
            Vec2::new(-100.0, -50.0),
            Vec2::new(100.0, -80.0),
            Vec2::new(120.0, 90.0),
            Vec2::new(-90.0, 60.0),
        ])
    }

    // ── quad ──────────────────────────────────────────────────────────────

    #[test]
    fn centered_orders_corners_tl_tr_br_bl() {
        let q = Quad::centered(Vec2::new(10.0, 20.0), Vec2::new(40.0, 20.0));
        assert_eq!(q.corner(Corner::TopLeft), Vec2::new(-10.0, 10.0));
        assert_eq!(q.corner(Corner::TopRight), Vec2::new(30.0, 10.0));
        assert_eq!(q.corner(Corner::BottomRight), Vec2::new(30.0, 30.0));
        assert_eq!(q.corner(Corner::BottomLeft), Vec2::new(-10.0, 30.0));
    }

    #[test]
    fn scale_about_centroid() {
        let q = trapezoid();
        let s = q.scaled(2.0);
        assert!(approx(s.centroid(), q.centroid()));
        let c = q.centroid();
        for i in 0..4 {
            assert!(approx(s.points[i] - c, (q.points[i] - c) * 2.0));
        }
    }

    #[test]
    fn contains_convex_and_bowtie() {
        let q = Quad::centered(Vec2::zero(), Vec2::new(10.0, 10.0));
        assert!(q.contains(Vec2::new(0.0, 0.0)));
        assert!(!q.contains(Vec2::new(6.0, 0.0)));

        // TL and TR swapped: a bow-tie crossing at the center.
        let bow = Quad::new([
            Vec2::new(5.0, -5.0),
            Vec2::new(-5.0, -5.0),
            Vec2::new(5.0, 5.0),
            Vec2::new(-5.0, 5.0),
        ]);
        assert!(bow.contains(Vec2::new(0.0, -3.0)));
        assert!(!bow.contains(Vec2::new(-4.0, 0.0)));
    }

    #[test]
    fn bilinear_hits_corners() {
        let q = trapezoid();
        for c in Corner::ALL {
            let [u, v] = c.uv();
            assert!(approx(q.bilinear(u, v), q.corner(c)));
        }
    }

    // ── homography ────────────────────────────────────────────────────────

    #[test]
    fn homography_maps_unit_square_onto_corners() {
        let q = trapezoid();
        let h = Homography::square_to_quad(&q).unwrap();
        for c in Corner::ALL {
            let [u, v] = c.uv();
            let (p, _) = h.map(u, v);
            assert!(approx(p, q.corner(c)), "{c:?}: {p:?} vs {:?}", q.corner(c));
        }
    }

    #[test]
    fn rectangle_is_affine() {
        let q = Quad::centered(Vec2::new(3.0, 4.0), Vec2::new(200.0, 100.0));
        let h = Homography::square_to_quad(&q).unwrap();
        assert_eq!(h.weight(0.3, 0.9), 1.0);
        let (mid, w) = h.map(0.5, 0.5);
        assert!(approx(mid, Vec2::new(3.0, 4.0)));
        assert_eq!(w, 1.0);
    }

    #[test]
    fn convex_quad_has_positive_weights() {
        let h = Homography::square_to_quad(&trapezoid()).unwrap();
        assert!(h.is_orientation_preserving());
    }

    #[test]
    fn straight_lines_stay_straight() {
        // Points along u at fixed v land on one line in the output.
        let h = Homography::square_to_quad(&trapezoid()).unwrap();
        let (a, _) = h.map(0.0, 0.4);
        let (b, _) = h.map(0.5, 0.4);
        let (c, _) = h.map(1.0, 0.4);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        assert!(cross.abs() < 1e-2);
    }

    #[test]
    fn collapsed_quad_has_no_homography() {
        let p = Vec2::new(1.0, 1.0);
        assert!(Homography::square_to_quad(&Quad::new([p; 4])).is_none());

        let line = Quad::new([
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(3.0, 0.0),
        ]);
        assert!(Homography::square_to_quad(&line).is_none());
    }

    #[test]
    fn non_finite_quad_is_rejected() {
        let mut q = trapezoid();
        q.set_corner(Corner::TopRight, Vec2::new(f32::NAN, 0.0));
        assert!(!q.is_finite());
        assert!(Homography::square_to_quad(&q).is_none());
    }
}
