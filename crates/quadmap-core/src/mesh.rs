use std::sync::Arc;

use log::debug;
use quadmap_engine::coords::Vec2;
use quadmap_engine::scene::shapes::warp::WarpVertex;

use crate::geometry::{Homography, Quad};

/// Grid subdivisions per side used when nothing else is configured.
pub const DEFAULT_RESOLUTION: u32 = 8;

/// Upper bound on subdivisions; keeps vertex counts well inside `u32` indices.
pub const MAX_RESOLUTION: u32 = 128;

/// How the mesh vertices were placed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WarpMode {
    /// Homography positions with projective weights.
    Perspective,
    /// Bilinear corner blend with `w = 1`.
    Bilinear,
}

/// Triangulated grid covering a quad, ready for [`WarpCmd`].
///
/// Vertices are in canvas space, rows top to bottom, `(resolution + 1)²` of
/// them; indices form `resolution² * 2` triangles.
///
/// [`WarpCmd`]: quadmap_engine::scene::shapes::warp::WarpCmd
#[derive(Debug, Clone, PartialEq)]
pub struct WarpMesh {
    pub vertices: Arc<[WarpVertex]>,
    pub indices: Arc<[u32]>,
    pub mode: WarpMode,
    resolution: u32,
}

impl WarpMesh {
    pub fn build(quad: &Quad, resolution: u32) -> WarpMesh {
        let res = resolution.clamp(1, MAX_RESOLUTION);
        let homography = Homography::square_to_quad(quad).filter(|h| h.is_orientation_preserving());
        let mode = if homography.is_some() { WarpMode::Perspective } else { WarpMode::Bilinear };

        let step = 1.0 / res as f32;
        let mut vertices = Vec::with_capacity(((res + 1) * (res + 1)) as usize);
        for row in 0..=res {
            let v = row as f32 * step;
            for col in 0..=res {
                let u = col as f32 * step;
                let (pos, w) = match &homography {
                    Some(h) => h.map(u, v),
                    None => (quad.bilinear(u, v), 1.0),
                };
                vertices.push(WarpVertex { pos, uv: [u, v], w });
            }
        }

        let stride = res + 1;
        let mut indices = Vec::with_capacity((res * res * 6) as usize);
        for row in 0..res {
            for col in 0..res {
                let tl = row * stride + col;
                let tr = tl + 1;
                let bl = tl + stride;
                let br = bl + 1;
                indices.extend_from_slice(&[tl, tr, br, tl, br, bl]);
            }
        }

        if mode == WarpMode::Bilinear {
            debug!("warp mesh: no usable homography, using bilinear fallback");
        }

        WarpMesh {
            vertices: vertices.into(),
            indices: indices.into(),
            mode,
            resolution: res,
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Vertex at grid position `(col, row)`.
    pub fn vertex(&self, col: u32, row: u32) -> Option<&WarpVertex> {
        if col > self.resolution || row > self.resolution {
            return None;
        }
        self.vertices.get((row * (self.resolution + 1) + col) as usize)
    }

    /// Mesh translated by `delta`; used when only the whole quad moved.
    pub fn translated(&self, delta: Vec2) -> WarpMesh {
        let vertices: Vec<WarpVertex> = self
            .vertices
            .iter()
            .map(|v| WarpVertex { pos: v.pos + delta, ..*v })
            .collect();
        WarpMesh {
            vertices: vertices.into(),
            indices: Arc::clone(&self.indices),
            mode: self.mode,
            resolution: self.resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Corner;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    fn keystone() -> Quad {
        Quad::new([
            Vec2::new(-80.0, -60.0),
            Vec2::new(80.0, -60.0),
            Vec2::new(120.0, 60.0),
            Vec2::new(-120.0, 60.0),
        ])
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn grid_counts_follow_resolution() {
        let mesh = WarpMesh::build(&keystone(), 8);
        assert_eq!(mesh.vertices.len(), 81);
        assert_eq!(mesh.indices.len(), 8 * 8 * 2 * 3);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn resolution_is_clamped() {
        assert_eq!(WarpMesh::build(&keystone(), 0).resolution(), 1);
        assert_eq!(WarpMesh::build(&keystone(), 10_000).resolution(), MAX_RESOLUTION);
    }

    #[test]
    fn grid_corners_sit_on_quad_corners() {
        let q = keystone();
        let mesh = WarpMesh::build(&q, 4);
        let corners = [(0, 0), (4, 0), (4, 4), (0, 4)];
        for (c, (col, row)) in Corner::ALL.into_iter().zip(corners) {
            let v = mesh.vertex(col, row).unwrap();
            assert!(approx(v.pos, q.corner(c)));
            assert_eq!(v.uv, c.uv());
        }
    }

    // ── modes ─────────────────────────────────────────────────────────────

    #[test]
    fn convex_quad_uses_perspective_weights() {
        let mesh = WarpMesh::build(&keystone(), 4);
        assert_eq!(mesh.mode, WarpMode::Perspective);
        assert!(mesh.vertices.iter().all(|v| v.w > 0.0));
        assert!(mesh.vertices.iter().any(|v| (v.w - 1.0).abs() > 1e-3));
    }

    #[test]
    fn rectangle_has_unit_weights() {
        let mesh = WarpMesh::build(&Quad::centered(Vec2::zero(), Vec2::new(300.0, 200.0)), 4);
        assert!(mesh.vertices.iter().all(|v| v.w == 1.0));
        let center = mesh.vertex(2, 2).unwrap();
        assert!(approx(center.pos, Vec2::zero()));
    }

    #[test]
    fn bowtie_falls_back_to_bilinear() {
        let mut q = keystone();
        let tl = q.corner(Corner::TopLeft);
        let tr = q.corner(Corner::TopRight);
        q.set_corner(Corner::TopLeft, tr);
        q.set_corner(Corner::TopRight, tl);

        let mesh = WarpMesh::build(&q, 4);
        assert_eq!(mesh.mode, WarpMode::Bilinear);
        assert!(mesh.vertices.iter().all(|v| v.w == 1.0));
        assert!(approx(mesh.vertex(4, 0).unwrap().pos, tl));
    }

    #[test]
    fn collapsed_quad_still_builds() {
        let mesh = WarpMesh::build(&Quad::new([Vec2::new(5.0, 5.0); 4]), 2);
        assert_eq!(mesh.mode, WarpMode::Bilinear);
        assert_eq!(mesh.vertices.len(), 9);
    }

    #[test]
    fn translated_moves_every_vertex() {
        let mesh = WarpMesh::build(&keystone(), 2);
        let moved = mesh.translated(Vec2::new(10.0, -5.0));
        for (a, b) in mesh.vertices.iter().zip(moved.vertices.iter()) {
            assert!(approx(b.pos, a.pos + Vec2::new(10.0, -5.0)));
            assert_eq!(a.w, b.w);
        }
        assert!(Arc::ptr_eq(&mesh.indices, &moved.indices));
    }
}
