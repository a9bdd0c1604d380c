use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::shapes::polyline::PolylineCmd;
use crate::scene::{DrawCmd, DrawList};

use super::common::{
    begin_load_pass, create_pipeline, create_viewport_ubo, ensure_buffer_capacity,
    viewport_ubo_layout_entry, ViewportUniform,
};

/// Renderer for `DrawCmd::Polyline`.
///
/// Strokes are tessellated on the CPU into one quad per segment, extended by
/// half the stroke width at both ends so joints stay closed. All polylines
/// share one vertex/index upload and one draw call.
#[derive(Default)]
pub struct PolylineRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    viewport_ubo: Option<wgpu::Buffer>,

    vbo: Option<wgpu::Buffer>,
    vbo_capacity: usize,
    ibo: Option<wgpu::Buffer>,
    ibo_capacity: usize,

    vertices: Vec<LineVertex>,
    indices: Vec<u32>,
}

impl PolylineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &mut DrawList,
    ) {
        self.vertices.clear();
        self.indices.clear();

        // At least one physical pixel wide.
        let min_width = 1.0 / ctx.scale_factor.max(f32::EPSILON);
        for item in draw_list.iter_in_paint_order() {
            let DrawCmd::Polyline(cmd) = &item.cmd else { continue };
            tessellate(cmd, min_width, &mut self.vertices, &mut self.indices);
        }

        if self.indices.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx);

        ensure_buffer_capacity(
            ctx,
            &mut self.vbo,
            &mut self.vbo_capacity,
            self.vertices.len(),
            std::mem::size_of::<LineVertex>(),
            wgpu::BufferUsages::VERTEX,
            "quadmap polyline vbo",
        );
        ensure_buffer_capacity(
            ctx,
            &mut self.ibo,
            &mut self.ibo_capacity,
            self.indices.len(),
            std::mem::size_of::<u32>(),
            wgpu::BufferUsages::INDEX,
            "quadmap polyline ibo",
        );

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let Some(vbo) = self.vbo.as_ref() else { return };
        let Some(ibo) = self.ibo.as_ref() else { return };

        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&ViewportUniform::from_ctx(ctx)));
        ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.vertices));
        ctx.queue.write_buffer(ibo, 0, bytemuck::cast_slice(&self.indices));

        let mut rpass = begin_load_pass(target, "quadmap polyline pass");
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.indices.len() as u32, 0, 0..1);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadmap polyline shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/polyline.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quadmap polyline bgl"),
                entries: &[viewport_ubo_layout_entry()],
            });

        let pipeline = create_pipeline(
            ctx,
            "quadmap polyline pipeline",
            &shader,
            &bind_group_layout,
            &[LineVertex::layout()],
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.bind_group = None;
        self.viewport_ubo = None;
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group.is_some() && self.viewport_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let viewport_ubo = create_viewport_ubo(ctx, "quadmap polyline viewport ubo");
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadmap polyline bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        self.viewport_ubo = Some(viewport_ubo);
        self.bind_group = Some(bind_group);
    }
}

/// Appends the stroke geometry for `cmd`.
fn tessellate(cmd: &PolylineCmd, min_width: f32, vertices: &mut Vec<LineVertex>, indices: &mut Vec<u32>) {
    if cmd.points.len() < 2 || !(cmd.width > 0.0) {
        return;
    }

    let half = cmd.width.max(min_width) * 0.5;
    let color = cmd.color.to_array();

    let n = cmd.points.len();
    let segments = if cmd.closed && n > 2 { n } else { n - 1 };

    for i in 0..segments {
        let a = cmd.points[i];
        let b = cmd.points[(i + 1) % n];
        if !a.is_finite() || !b.is_finite() {
            continue;
        }

        let dir = (b - a).normalized();
        if dir.x == 0.0 && dir.y == 0.0 {
            continue;
        }
        let side = dir.perp() * half;
        let a = a - dir * half;
        let b = b + dir * half;

        let base = vertices.len() as u32;
        for p in [a + side, b + side, b - side, a - side] {
            vertices.push(LineVertex { pos: [p.x, p.y], color });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LineVertex {
    pos: [f32; 2],
    color: [f32; 4],
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::paint::Color;

    fn cmd(points: Vec<Vec2>, closed: bool) -> PolylineCmd {
        PolylineCmd { points, width: 2.0, color: Color::WHITE, closed }
    }

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn closed_outline_has_one_quad_per_edge() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        tessellate(&cmd(square(), true), 1.0, &mut v, &mut i);
        assert_eq!(v.len(), 16);
        assert_eq!(i.len(), 24);
    }

    #[test]
    fn open_polyline_skips_closing_edge() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        tessellate(&cmd(square(), false), 1.0, &mut v, &mut i);
        assert_eq!(v.len(), 12);
        assert_eq!(i.len(), 18);
    }

    #[test]
    fn segment_is_extended_by_half_width() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        tessellate(&cmd(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)], false), 1.0, &mut v, &mut i);
        let xs: Vec<f32> = v.iter().map(|v| v.pos[0]).collect();
        assert_eq!(xs, vec![-1.0, 11.0, 11.0, -1.0]);
        let ys: Vec<f32> = v.iter().map(|v| v.pos[1]).collect();
        assert_eq!(ys, vec![1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn degenerate_input_draws_nothing() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        tessellate(&cmd(vec![Vec2::new(1.0, 1.0)], true), 1.0, &mut v, &mut i);
        tessellate(&cmd(vec![Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)], false), 1.0, &mut v, &mut i);
        assert!(v.is_empty() && i.is_empty());
    }

    #[test]
    fn hairlines_respect_minimum_width() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        let mut thin = cmd(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)], false);
        thin.width = 0.1;
        tessellate(&thin, 0.5, &mut v, &mut i);
        assert_eq!(v[0].pos[1], 0.25);
    }
}
