use std::collections::{HashMap, HashSet};
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::paint::ImageFrame;
use crate::render::{RenderCtx, RenderTarget};
use crate::scene::shapes::warp::{TextureKey, WarpCmd};
use crate::scene::{DrawCmd, DrawList};

use super::common::{
    begin_load_pass, create_pipeline, create_viewport_ubo, ensure_buffer_capacity,
    viewport_ubo_layout_entry, ViewportUniform,
};

/// Renderer for `DrawCmd::Warp`: textured triangle meshes with projective
/// weights.
///
/// Keeps one GPU texture per [`TextureKey`]. A texture is re-uploaded only
/// when the frame generation changes and recreated only when the frame size
/// changes. Slots whose key was not drawn in a frame are released at the end
/// of that frame.
#[derive(Default)]
pub struct WarpRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    viewport_ubo: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,

    slots: HashMap<TextureKey, TextureSlot>,

    vbo: Option<wgpu::Buffer>,
    vbo_capacity: usize,
    ibo: Option<wgpu::Buffer>,
    ibo_capacity: usize,

    warned_oversized: bool,
}

struct TextureSlot {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    generation: u64,
}

struct MeshDraw {
    key: TextureKey,
    indices: Range<u32>,
    base_vertex: i32,
}

impl WarpRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &mut DrawList,
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_shared_bindings(ctx);

        let mut vertices: Vec<GpuWarpVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut draws: Vec<MeshDraw> = Vec::new();
        let mut used: HashSet<TextureKey> = HashSet::new();

        let max_dim = ctx.device.limits().max_texture_dimension_2d;

        for item in draw_list.iter_in_paint_order() {
            let DrawCmd::Warp(cmd) = &item.cmd else { continue };
            if !mesh_is_valid(cmd) {
                log::warn!("invalid warp mesh for {:?}; skipped", cmd.texture);
                continue;
            }

            if cmd.frame.width() > max_dim || cmd.frame.height() > max_dim {
                if !self.warned_oversized {
                    log::warn!(
                        "frame {}x{} exceeds max texture size {max_dim}; not drawn",
                        cmd.frame.width(),
                        cmd.frame.height()
                    );
                    self.warned_oversized = true;
                }
                continue;
            }

            self.ensure_slot(ctx, cmd.texture, &cmd.frame);
            used.insert(cmd.texture);

            let base_vertex = vertices.len() as i32;
            let first = indices.len() as u32;
            append_mesh(cmd, &mut vertices, &mut indices);
            draws.push(MeshDraw {
                key: cmd.texture,
                indices: first..indices.len() as u32,
                base_vertex,
            });
        }

        let before = self.slots.len();
        self.slots.retain(|key, _| used.contains(key));
        if self.slots.len() != before {
            log::debug!("released {} warp texture(s)", before - self.slots.len());
        }

        if draws.is_empty() {
            return;
        }

        ensure_buffer_capacity(
            ctx,
            &mut self.vbo,
            &mut self.vbo_capacity,
            vertices.len(),
            std::mem::size_of::<GpuWarpVertex>(),
            wgpu::BufferUsages::VERTEX,
            "quadmap warp vbo",
        );
        ensure_buffer_capacity(
            ctx,
            &mut self.ibo,
            &mut self.ibo_capacity,
            indices.len(),
            std::mem::size_of::<u32>(),
            wgpu::BufferUsages::INDEX,
            "quadmap warp ibo",
        );

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let Some(vbo) = self.vbo.as_ref() else { return };
        let Some(ibo) = self.ibo.as_ref() else { return };

        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&ViewportUniform::from_ctx(ctx)));
        ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(&vertices));
        ctx.queue.write_buffer(ibo, 0, bytemuck::cast_slice(&indices));

        let mut rpass = begin_load_pass(target, "quadmap warp pass");
        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);

        for draw in &draws {
            let Some(slot) = self.slots.get(&draw.key) else { continue };
            rpass.set_bind_group(0, &slot.bind_group, &[]);
            rpass.draw_indexed(draw.indices.clone(), draw.base_vertex, 0..1);
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadmap warp shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/warp.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quadmap warp bgl"),
                entries: &[
                    viewport_ubo_layout_entry(),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline = create_pipeline(
            ctx,
            "quadmap warp pipeline",
            &shader,
            &bind_group_layout,
            &[GpuWarpVertex::layout()],
        );

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        // Bind groups reference the old layout.
        self.slots.clear();
    }

    fn ensure_shared_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.viewport_ubo.is_none() {
            self.viewport_ubo = Some(create_viewport_ubo(ctx, "quadmap warp viewport ubo"));
        }
        if self.sampler.is_none() {
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("quadmap warp sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            }));
        }
    }

    /// Makes sure `key` has a texture matching `frame` and that it holds
    /// `frame`'s pixels.
    fn ensure_slot(&mut self, ctx: &RenderCtx<'_>, key: TextureKey, frame: &ImageFrame) {
        let stale = self
            .slots
            .get(&key)
            .is_none_or(|s| s.width != frame.width() || s.height != frame.height());

        if stale {
            let Some(slot) = self.create_slot(ctx, frame) else { return };
            self.slots.insert(key, slot);
        }

        let Some(slot) = self.slots.get_mut(&key) else { return };
        if slot.generation == frame.generation() {
            return;
        }

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &slot.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.width() * 4),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );
        slot.generation = frame.generation();
    }

    fn create_slot(&self, ctx: &RenderCtx<'_>, frame: &ImageFrame) -> Option<TextureSlot> {
        let bgl = self.bind_group_layout.as_ref()?;
        let ubo = self.viewport_ubo.as_ref()?;
        let sampler = self.sampler.as_ref()?;

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("quadmap warp texture"),
            size: wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadmap warp bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        log::debug!("warp texture {}x{} created", frame.width(), frame.height());

        Some(TextureSlot {
            texture,
            bind_group,
            width: frame.width(),
            height: frame.height(),
            // Never matches a real frame, forcing the first upload.
            generation: 0,
        })
    }
}

/// True when `cmd` holds at least one triangle and every index is in range.
fn mesh_is_valid(cmd: &WarpCmd) -> bool {
    let count = cmd.vertices.len();
    !cmd.indices.is_empty()
        && cmd.indices.len() % 3 == 0
        && cmd.indices.iter().all(|&i| (i as usize) < count)
}

/// Appends `cmd`'s mesh with `origin` applied. Indices stay local to the mesh;
/// the draw call supplies the base vertex.
fn append_mesh(cmd: &WarpCmd, vertices: &mut Vec<GpuWarpVertex>, indices: &mut Vec<u32>) {
    vertices.extend(cmd.vertices.iter().map(|v| GpuWarpVertex {
        pos: [v.pos.x + cmd.origin.x, v.pos.y + cmd.origin.y],
        uv: v.uv,
        w: v.w,
    }));
    indices.extend_from_slice(&cmd.indices);
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GpuWarpVertex {
    pos: [f32; 2],
    uv: [f32; 2],
    w: f32,
}

impl GpuWarpVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // uv
        2 => Float32    // w
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuWarpVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coords::Vec2;
    use crate::scene::shapes::warp::WarpVertex;

    fn cmd(indices: Vec<u32>) -> WarpCmd {
        let v = |x: f32, y: f32| WarpVertex { pos: Vec2::new(x, y), uv: [x, y], w: 1.0 };
        WarpCmd {
            texture: TextureKey(7),
            frame: ImageFrame::new(1, 1, vec![255u8; 4]).unwrap(),
            origin: Vec2::new(100.0, 50.0),
            vertices: Arc::from(vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]),
            indices: Arc::from(indices),
        }
    }

    #[test]
    fn mesh_validation() {
        assert!(mesh_is_valid(&cmd(vec![0, 1, 2, 0, 2, 3])));
        assert!(!mesh_is_valid(&cmd(vec![])));
        assert!(!mesh_is_valid(&cmd(vec![0, 1])));
        assert!(!mesh_is_valid(&cmd(vec![0, 1, 4])));
    }

    #[test]
    fn append_applies_origin_and_keeps_local_indices() {
        let (mut v, mut i) = (Vec::new(), Vec::new());
        append_mesh(&cmd(vec![0, 1, 2]), &mut v, &mut i);
        append_mesh(&cmd(vec![0, 2, 3]), &mut v, &mut i);

        assert_eq!(v.len(), 8);
        assert_eq!(v[2].pos, [101.0, 51.0]);
        assert_eq!(v[2].uv, [1.0, 1.0]);
        assert_eq!(i, vec![0, 1, 2, 0, 2, 3]);
    }
}
