use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::shapes::rect::RectCmd;
use crate::scene::{DrawCmd, DrawList};

use super::common::{InstancedShape, ShapeInstance};

/// Solid rectangles: panel backgrounds, buttons, swatches and notices.
#[derive(Default)]
pub struct RectRenderer {
    shape: InstancedShape<RectInstance>,
}

impl RectRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, draw_list: &mut DrawList) {
        let instances: Vec<RectInstance> = draw_list
            .iter_in_paint_order()
            .filter_map(|item| match &item.cmd {
                DrawCmd::Rect(cmd) => RectInstance::from_cmd(cmd),
                _ => None,
            })
            .collect();
        self.shape.draw(ctx, target, &instances);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct RectInstance {
    origin: [f32; 2],
    size: [f32; 2],
    color: [f32; 4],
}

impl RectInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x4  // color
    ];

    /// Empty, non-finite and fully transparent rects draw nothing.
    fn from_cmd(cmd: &RectCmd) -> Option<Self> {
        let r = cmd.rect.normalized();
        let visible = !r.is_empty() && r.origin.is_finite() && r.size.is_finite() && cmd.color.a > 0.0;
        visible.then(|| RectInstance {
            origin: [r.origin.x, r.origin.y],
            size: [r.size.x, r.size.y],
            color: cmd.color.to_array(),
        })
    }
}

impl ShapeInstance for RectInstance {
    const NAME: &'static str = "rect";
    const SHADER: &'static str = include_str!("shaders/rect.wgsl");

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RectInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
