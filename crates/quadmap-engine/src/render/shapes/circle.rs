use bytemuck::{Pod, Zeroable};

use crate::render::{RenderCtx, RenderTarget};
use crate::scene::shapes::circle::CircleCmd;
use crate::scene::{DrawCmd, DrawList};

use super::common::{InstancedShape, ShapeInstance};

/// Renderer for `DrawCmd::Circle`: control-point handles and their rings.
///
/// Circles are evaluated as a signed distance in the fragment shader, with a
/// one-pixel anti-aliased edge. Borders sit on the inside of the outer edge;
/// a transparent fill with a border yields a plain ring.
#[derive(Default)]
pub struct CircleRenderer {
    shape: InstancedShape<CircleInstance>,
}

impl CircleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, draw_list: &mut DrawList) {
        let instances: Vec<CircleInstance> = draw_list
            .iter_in_paint_order()
            .filter_map(|item| match &item.cmd {
                DrawCmd::Circle(cmd) => CircleInstance::from_cmd(cmd),
                _ => None,
            })
            .collect();
        self.shape.draw(ctx, target, &instances);
    }
}

/// Instance data layout (48 bytes):
///
///  offset  0  center       [f32; 2]   loc 1
///  offset  8  radius_bw    [f32; 2]   loc 2  (.x = radius, .y = border_width)
///  offset 16  fill         [f32; 4]   loc 3
///  offset 32  border_color [f32; 4]   loc 4
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct CircleInstance {
    center: [f32; 2],
    radius_bw: [f32; 2],
    fill: [f32; 4],
    border_color: [f32; 4],
}

impl CircleInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x2, // center
        2 => Float32x2, // radius_bw
        3 => Float32x4, // fill
        4 => Float32x4  // border_color
    ];

    fn from_cmd(cmd: &CircleCmd) -> Option<Self> {
        if !(cmd.radius > 0.0 && cmd.radius.is_finite()) || !cmd.center.is_finite() {
            return None;
        }
        // A border never grows past the center.
        let (border_width, border_color) = cmd
            .border
            .map(|b| (b.width.clamp(0.0, cmd.radius), b.color.to_array()))
            .unwrap_or((0.0, [0.0; 4]));

        Some(CircleInstance {
            center: [cmd.center.x, cmd.center.y],
            radius_bw: [cmd.radius, border_width],
            fill: cmd.fill.to_array(),
            border_color,
        })
    }
}

impl ShapeInstance for CircleInstance {
    const NAME: &'static str = "circle";
    const SHADER: &'static str = include_str!("shaders/circle.wgsl");

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CircleInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
