use crate::coords::Vec2;
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList, ZIndex};

/// Stroked polyline payload (logical pixels).
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineCmd {
    pub points: Vec<Vec2>,
    pub width: f32,
    pub color: Color,
    /// Connect the last point back to the first.
    pub closed: bool,
}

impl DrawList {
    /// Records a stroked polyline. Fewer than two points draw nothing.
    #[inline]
    pub fn push_polyline(
        &mut self,
        z: ZIndex,
        points: impl Into<Vec<Vec2>>,
        width: f32,
        color: Color,
        closed: bool,
    ) {
        self.push(
            z,
            DrawCmd::Polyline(PolylineCmd { points: points.into(), width, color, closed }),
        );
    }
}
