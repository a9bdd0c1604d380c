/// Z-ordering key for draw items. Higher values appear on top.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct ZIndex(pub i32);

impl ZIndex {
    /// Warped media surfaces.
    pub const SURFACES: ZIndex = ZIndex(0);
    /// Calibration outlines and control-point handles.
    pub const HANDLES: ZIndex = ZIndex(100);
    /// Panels and notices drawn over everything else.
    pub const OVERLAY: ZIndex = ZIndex(200);

    #[inline]
    pub const fn new(v: i32) -> Self {
        Self(v)
    }

    /// The layer `n` steps above this one.
    #[inline]
    pub const fn above(self, n: i32) -> Self {
        Self(self.0 + n)
    }
}
